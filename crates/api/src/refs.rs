//! Batch resolution of weak references for read paths.
//!
//! Referenced ids are collected first, loaded with one `IN` query per
//! entity, then looked up per record. An id with no row resolves to `None`.

use std::collections::{BTreeSet, HashMap};

use entity::{ActivitySubject, TaskTarget, company, contact, deal, task, user};
use sea_orm::entity::prelude::*;
use sea_orm::ConnectionTrait;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRef {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRef {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A subject reference resolved to its full record.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum ResolvedSubject {
    Contact(contact::Model),
    Company(company::Model),
    Deal(deal::Model),
    Task(task::Model),
}

#[derive(Clone, Debug, Default)]
pub struct RefIds {
    users: BTreeSet<Uuid>,
    companies: BTreeSet<Uuid>,
    contacts: BTreeSet<Uuid>,
    deals: BTreeSet<Uuid>,
    tasks: BTreeSet<Uuid>,
}

impl RefIds {
    pub fn user(&mut self, id: Uuid) -> &mut Self {
        self.users.insert(id);
        self
    }

    pub fn company(&mut self, id: Option<Uuid>) -> &mut Self {
        self.companies.extend(id);
        self
    }

    pub fn contact(&mut self, id: Option<Uuid>) -> &mut Self {
        self.contacts.extend(id);
        self
    }

    pub fn subject(&mut self, subject: Option<ActivitySubject>) -> &mut Self {
        match subject {
            Some(ActivitySubject::Contact(id)) => self.contacts.insert(id),
            Some(ActivitySubject::Company(id)) => self.companies.insert(id),
            Some(ActivitySubject::Deal(id)) => self.deals.insert(id),
            Some(ActivitySubject::Task(id)) => self.tasks.insert(id),
            None => false,
        };
        self
    }

    pub fn target(&mut self, target: Option<TaskTarget>) -> &mut Self {
        self.subject(target.map(ActivitySubject::from))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Refs {
    users: HashMap<Uuid, user::Model>,
    companies: HashMap<Uuid, company::Model>,
    contacts: HashMap<Uuid, contact::Model>,
    deals: HashMap<Uuid, deal::Model>,
    tasks: HashMap<Uuid, task::Model>,
}

impl Refs {
    pub async fn load<C: ConnectionTrait>(conn: &C, ids: RefIds) -> Result<Self, DbErr> {
        let mut refs = Refs::default();
        if !ids.users.is_empty() {
            refs.users = user::Entity::find()
                .filter(user::Column::Id.is_in(ids.users))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect();
        }
        if !ids.companies.is_empty() {
            refs.companies = company::Entity::find()
                .filter(company::Column::Id.is_in(ids.companies))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect();
        }
        if !ids.contacts.is_empty() {
            refs.contacts = contact::Entity::find()
                .filter(contact::Column::Id.is_in(ids.contacts))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect();
        }
        if !ids.deals.is_empty() {
            refs.deals = deal::Entity::find()
                .filter(deal::Column::Id.is_in(ids.deals))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect();
        }
        if !ids.tasks.is_empty() {
            refs.tasks = task::Entity::find()
                .filter(task::Column::Id.is_in(ids.tasks))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect();
        }
        Ok(refs)
    }

    pub fn user(&self, id: Uuid) -> Option<UserRef> {
        self.users.get(&id).map(|u| UserRef {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        })
    }

    pub fn company(&self, id: Option<Uuid>) -> Option<CompanyRef> {
        self.company_record(id).map(|c| CompanyRef {
            id: c.id,
            name: c.name,
            industry: c.industry,
        })
    }

    pub fn company_record(&self, id: Option<Uuid>) -> Option<company::Model> {
        id.and_then(|id| self.companies.get(&id)).cloned()
    }

    pub fn contact(&self, id: Option<Uuid>) -> Option<ContactRef> {
        self.contact_record(id).map(|c| ContactRef {
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
        })
    }

    pub fn contact_record(&self, id: Option<Uuid>) -> Option<contact::Model> {
        id.and_then(|id| self.contacts.get(&id)).cloned()
    }

    pub fn subject(&self, subject: Option<ActivitySubject>) -> Option<ResolvedSubject> {
        match subject? {
            ActivitySubject::Contact(id) => self.contacts.get(&id).cloned().map(ResolvedSubject::Contact),
            ActivitySubject::Company(id) => self.companies.get(&id).cloned().map(ResolvedSubject::Company),
            ActivitySubject::Deal(id) => self.deals.get(&id).cloned().map(ResolvedSubject::Deal),
            ActivitySubject::Task(id) => self.tasks.get(&id).cloned().map(ResolvedSubject::Task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_references_resolve_to_none() {
        let refs = Refs::default();
        let id = Uuid::new_v4();
        assert_eq!(refs.user(id), None);
        assert_eq!(refs.company(Some(id)), None);
        assert_eq!(refs.contact(None), None);
        assert!(refs.subject(Some(ActivitySubject::Deal(id))).is_none());
    }

    #[test]
    fn subject_ids_land_in_matching_bucket() {
        let id = Uuid::new_v4();
        let mut ids = RefIds::default();
        ids.target(Some(TaskTarget::Company(id)))
            .subject(Some(ActivitySubject::Task(id)));
        assert!(ids.companies.contains(&id));
        assert!(ids.tasks.contains(&id));
        assert!(ids.deals.is_empty());
    }
}
