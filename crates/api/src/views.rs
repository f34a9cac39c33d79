//! Read-side shapes: stored records with their references resolved.
//!
//! List endpoints resolve references to small display summaries; single
//! record endpoints embed the full referenced document. Either way a
//! dangling reference serializes as `null`.

use entity::{ActivitySubject, TaskTarget, activity, company, contact, deal, task};
use sea_orm::entity::prelude::{DateTimeWithTimeZone, Json, Uuid};
use serde::Serialize;

use crate::refs::{CompanyRef, ContactRef, RefIds, Refs, ResolvedSubject, UserRef};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView<C> {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub title: Option<String>,
    pub company: Option<C>,
    pub department: Option<String>,
    pub address: Option<Json>,
    pub status: contact::Status,
    pub source: contact::Source,
    pub tags: Json,
    pub notes: Option<String>,
    pub social_media: Option<Json>,
    pub owner: Option<UserRef>,
    pub created_by: Option<UserRef>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl<C> ContactView<C> {
    fn build(model: contact::Model, company: Option<C>, refs: &Refs) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            mobile: model.mobile,
            title: model.title,
            company,
            department: model.department,
            address: model.address,
            status: model.status,
            source: model.source,
            tags: model.tags,
            notes: model.notes,
            social_media: model.social_media,
            owner: refs.user(model.owner_id),
            created_by: refs.user(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl ContactView<CompanyRef> {
    pub fn summary(model: contact::Model, refs: &Refs) -> Self {
        let company = refs.company(model.company_id);
        Self::build(model, company, refs)
    }
}

impl ContactView<company::Model> {
    pub fn detail(model: contact::Model, refs: &Refs) -> Self {
        let company = refs.company_record(model.company_id);
        Self::build(model, company, refs)
    }
}

pub fn contact_ref_ids<'a>(models: impl IntoIterator<Item = &'a contact::Model>) -> RefIds {
    let mut ids = RefIds::default();
    for model in models {
        ids.user(model.owner_id)
            .user(model.created_by)
            .company(model.company_id);
    }
    ids
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyView {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<company::Size>,
    pub revenue: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<Json>,
    #[serde(rename = "type")]
    pub company_type: company::CompanyType,
    pub status: company::Status,
    pub description: Option<String>,
    pub tags: Json,
    pub social_media: Option<Json>,
    pub owner: Option<UserRef>,
    pub created_by: Option<UserRef>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl CompanyView {
    pub fn build(model: company::Model, refs: &Refs) -> Self {
        Self {
            id: model.id,
            name: model.name,
            domain: model.domain,
            industry: model.industry,
            size: model.size,
            revenue: model.revenue,
            phone: model.phone,
            website: model.website,
            address: model.address,
            company_type: model.company_type,
            status: model.status,
            description: model.description,
            tags: model.tags,
            social_media: model.social_media,
            owner: refs.user(model.owner_id),
            created_by: refs.user(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub fn company_ref_ids<'a>(models: impl IntoIterator<Item = &'a company::Model>) -> RefIds {
    let mut ids = RefIds::default();
    for model in models {
        ids.user(model.owner_id).user(model.created_by);
    }
    ids
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView<C, K> {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub value: f64,
    pub currency: String,
    pub stage: deal::Stage,
    pub probability: i32,
    pub expected_close_date: DateTimeWithTimeZone,
    pub actual_close_date: Option<DateTimeWithTimeZone>,
    pub contact: Option<K>,
    pub company: Option<C>,
    pub owner: Option<UserRef>,
    pub products: Json,
    pub lost_reason: Option<String>,
    pub won_details: Option<String>,
    pub next_step: Option<String>,
    pub tags: Json,
    pub attachments: Json,
    pub created_by: Option<UserRef>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl<C, K> DealView<C, K> {
    fn build(model: deal::Model, company: Option<C>, contact: Option<K>, refs: &Refs) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            value: model.value,
            currency: model.currency,
            stage: model.stage,
            probability: model.probability,
            expected_close_date: model.expected_close_date,
            actual_close_date: model.actual_close_date,
            contact,
            company,
            owner: refs.user(model.owner_id),
            products: model.products,
            lost_reason: model.lost_reason,
            won_details: model.won_details,
            next_step: model.next_step,
            tags: model.tags,
            attachments: model.attachments,
            created_by: refs.user(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl DealView<CompanyRef, ContactRef> {
    pub fn summary(model: deal::Model, refs: &Refs) -> Self {
        let company = refs.company(Some(model.company_id));
        let contact = refs.contact(Some(model.contact_id));
        Self::build(model, company, contact, refs)
    }
}

impl DealView<company::Model, contact::Model> {
    pub fn detail(model: deal::Model, refs: &Refs) -> Self {
        let company = refs.company_record(Some(model.company_id));
        let contact = refs.contact_record(Some(model.contact_id));
        Self::build(model, company, contact, refs)
    }
}

pub fn deal_ref_ids<'a>(models: impl IntoIterator<Item = &'a deal::Model>) -> RefIds {
    let mut ids = RefIds::default();
    for model in models {
        ids.user(model.owner_id)
            .user(model.created_by)
            .company(Some(model.company_id))
            .contact(Some(model.contact_id));
    }
    ids
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: task::TaskType,
    pub priority: task::Priority,
    pub status: task::Status,
    pub due_date: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub assigned_to: Option<UserRef>,
    pub related_to: Option<TaskTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<ResolvedSubject>,
    pub reminder: Option<Json>,
    pub notes: Option<String>,
    pub created_by: Option<UserRef>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl TaskView {
    pub fn build(model: task::Model, refs: &Refs) -> Self {
        let related_to = model.related_to();
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            task_type: model.task_type,
            priority: model.priority,
            status: model.status,
            due_date: model.due_date,
            completed_at: model.completed_at,
            assigned_to: refs.user(model.assigned_to),
            related_to,
            related: refs.subject(related_to.map(ActivitySubject::from)),
            reminder: model.reminder,
            notes: model.notes,
            created_by: refs.user(model.created_by),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// `with_subject` also loads what each task is about.
pub fn task_ref_ids<'a>(models: impl IntoIterator<Item = &'a task::Model>, with_subject: bool) -> RefIds {
    let mut ids = RefIds::default();
    for model in models {
        ids.user(model.assigned_to).user(model.created_by);
        if with_subject {
            ids.target(model.related_to());
        }
    }
    ids
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: activity::Kind,
    pub title: String,
    pub description: Option<String>,
    pub user: Option<UserRef>,
    pub related_to: Option<ActivitySubject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<ResolvedSubject>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

impl ActivityView {
    pub fn build(model: activity::Model, refs: &Refs) -> Self {
        let related_to = model.related_to();
        Self {
            id: model.id,
            kind: model.kind,
            title: model.title,
            description: model.description,
            user: refs.user(model.user_id),
            related_to,
            related: refs.subject(related_to),
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }
}

pub fn activity_ref_ids<'a>(
    models: impl IntoIterator<Item = &'a activity::Model>,
    with_subject: bool,
) -> RefIds {
    let mut ids = RefIds::default();
    for model in models {
        ids.user(model.user_id);
        if with_subject {
            ids.subject(model.related_to());
        }
    }
    ids
}

/// One card on the pipeline board.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDeal {
    pub id: Uuid,
    pub title: String,
    pub value: f64,
    pub company: Option<CompanyRef>,
    pub contact: Option<ContactRef>,
    pub expected_close_date: DateTimeWithTimeZone,
    pub probability: i32,
}

impl PipelineDeal {
    pub fn build(model: &deal::Model, refs: &Refs) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            value: model.value,
            company: refs.company(Some(model.company_id)),
            contact: refs.contact(Some(model.contact_id)),
            expected_close_date: model.expected_close_date,
            probability: model.probability,
        }
    }
}
