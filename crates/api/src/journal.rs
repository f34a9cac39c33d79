//! The activity recorder: audit entries written alongside mutations.

use chrono::Utc;
use entity::activity::{self, Kind};
use entity::{ActivitySubject, company, contact, deal, task};
use num_format::{Locale, ToFormattedString};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait, QueryOrder, QuerySelect};
use serde_json::json;

/// How many entries a per-record activity feed returns.
pub const SUBJECT_FEED_LIMIT: u64 = 50;

#[derive(Clone, Debug)]
pub struct NewActivity {
    pub kind: Kind,
    pub title: String,
    pub description: Option<String>,
    pub user_id: Uuid,
    pub subject: Option<ActivitySubject>,
    pub metadata: Option<Json>,
}

impl NewActivity {
    pub fn new(kind: Kind, title: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
            user_id,
            subject: None,
            metadata: None,
        }
    }

    pub fn about(mut self, subject: ActivitySubject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(mut self, metadata: Json) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn contact_created(contact: &contact::Model, user_id: Uuid) -> Self {
        Self::new(
            Kind::ContactCreated,
            format!("Contact created: {}", contact.full_name()),
            user_id,
        )
        .about(ActivitySubject::Contact(contact.id))
    }

    pub fn company_created(company: &company::Model, user_id: Uuid) -> Self {
        Self::new(
            Kind::CompanyCreated,
            format!("Company created: {}", company.name),
            user_id,
        )
        .about(ActivitySubject::Company(company.id))
    }

    pub fn deal_created(deal: &deal::Model, user_id: Uuid) -> Self {
        Self::new(Kind::DealCreated, format!("Deal created: {}", deal.title), user_id)
            .about(ActivitySubject::Deal(deal.id))
            .description(format!("Value: ${}", format_amount(deal.value)))
            .metadata(json!({ "value": deal.value, "stage": deal.stage }))
    }

    pub fn deal_stage_changed(deal: &deal::Model, from: deal::Stage, user_id: Uuid) -> Self {
        Self::new(
            Kind::DealUpdated,
            format!("Deal stage changed: {} → {}", from, deal.stage),
            user_id,
        )
        .about(ActivitySubject::Deal(deal.id))
        .description(deal.title.clone())
        .metadata(json!({ "from": from, "to": deal.stage }))
    }

    pub fn task_created(task: &task::Model, user_id: Uuid) -> Self {
        Self::new(Kind::TaskCreated, format!("Task created: {}", task.title), user_id)
            .about(ActivitySubject::Task(task.id))
    }

    pub fn task_completed(task: &task::Model, user_id: Uuid) -> Self {
        Self::new(
            Kind::TaskCompleted,
            format!("Task completed: {}", task.title),
            user_id,
        )
        .about(ActivitySubject::Task(task.id))
    }
}

pub async fn record<C: ConnectionTrait>(conn: &C, entry: NewActivity) -> Result<activity::Model, DbErr> {
    let (related_type, related_id) = match entry.subject.map(ActivitySubject::into_parts) {
        Some((kind, id)) => (Some(kind), Some(id)),
        None => (None, None),
    };
    activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(entry.kind),
        title: Set(entry.title),
        description: Set(entry.description),
        user_id: Set(entry.user_id),
        related_type: Set(related_type),
        related_id: Set(related_id),
        metadata: Set(entry.metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
}

/// Newest entries about one record, matched on both kind and id.
pub async fn for_subject<C: ConnectionTrait>(
    conn: &C,
    subject: ActivitySubject,
) -> Result<Vec<activity::Model>, DbErr> {
    let (kind, id) = subject.into_parts();
    activity::Entity::find()
        .filter(activity::Column::RelatedId.eq(id))
        .filter(activity::Column::RelatedType.eq(kind))
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .limit(SUBJECT_FEED_LIMIT)
        .all(conn)
        .await
}

/// `1234567.5` renders as `1,234,567.5`; whole amounts carry no decimals.
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    match cents % 100 {
        0 => format!("{sign}{whole}"),
        fraction => {
            let fraction = format!("{fraction:02}");
            format!("{sign}{whole}.{}", fraction.trim_end_matches('0'))
        }
    }
}
