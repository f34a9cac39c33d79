use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::subject::{ActivitySubject, SubjectKind};

/// Append-only audit entry. Rows are inserted and never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "activity")]
#[serde(into = "Record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: Kind,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(indexed)]
    pub user_id: Uuid,
    pub related_type: Option<SubjectKind>,
    #[sea_orm(indexed)]
    pub related_id: Option<Uuid>,
    pub metadata: Option<Json>,
    #[sea_orm(indexed)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn related_to(&self) -> Option<ActivitySubject> {
        ActivitySubject::from_parts(self.related_type, self.related_id)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: Kind,
    pub title: String,
    pub description: Option<String>,
    pub user: Uuid,
    pub related_to: Option<ActivitySubject>,
    pub metadata: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
}

impl From<Model> for Record {
    fn from(model: Model) -> Self {
        let related_to = model.related_to();
        Self {
            id: model.id,
            kind: model.kind,
            title: model.title,
            description: model.description,
            user: model.user_id,
            related_to,
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    #[sea_orm(string_value = "call")]
    Call,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "meeting")]
    Meeting,
    #[sea_orm(string_value = "note")]
    Note,
    #[sea_orm(string_value = "task_created")]
    TaskCreated,
    #[sea_orm(string_value = "task_completed")]
    TaskCompleted,
    #[sea_orm(string_value = "deal_created")]
    DealCreated,
    #[sea_orm(string_value = "deal_updated")]
    DealUpdated,
    #[sea_orm(string_value = "contact_created")]
    ContactCreated,
    #[sea_orm(string_value = "company_created")]
    CompanyCreated,
}

impl Kind {
    /// Kinds a user may log by hand; the rest are written by mutations.
    pub const fn is_manual(self) -> bool {
        matches!(self, Kind::Call | Kind::Email | Kind::Meeting | Kind::Note)
    }
}

impl ActiveModelBehavior for ActiveModel {}
