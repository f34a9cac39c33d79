use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::subject::{SubjectKind, TaskTarget};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "task")]
#[serde(into = "Record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub priority: Priority,
    #[sea_orm(indexed)]
    pub status: Status,
    #[sea_orm(indexed)]
    pub due_date: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(indexed)]
    pub assigned_to: Uuid,
    pub related_type: Option<SubjectKind>,
    #[sea_orm(indexed)]
    pub related_id: Option<Uuid>,
    pub reminder: Option<Json>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn related_to(&self) -> Option<TaskTarget> {
        TaskTarget::from_parts(self.related_type, self.related_id)
    }
}

/// Wire form of a task row: the subject columns fold into `relatedTo`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: Priority,
    pub status: Status,
    pub due_date: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub assigned_to: Uuid,
    pub related_to: Option<TaskTarget>,
    pub reminder: Option<Json>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<Model> for Record {
    fn from(model: Model) -> Self {
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
            assigned_to: model.assigned_to,
            related_to,
            reminder: model.reminder,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[sea_orm(string_value = "call")]
    Call,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "meeting")]
    Meeting,
    #[sea_orm(string_value = "demo")]
    Demo,
    #[sea_orm(string_value = "follow_up")]
    FollowUp,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "urgent")]
    Urgent,
}

impl Priority {
    /// Sort weight; larger is more pressing.
    pub const fn rank(self) -> i32 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "todo")]
    Todo,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
