use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discriminator column shared by task and activity subjects.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    #[sea_orm(string_value = "contact")]
    Contact,
    #[sea_orm(string_value = "company")]
    Company,
    #[sea_orm(string_value = "deal")]
    Deal,
    #[sea_orm(string_value = "task")]
    Task,
}

/// What a task is about. Serialized as `{"type": "deal", "id": "..."}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TaskTarget {
    Contact(Uuid),
    Company(Uuid),
    Deal(Uuid),
}

impl TaskTarget {
    pub fn into_parts(self) -> (SubjectKind, Uuid) {
        match self {
            TaskTarget::Contact(id) => (SubjectKind::Contact, id),
            TaskTarget::Company(id) => (SubjectKind::Company, id),
            TaskTarget::Deal(id) => (SubjectKind::Deal, id),
        }
    }

    /// Rebuilds the target from its stored columns. A task row can never point
    /// at another task, so that pairing yields `None`.
    pub fn from_parts(kind: Option<SubjectKind>, id: Option<Uuid>) -> Option<Self> {
        match (kind?, id?) {
            (SubjectKind::Contact, id) => Some(TaskTarget::Contact(id)),
            (SubjectKind::Company, id) => Some(TaskTarget::Company(id)),
            (SubjectKind::Deal, id) => Some(TaskTarget::Deal(id)),
            (SubjectKind::Task, _) => None,
        }
    }
}

/// The record an activity talks about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ActivitySubject {
    Contact(Uuid),
    Company(Uuid),
    Deal(Uuid),
    Task(Uuid),
}

impl ActivitySubject {
    pub fn kind(&self) -> SubjectKind {
        self.into_parts().0
    }

    pub fn id(&self) -> Uuid {
        self.into_parts().1
    }

    pub fn into_parts(self) -> (SubjectKind, Uuid) {
        match self {
            ActivitySubject::Contact(id) => (SubjectKind::Contact, id),
            ActivitySubject::Company(id) => (SubjectKind::Company, id),
            ActivitySubject::Deal(id) => (SubjectKind::Deal, id),
            ActivitySubject::Task(id) => (SubjectKind::Task, id),
        }
    }

    pub fn from_parts(kind: Option<SubjectKind>, id: Option<Uuid>) -> Option<Self> {
        let id = id?;
        Some(match kind? {
            SubjectKind::Contact => ActivitySubject::Contact(id),
            SubjectKind::Company => ActivitySubject::Company(id),
            SubjectKind::Deal => ActivitySubject::Deal(id),
            SubjectKind::Task => ActivitySubject::Task(id),
        })
    }
}

impl From<TaskTarget> for ActivitySubject {
    fn from(target: TaskTarget) -> Self {
        match target {
            TaskTarget::Contact(id) => ActivitySubject::Contact(id),
            TaskTarget::Company(id) => ActivitySubject::Company(id),
            TaskTarget::Deal(id) => ActivitySubject::Deal(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_target_uses_type_and_id_keys() {
        let id = Uuid::nil();
        let json = serde_json::to_value(TaskTarget::Deal(id)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "deal", "id": id}));

        let parsed: TaskTarget =
            serde_json::from_value(serde_json::json!({"type": "company", "id": id})).unwrap();
        assert_eq!(parsed, TaskTarget::Company(id));
    }

    #[test]
    fn task_target_rejects_task_kind() {
        let id = Uuid::new_v4();
        assert!(serde_json::from_value::<TaskTarget>(serde_json::json!({"type": "task", "id": id})).is_err());
        assert_eq!(TaskTarget::from_parts(Some(SubjectKind::Task), Some(id)), None);
        assert_eq!(TaskTarget::from_parts(Some(SubjectKind::Deal), None), None);
    }

    #[test]
    fn stored_columns_round_back_to_subject() {
        let id = Uuid::new_v4();
        let (kind, stored) = ActivitySubject::Task(id).into_parts();
        assert_eq!(ActivitySubject::from_parts(Some(kind), Some(stored)), Some(ActivitySubject::Task(id)));
        assert_eq!(ActivitySubject::from(TaskTarget::Contact(id)), ActivitySubject::Contact(id));
    }
}
