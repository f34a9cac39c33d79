use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use entity::shared::Reminder;
use entity::task::{self, Priority, Status, TaskType};
use entity::{ActivitySubject, SubjectKind, TaskTarget};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, Condition, Order, QueryOrder, Select, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, QueryParams, RecordId};
use crate::journal::{self, NewActivity};
use crate::patch::{self, When, nullable};
use crate::query::{DEFAULT_PAGE_SIZE, Page, PageInfo, fetch_page, priority_rank_expr, text_search};
use crate::refs::Refs;
use crate::state::AppState;
use crate::views::{ActivityView, TaskView, task_ref_ids};
use crate::{Message, activities};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/my-tasks", get(mine))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/activities", get(feed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub search: Option<String>,
    pub status: Option<Status>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<Uuid>,
    pub related_type: Option<SubjectKind>,
    pub related_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TaskList {
    pub tasks: Vec<TaskView>,
    #[serde(flatten)]
    pub page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyTasksQuery {
    /// Comma-separated statuses.
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due_date: Option<When>,
    pub assigned_to: Option<Uuid>,
    pub related_to: Option<TaskTarget>,
    pub reminder: Option<Reminder>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(rename = "type")]
    pub task_type: Option<TaskType>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub due_date: Option<When>,
    pub assigned_to: Option<Uuid>,
    #[serde(default, deserialize_with = "nullable")]
    pub related_to: Option<Option<TaskTarget>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reminder: Option<Option<Reminder>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

fn target_columns(target: Option<TaskTarget>) -> (Option<SubjectKind>, Option<Uuid>) {
    match target.map(TaskTarget::into_parts) {
        Some((kind, id)) => (Some(kind), Some(id)),
        None => (None, None),
    }
}

impl TaskPatch {
    fn apply(self, active: &mut task::ActiveModel) -> ApiResult<()> {
        if let Some(title) = patch::patched_text(self.title, "Title")? {
            active.title = Set(title);
        }
        if let Some(description) = self.description {
            active.description = Set(patch::optional_text(description));
        }
        if let Some(task_type) = self.task_type {
            active.task_type = Set(task_type);
        }
        if let Some(priority) = self.priority {
            active.priority = Set(priority);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(When(at)) = self.due_date {
            active.due_date = Set(at.into());
        }
        if let Some(assigned_to) = self.assigned_to {
            active.assigned_to = Set(assigned_to);
        }
        if let Some(related_to) = self.related_to {
            let (kind, id) = target_columns(related_to);
            active.related_type = Set(kind);
            active.related_id = Set(id);
        }
        if let Some(reminder) = self.reminder {
            active.reminder = Set(reminder.as_ref().map(patch::to_json).transpose()?);
        }
        if let Some(notes) = self.notes {
            active.notes = Set(patch::optional_text(notes));
        }
        Ok(())
    }
}

/// Soonest due first; equal due dates put the most pressing priority first.
fn order_by_due(select: Select<task::Entity>) -> Select<task::Entity> {
    select
        .order_by(task::Column::DueDate, Order::Asc)
        .order_by(priority_rank_expr(), Order::Desc)
        .order_by(task::Column::Id, Order::Asc)
}

pub fn parse_statuses(raw: Option<&str>) -> ApiResult<Vec<Status>> {
    let raw = raw.unwrap_or("todo,in_progress");
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let status: Status = serde_json::from_value(serde_json::Value::String(part.to_string()))
            .map_err(|_| ApiError::validation(format!("Unknown task status '{part}'")))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

#[tracing::instrument(name = "crm.tasks.list", skip_all, fields(search = ?query.search, status = ?query.status, page = ?query.page))]
pub async fn list_tasks(db: &DatabaseConnection, query: TaskQuery) -> ApiResult<TaskList> {
    let page = Page::new(query.page, query.limit, DEFAULT_PAGE_SIZE)?;
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(task::Column::Status.eq(status));
    }
    if let Some(task_type) = query.task_type {
        condition = condition.add(task::Column::TaskType.eq(task_type));
    }
    if let Some(priority) = query.priority {
        condition = condition.add(task::Column::Priority.eq(priority));
    }
    if let Some(assigned_to) = query.assigned_to {
        condition = condition.add(task::Column::AssignedTo.eq(assigned_to));
    }
    if let Some(related_type) = query.related_type {
        condition = condition.add(task::Column::RelatedType.eq(related_type));
    }
    if let Some(related_id) = query.related_id {
        condition = condition.add(task::Column::RelatedId.eq(related_id));
    }
    if let Some(search) = query.search.as_deref().and_then(|term| {
        text_search(
            db.get_database_backend(),
            "task",
            &[task::Column::Title, task::Column::Description],
            term,
        )
    }) {
        condition = condition.add(search);
    }

    let select = order_by_due(task::Entity::find().filter(condition));
    let (models, page) = fetch_page(select, page, db).await?;
    let refs = Refs::load(db, task_ref_ids(&models, false)).await?;
    let tasks = models
        .into_iter()
        .map(|model| TaskView::build(model, &refs))
        .collect();
    Ok(TaskList { tasks, page })
}

/// Tasks assigned to `user_id` in any of `statuses`, with their subjects resolved.
pub async fn my_tasks(
    db: &DatabaseConnection,
    user_id: Uuid,
    statuses: Vec<Status>,
) -> ApiResult<Vec<TaskView>> {
    let select = task::Entity::find()
        .filter(task::Column::AssignedTo.eq(user_id))
        .filter(task::Column::Status.is_in(statuses));
    let models = order_by_due(select).all(db).await?;
    let refs = Refs::load(db, task_ref_ids(&models, true)).await?;
    Ok(models
        .into_iter()
        .map(|model| TaskView::build(model, &refs))
        .collect())
}

async fn find_task(db: &DatabaseConnection, id: Uuid) -> ApiResult<task::Model> {
    task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))
}

pub async fn get_task(db: &DatabaseConnection, id: Uuid) -> ApiResult<TaskView> {
    let model = find_task(db, id).await?;
    let refs = Refs::load(db, task_ref_ids([&model], true)).await?;
    Ok(TaskView::build(model, &refs))
}

pub async fn create_task(
    db: &DatabaseConnection,
    input: NewTask,
    actor: &CurrentUser,
) -> ApiResult<task::Model> {
    let now = Utc::now();
    let title = patch::required_text(input.title, "Title")?;
    let due_date = patch::required_when(input.due_date, "Due date")?;
    let assigned_to = input
        .assigned_to
        .ok_or_else(|| ApiError::validation("Assignee is required"))?;
    let status = input.status.unwrap_or_default();
    let (related_type, related_id) = target_columns(input.related_to);

    let active = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(patch::optional_text(input.description)),
        task_type: Set(input.task_type.unwrap_or_default()),
        priority: Set(input.priority.unwrap_or_default()),
        status: Set(status),
        due_date: Set(due_date.into()),
        completed_at: Set((status == Status::Completed).then(|| now.into())),
        assigned_to: Set(assigned_to),
        related_type: Set(related_type),
        related_id: Set(related_id),
        reminder: Set(input.reminder.as_ref().map(patch::to_json).transpose()?),
        notes: Set(patch::optional_text(input.notes)),
        created_by: Set(actor.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let txn = db.begin().await?;
    let model = active.insert(&txn).await?;
    journal::record(&txn, NewActivity::task_created(&model, actor.user_id)).await?;
    txn.commit().await?;
    tracing::info!(task_id = %model.id, "task created");
    Ok(model)
}

/// Merges the patch; entering `completed` stamps `completedAt` and logs one
/// `task_completed` entry.
pub async fn update_task(
    db: &DatabaseConnection,
    id: Uuid,
    patch: TaskPatch,
    actor: &CurrentUser,
) -> ApiResult<task::Model> {
    let existing = find_task(db, id).await?;
    let completing = existing.status != Status::Completed && patch.status == Some(Status::Completed);
    let mut active: task::ActiveModel = existing.into();
    patch.apply(&mut active)?;

    let now = Utc::now();
    if completing {
        active.completed_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());

    let txn = db.begin().await?;
    let model = active.update(&txn).await?;
    if completing {
        journal::record(&txn, NewActivity::task_completed(&model, actor.user_id)).await?;
        tracing::info!(task_id = %model.id, "task completed");
    }
    txn.commit().await?;
    Ok(model)
}

pub async fn delete_task(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let result = task::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Task"));
    }
    tracing::info!(task_id = %id, "task deleted");
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<TaskQuery>,
) -> ApiResult<Json<TaskList>> {
    Ok(Json(list_tasks(state.db(), query).await?))
}

async fn mine(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(query): QueryParams<MyTasksQuery>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let statuses = parse_statuses(query.status.as_deref())?;
    Ok(Json(my_tasks(state.db(), user.user_id, statuses).await?))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(get_task(state.db(), id).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<NewTask>,
) -> ApiResult<(StatusCode, Json<task::Model>)> {
    let model = create_task(state.db(), input, &user).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

#[tracing::instrument(skip_all, fields(task_id = %id))]
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<TaskPatch>,
) -> ApiResult<Json<task::Model>> {
    Ok(Json(update_task(state.db(), id, patch, &user).await?))
}

#[tracing::instrument(skip_all, fields(task_id = %id))]
async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Message>> {
    delete_task(state.db(), id).await?;
    Ok(Json(Message::new("Task deleted successfully")))
}

async fn feed(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<ActivityView>>> {
    let activities = activities::subject_feed(state.db(), ActivitySubject::Task(id)).await?;
    Ok(Json(activities))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_default_to_open_work() {
        assert_eq!(parse_statuses(None).unwrap(), vec![Status::Todo, Status::InProgress]);
    }

    #[test]
    fn statuses_parse_comma_list() {
        assert_eq!(
            parse_statuses(Some("completed, cancelled,completed")).unwrap(),
            vec![Status::Completed, Status::Cancelled]
        );
        assert!(parse_statuses(Some("todo,done")).is_err());
    }
}
