use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use entity::activity::{self, Kind};
use entity::{ActivitySubject, SubjectKind};
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, QueryParams};
use crate::journal::{self, NewActivity};
use crate::patch;
use crate::query::{Page, PageInfo, fetch_page};
use crate::refs::Refs;
use crate::state::AppState;
use crate::views::{ActivityView, activity_ref_ids};

pub const DEFAULT_ACTIVITY_PAGE_SIZE: u64 = 20;
pub const TIMELINE_LIMIT: u64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/timeline", get(timeline))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub user: Option<Uuid>,
    pub related_type: Option<SubjectKind>,
    pub related_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub activities: Vec<ActivityView>,
    #[serde(flatten)]
    pub page: PageInfo,
}

/// A hand-logged call, email, meeting or note.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewManualActivity {
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub related_to: Option<ActivitySubject>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub activities: Vec<ActivityView>,
}

pub async fn subject_feed(db: &DatabaseConnection, subject: ActivitySubject) -> ApiResult<Vec<ActivityView>> {
    let models = journal::for_subject(db, subject).await?;
    let refs = Refs::load(db, activity_ref_ids(&models, false)).await?;
    Ok(models
        .into_iter()
        .map(|model| ActivityView::build(model, &refs))
        .collect())
}

#[tracing::instrument(name = "crm.activities.list", skip_all, fields(kind = ?query.kind, page = ?query.page))]
pub async fn list_activities(db: &DatabaseConnection, query: ActivityQuery) -> ApiResult<ActivityList> {
    let page = Page::new(query.page, query.limit, DEFAULT_ACTIVITY_PAGE_SIZE)?;
    let mut condition = Condition::all();
    if let Some(kind) = query.kind {
        condition = condition.add(activity::Column::Kind.eq(kind));
    }
    if let Some(user) = query.user {
        condition = condition.add(activity::Column::UserId.eq(user));
    }
    // Subject filtering needs both the type and the id.
    if let (Some(kind), Some(id)) = (query.related_type, query.related_id) {
        condition = condition
            .add(activity::Column::RelatedType.eq(kind))
            .add(activity::Column::RelatedId.eq(id));
    }

    let select = activity::Entity::find()
        .filter(condition)
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id);
    let (models, page) = fetch_page(select, page, db).await?;
    let refs = Refs::load(db, activity_ref_ids(&models, true)).await?;
    let activities = models
        .into_iter()
        .map(|model| ActivityView::build(model, &refs))
        .collect();
    Ok(ActivityList { activities, page })
}

pub async fn log_activity(
    db: &DatabaseConnection,
    input: NewManualActivity,
    actor: &CurrentUser,
) -> ApiResult<activity::Model> {
    let kind = input
        .kind
        .ok_or_else(|| ApiError::validation("Activity type is required"))?;
    if !kind.is_manual() {
        return Err(ApiError::validation(
            "Only call, email, meeting and note activities can be logged by hand",
        ));
    }
    let mut entry = NewActivity::new(kind, patch::required_text(input.title, "Title")?, actor.user_id);
    entry.description = patch::optional_text(input.description);
    entry.subject = input.related_to;
    entry.metadata = input.metadata;
    let model = journal::record(db, entry).await?;
    tracing::info!(activity_id = %model.id, kind = ?model.kind, "activity logged");
    Ok(model)
}

/// The newest activities bucketed by calendar day (UTC), newest day first.
#[tracing::instrument(name = "crm.activities.timeline", skip_all)]
pub async fn activity_timeline(db: &DatabaseConnection) -> ApiResult<Vec<TimelineDay>> {
    let models = activity::Entity::find()
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .limit(TIMELINE_LIMIT)
        .all(db)
        .await?;
    let refs = Refs::load(db, activity_ref_ids(&models, true)).await?;
    let mut days: BTreeMap<NaiveDate, Vec<ActivityView>> = BTreeMap::new();
    for model in models {
        let day = model.created_at.naive_utc().date();
        days.entry(day)
            .or_default()
            .push(ActivityView::build(model, &refs));
    }
    Ok(days
        .into_iter()
        .rev()
        .map(|(date, activities)| TimelineDay { date, activities })
        .collect())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<ActivityQuery>,
) -> ApiResult<Json<ActivityList>> {
    Ok(Json(list_activities(state.db(), query).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<NewManualActivity>,
) -> ApiResult<(StatusCode, Json<activity::Model>)> {
    let model = log_activity(state.db(), input, &user).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

async fn timeline(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Vec<TimelineDay>>> {
    Ok(Json(activity_timeline(state.db()).await?))
}
