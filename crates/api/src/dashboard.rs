use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Months, Utc};
use entity::{activity, company, contact, deal, task};
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::deals::stage_stats;
use crate::error::ApiResult;
use crate::extract::QueryParams;
use crate::refs::{CompanyRef, ContactRef, RefIds, Refs, UserRef};
use crate::reports::{
    self, MonthlyRevenue, Period, StageTotal, StatusCount, monthly_revenue, status_histogram,
    top_performers,
};
use crate::state::AppState;
use crate::views::{ActivityView, DealView, TaskView, activity_ref_ids, deal_ref_ids, task_ref_ids};

const RECENT_ACTIVITIES: u64 = 10;
const UPCOMING_TASKS: u64 = 5;
const RECENT_DEALS: u64 = 5;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/analytics", get(analytics))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_contacts: u64,
    pub total_companies: u64,
    pub total_deals: u64,
    pub pending_tasks: u64,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub overview: Overview,
    pub deals_by_stage: Vec<StageTotal>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub recent_activities: Vec<ActivityView>,
    pub upcoming_tasks: Vec<TaskView>,
    pub recent_deals: Vec<DealView<CompanyRef, ContactRef>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub new_contacts: u64,
    pub new_companies: u64,
    pub new_deals: u64,
    pub closed_deals: u64,
    pub revenue: f64,
    pub conversion_rate: f64,
    pub avg_deal_size: f64,
}

#[derive(Debug, Serialize)]
pub struct TopPerformer {
    pub user: UserRef,
    pub revenue: f64,
    pub deals: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub period: Period,
    pub metrics: AnalyticsMetrics,
    pub task_completion: Vec<StatusCount>,
    pub top_performers: Vec<TopPerformer>,
}

fn won_since(since: DateTime<Utc>) -> Condition {
    let since: DateTimeWithTimeZone = since.into();
    Condition::all()
        .add(deal::Column::Stage.eq(deal::Stage::ClosedWon))
        .add(deal::Column::ActualCloseDate.gte(since))
}

#[tracing::instrument(name = "crm.dashboard.stats", skip_all, fields(user_id = %actor.user_id))]
pub async fn dashboard_stats(db: &DatabaseConnection, actor: &CurrentUser) -> ApiResult<DashboardStats> {
    let now = Utc::now();
    let now_fixed: DateTimeWithTimeZone = now.into();

    let total_contacts = contact::Entity::find().count(db).await?;
    let total_companies = company::Entity::find().count(db).await?;
    let total_deals = deal::Entity::find().count(db).await?;
    let open_for_actor = Condition::all()
        .add(task::Column::AssignedTo.eq(actor.user_id))
        .add(task::Column::Status.ne(task::Status::Completed));
    let pending_tasks = task::Entity::find()
        .filter(open_for_actor.clone())
        .count(db)
        .await?;

    let deals_by_stage = stage_stats(db, Condition::all()).await?;
    let total_revenue = deals_by_stage
        .iter()
        .find(|total| total.stage == deal::Stage::ClosedWon)
        .map(|total| total.total_value)
        .unwrap_or(0.0);

    let year_ago = now.checked_sub_months(Months::new(12)).unwrap_or(now);
    let won = deal::Entity::find()
        .filter(won_since(year_ago))
        .all(db)
        .await?;
    let monthly_revenue = monthly_revenue(&won, now);

    let activities = activity::Entity::find()
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id)
        .limit(RECENT_ACTIVITIES)
        .all(db)
        .await?;
    let upcoming = task::Entity::find()
        .filter(open_for_actor)
        .filter(task::Column::DueDate.gte(now_fixed))
        .order_by_asc(task::Column::DueDate)
        .order_by_asc(task::Column::Id)
        .limit(UPCOMING_TASKS)
        .all(db)
        .await?;
    let deals = deal::Entity::find()
        .order_by_desc(deal::Column::CreatedAt)
        .order_by_desc(deal::Column::Id)
        .limit(RECENT_DEALS)
        .all(db)
        .await?;

    let activity_refs = Refs::load(db, activity_ref_ids(&activities, false)).await?;
    let task_refs = Refs::load(db, task_ref_ids(&upcoming, true)).await?;
    let deal_refs = Refs::load(db, deal_ref_ids(&deals)).await?;

    Ok(DashboardStats {
        overview: Overview {
            total_contacts,
            total_companies,
            total_deals,
            pending_tasks,
            total_revenue,
        },
        deals_by_stage,
        monthly_revenue,
        recent_activities: activities
            .into_iter()
            .map(|model| ActivityView::build(model, &activity_refs))
            .collect(),
        upcoming_tasks: upcoming
            .into_iter()
            .map(|model| TaskView::build(model, &task_refs))
            .collect(),
        recent_deals: deals
            .into_iter()
            .map(|model| DealView::summary(model, &deal_refs))
            .collect(),
    })
}

#[tracing::instrument(name = "crm.dashboard.analytics", skip_all, fields(period = ?period))]
pub async fn analytics_report(db: &DatabaseConnection, period: Period) -> ApiResult<Analytics> {
    let now = Utc::now();
    let start = period.start(now);
    let since: DateTimeWithTimeZone = start.into();

    let new_contacts = contact::Entity::find()
        .filter(contact::Column::CreatedAt.gte(since))
        .count(db)
        .await?;
    let new_companies = company::Entity::find()
        .filter(company::Column::CreatedAt.gte(since))
        .count(db)
        .await?;
    let new_deals = deal::Entity::find()
        .filter(deal::Column::CreatedAt.gte(since))
        .count(db)
        .await?;

    let closed = deal::Entity::find()
        .filter(won_since(start))
        .order_by_asc(deal::Column::ActualCloseDate)
        .order_by_asc(deal::Column::Id)
        .all(db)
        .await?;
    let closed_deals = closed.len() as u64;
    let revenue: f64 = closed.iter().map(|deal| deal.value).sum();

    let tasks = task::Entity::find()
        .filter(task::Column::CreatedAt.gte(since))
        .all(db)
        .await?;

    let mut ids = RefIds::default();
    for deal in &closed {
        ids.user(deal.owner_id);
    }
    let refs = Refs::load(db, ids).await?;
    // Owners whose account is gone are left out of the ranking.
    let ranked = top_performers(&closed, |owner| refs.user(owner).is_some());

    Ok(Analytics {
        period,
        metrics: AnalyticsMetrics {
            new_contacts,
            new_companies,
            new_deals,
            closed_deals,
            revenue,
            conversion_rate: reports::conversion_rate(closed_deals, new_deals),
            avg_deal_size: reports::average(revenue, closed_deals),
        },
        task_completion: status_histogram(&tasks),
        top_performers: ranked
            .into_iter()
            .filter_map(|owner| {
                Some(TopPerformer {
                    user: refs.user(owner.owner_id)?,
                    revenue: owner.revenue,
                    deals: owner.deals,
                })
            })
            .collect(),
    })
}

async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(dashboard_stats(state.db(), &user).await?))
}

async fn analytics(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<AnalyticsQuery>,
) -> ApiResult<Json<Analytics>> {
    let period = match query.period.as_deref() {
        Some(raw) => raw.parse()?,
        None => Period::default(),
    };
    Ok(Json(analytics_report(state.db(), period).await?))
}
