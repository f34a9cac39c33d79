use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use entity::deal::{self, Stage};
use entity::shared::{Attachment, ProductLine};
use entity::{ActivitySubject, company, contact};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveValue::Set, Condition, FromQueryResult, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, QueryParams, RecordId};
use crate::journal::{self, NewActivity};
use crate::patch::{self, When, nullable};
use crate::query::{DEFAULT_PAGE_SIZE, Page, PageInfo, fetch_page, text_search};
use crate::refs::{CompanyRef, ContactRef, Refs};
use crate::reports::{StageColumn, StageTotal, pipeline_columns};
use crate::state::AppState;
use crate::views::{ActivityView, DealView, PipelineDeal, deal_ref_ids};
use crate::{Message, activities};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/pipeline", get(pipeline))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/activities", get(feed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealQuery {
    pub search: Option<String>,
    pub stage: Option<Stage>,
    pub owner: Option<Uuid>,
    pub company: Option<Uuid>,
    pub contact: Option<Uuid>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealList {
    pub deals: Vec<DealView<CompanyRef, ContactRef>>,
    #[serde(flatten)]
    pub page: PageInfo,
    pub stage_stats: Vec<StageTotal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub title: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<Stage>,
    pub expected_close_date: Option<When>,
    pub contact: Option<Uuid>,
    pub company: Option<Uuid>,
    pub owner: Option<Uuid>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    pub lost_reason: Option<String>,
    pub won_details: Option<String>,
    pub next_step: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Partial update. There is no probability field: it always follows the stage.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<Stage>,
    pub expected_close_date: Option<When>,
    pub contact: Option<Uuid>,
    pub company: Option<Uuid>,
    pub owner: Option<Uuid>,
    pub products: Option<Vec<ProductLine>>,
    #[serde(default, deserialize_with = "nullable")]
    pub lost_reason: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub won_details: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub next_step: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub attachments: Option<Vec<Attachment>>,
}

fn currency(value: Option<String>) -> ApiResult<String> {
    let code = patch::optional_text(value)
        .unwrap_or_else(|| "USD".to_string())
        .to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::validation(format!("Currency '{code}' is not a 3-letter code")));
    }
    Ok(code)
}

fn products(lines: &[ProductLine]) -> ApiResult<serde_json::Value> {
    for line in lines {
        if line.name.trim().is_empty() {
            return Err(ApiError::validation("Product name is required"));
        }
        patch::non_negative(line.price, "Product price")?;
    }
    patch::to_json(&lines)
}

impl DealPatch {
    fn apply(self, active: &mut deal::ActiveModel) -> ApiResult<()> {
        if let Some(title) = patch::patched_text(self.title, "Title")? {
            active.title = Set(title);
        }
        if let Some(description) = self.description {
            active.description = Set(patch::optional_text(description));
        }
        if let Some(value) = self.value {
            active.value = Set(patch::non_negative(value, "Value")?);
        }
        if self.currency.is_some() {
            active.currency = Set(currency(self.currency)?);
        }
        if let Some(stage) = self.stage {
            active.stage = Set(stage);
        }
        if let Some(When(at)) = self.expected_close_date {
            active.expected_close_date = Set(at.into());
        }
        if let Some(contact) = self.contact {
            active.contact_id = Set(contact);
        }
        if let Some(company) = self.company {
            active.company_id = Set(company);
        }
        if let Some(owner) = self.owner {
            active.owner_id = Set(owner);
        }
        if let Some(lines) = self.products {
            active.products = Set(products(&lines)?);
        }
        if let Some(lost_reason) = self.lost_reason {
            active.lost_reason = Set(patch::optional_text(lost_reason));
        }
        if let Some(won_details) = self.won_details {
            active.won_details = Set(patch::optional_text(won_details));
        }
        if let Some(next_step) = self.next_step {
            active.next_step = Set(patch::optional_text(next_step));
        }
        if let Some(tags) = self.tags {
            active.tags = Set(patch::tags(tags));
        }
        if let Some(attachments) = self.attachments {
            active.attachments = Set(patch::to_json(&attachments)?);
        }
        Ok(())
    }
}

#[derive(Debug, FromQueryResult)]
struct StageRow {
    stage: Stage,
    count: i64,
    total_value: Option<f64>,
}

/// Count and value per stage over the rows matching `condition`.
pub async fn stage_stats(db: &DatabaseConnection, condition: Condition) -> ApiResult<Vec<StageTotal>> {
    let rows = deal::Entity::find()
        .select_only()
        .column(deal::Column::Stage)
        .column_as(deal::Column::Id.count(), "count")
        .column_as(deal::Column::Value.sum(), "total_value")
        .filter(condition)
        .group_by(deal::Column::Stage)
        .into_model::<StageRow>()
        .all(db)
        .await?;
    let mut totals: Vec<StageTotal> = rows
        .into_iter()
        .map(|row| StageTotal {
            stage: row.stage,
            count: row.count.max(0) as u64,
            total_value: row.total_value.unwrap_or(0.0),
        })
        .collect();
    totals.sort_by_key(|total| total.stage.as_str());
    Ok(totals)
}

fn list_condition(db: &DatabaseConnection, query: &DealQuery) -> ApiResult<Condition> {
    let mut condition = Condition::all();
    if let Some(stage) = query.stage {
        condition = condition.add(deal::Column::Stage.eq(stage));
    }
    if let Some(owner) = query.owner {
        condition = condition.add(deal::Column::OwnerId.eq(owner));
    }
    if let Some(company) = query.company {
        condition = condition.add(deal::Column::CompanyId.eq(company));
    }
    if let Some(contact) = query.contact {
        condition = condition.add(deal::Column::ContactId.eq(contact));
    }
    if let (Some(min), Some(max)) = (query.min_value, query.max_value) {
        if min > max {
            return Err(ApiError::validation("minValue must not exceed maxValue"));
        }
    }
    if let Some(min) = query.min_value {
        condition = condition.add(deal::Column::Value.gte(min));
    }
    if let Some(max) = query.max_value {
        condition = condition.add(deal::Column::Value.lte(max));
    }
    if let Some(search) = query.search.as_deref().and_then(|term| {
        text_search(db.get_database_backend(), "deal", &[deal::Column::Title], term)
    }) {
        condition = condition.add(search);
    }
    Ok(condition)
}

#[tracing::instrument(name = "crm.deals.list", skip_all, fields(search = ?query.search, stage = ?query.stage, page = ?query.page))]
pub async fn list_deals(db: &DatabaseConnection, query: DealQuery) -> ApiResult<DealList> {
    let page = Page::new(query.page, query.limit, DEFAULT_PAGE_SIZE)?;
    let condition = list_condition(db, &query)?;
    let select = deal::Entity::find()
        .filter(condition.clone())
        .order_by_desc(deal::Column::CreatedAt)
        .order_by_desc(deal::Column::Id);
    let (models, page) = fetch_page(select, page, db).await?;
    let stage_stats = stage_stats(db, condition).await?;
    let refs = Refs::load(db, deal_ref_ids(&models)).await?;
    let deals = models
        .into_iter()
        .map(|model| DealView::summary(model, &refs))
        .collect();
    Ok(DealList {
        deals,
        page,
        stage_stats,
    })
}

#[tracing::instrument(name = "crm.deals.pipeline", skip_all)]
pub async fn deal_pipeline(db: &DatabaseConnection) -> ApiResult<Vec<StageColumn<PipelineDeal>>> {
    let models = deal::Entity::find()
        .order_by_desc(deal::Column::CreatedAt)
        .order_by_desc(deal::Column::Id)
        .all(db)
        .await?;
    let refs = Refs::load(db, deal_ref_ids(&models)).await?;
    Ok(pipeline_columns(&models, |model| PipelineDeal::build(model, &refs)))
}

async fn find_deal(db: &DatabaseConnection, id: Uuid) -> ApiResult<deal::Model> {
    deal::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Deal"))
}

pub async fn get_deal(
    db: &DatabaseConnection,
    id: Uuid,
) -> ApiResult<DealView<company::Model, contact::Model>> {
    let model = find_deal(db, id).await?;
    let refs = Refs::load(db, deal_ref_ids([&model])).await?;
    Ok(DealView::detail(model, &refs))
}

pub async fn create_deal(
    db: &DatabaseConnection,
    input: NewDeal,
    actor: &CurrentUser,
) -> ApiResult<deal::Model> {
    let now = Utc::now();
    let title = patch::required_text(input.title, "Title")?;
    let value = input
        .value
        .ok_or_else(|| ApiError::validation("Value is required"))
        .and_then(|value| patch::non_negative(value, "Value"))?;
    let expected_close_date = patch::required_when(input.expected_close_date, "Expected close date")?;
    let contact_id = input
        .contact
        .ok_or_else(|| ApiError::validation("Contact is required"))?;
    let company_id = input
        .company
        .ok_or_else(|| ApiError::validation("Company is required"))?;
    let stage = input.stage.unwrap_or_default();

    let active = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(patch::optional_text(input.description)),
        value: Set(value),
        currency: Set(currency(input.currency)?),
        stage: Set(stage),
        probability: Set(stage.probability()),
        expected_close_date: Set(expected_close_date.into()),
        actual_close_date: Set((stage == Stage::ClosedWon).then(|| now.into())),
        contact_id: Set(contact_id),
        company_id: Set(company_id),
        owner_id: Set(input.owner.unwrap_or(actor.user_id)),
        products: Set(products(&input.products)?),
        lost_reason: Set(patch::optional_text(input.lost_reason)),
        won_details: Set(patch::optional_text(input.won_details)),
        next_step: Set(patch::optional_text(input.next_step)),
        tags: Set(patch::tags(input.tags)),
        attachments: Set(patch::to_json(&input.attachments)?),
        created_by: Set(actor.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let txn = db.begin().await?;
    let model = active.insert(&txn).await?;
    journal::record(&txn, NewActivity::deal_created(&model, actor.user_id)).await?;
    txn.commit().await?;
    tracing::info!(deal_id = %model.id, stage = %model.stage, "deal created");
    Ok(model)
}

/// Merges the patch; a stage change re-derives probability, stamps the close
/// date on entry into `closed_won` and logs one `deal_updated` entry.
pub async fn update_deal(
    db: &DatabaseConnection,
    id: Uuid,
    patch: DealPatch,
    actor: &CurrentUser,
) -> ApiResult<deal::Model> {
    let existing = find_deal(db, id).await?;
    let previous = existing.stage;
    let next = patch.stage.unwrap_or(previous);
    let mut active: deal::ActiveModel = existing.into();
    patch.apply(&mut active)?;

    let now = Utc::now();
    let stage_changed = next != previous;
    if stage_changed {
        active.probability = Set(next.probability());
        if next == Stage::ClosedWon {
            active.actual_close_date = Set(Some(now.into()));
        }
    }
    active.updated_at = Set(now.into());

    let txn = db.begin().await?;
    let model = active.update(&txn).await?;
    if stage_changed {
        journal::record(&txn, NewActivity::deal_stage_changed(&model, previous, actor.user_id)).await?;
        tracing::info!(deal_id = %model.id, from = %previous, to = %next, "deal stage changed");
    }
    txn.commit().await?;
    Ok(model)
}

pub async fn delete_deal(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let result = deal::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Deal"));
    }
    tracing::info!(deal_id = %id, "deal deleted");
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<DealQuery>,
) -> ApiResult<Json<DealList>> {
    Ok(Json(list_deals(state.db(), query).await?))
}

async fn pipeline(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Vec<StageColumn<PipelineDeal>>>> {
    Ok(Json(deal_pipeline(state.db()).await?))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<DealView<company::Model, contact::Model>>> {
    Ok(Json(get_deal(state.db(), id).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<NewDeal>,
) -> ApiResult<(StatusCode, Json<deal::Model>)> {
    let model = create_deal(state.db(), input, &user).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

#[tracing::instrument(skip_all, fields(deal_id = %id))]
async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<DealPatch>,
) -> ApiResult<Json<deal::Model>> {
    Ok(Json(update_deal(state.db(), id, patch, &user).await?))
}

#[tracing::instrument(skip_all, fields(deal_id = %id))]
async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Message>> {
    delete_deal(state.db(), id).await?;
    Ok(Json(Message::new("Deal deleted successfully")))
}

async fn feed(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<ActivityView>>> {
    let activities = activities::subject_feed(state.db(), ActivitySubject::Deal(id)).await?;
    Ok(Json(activities))
}
