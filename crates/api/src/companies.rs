use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use entity::company::{self, CompanyType, Size, Status};
use entity::shared::{Address, SocialMedia};
use entity::{ActivitySubject, contact, deal};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, Condition, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, QueryParams, RecordId};
use crate::journal::{self, NewActivity};
use crate::patch::{self, nullable};
use crate::query::{DEFAULT_PAGE_SIZE, Page, PageInfo, fetch_page, text_search};
use crate::refs::{CompanyRef, ContactRef, Refs};
use crate::state::AppState;
use crate::views::{ActivityView, CompanyView, ContactView, DealView, company_ref_ids, contact_ref_ids, deal_ref_ids};
use crate::{Message, activities};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/contacts", get(contacts))
        .route("/{id}/deals", get(deals))
        .route("/{id}/activities", get(feed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub company_type: Option<CompanyType>,
    pub status: Option<Status>,
    pub size: Option<Size>,
    pub industry: Option<String>,
    pub owner: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CompanyList {
    pub companies: Vec<CompanyView>,
    #[serde(flatten)]
    pub page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<Size>,
    pub revenue: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<Address>,
    #[serde(rename = "type")]
    pub company_type: Option<CompanyType>,
    pub status: Option<Status>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub social_media: Option<SocialMedia>,
    pub owner: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub domain: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub size: Option<Option<Size>>,
    #[serde(default, deserialize_with = "nullable")]
    pub revenue: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<Address>>,
    #[serde(rename = "type")]
    pub company_type: Option<CompanyType>,
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub social_media: Option<Option<SocialMedia>>,
    pub owner: Option<Uuid>,
}

fn checked_revenue(revenue: Option<f64>) -> ApiResult<Option<f64>> {
    revenue.map(|value| patch::non_negative(value, "Revenue")).transpose()
}

impl CompanyPatch {
    fn apply(self, active: &mut company::ActiveModel) -> ApiResult<()> {
        if let Some(name) = patch::patched_text(self.name, "Company name")? {
            active.name = Set(name);
        }
        if let Some(domain) = self.domain {
            active.domain = Set(patch::optional_text(domain).map(|d| d.to_lowercase()));
        }
        if let Some(industry) = self.industry {
            active.industry = Set(patch::optional_text(industry));
        }
        if let Some(size) = self.size {
            active.size = Set(size);
        }
        if let Some(revenue) = self.revenue {
            active.revenue = Set(checked_revenue(revenue)?);
        }
        if let Some(phone) = self.phone {
            active.phone = Set(patch::optional_text(phone));
        }
        if let Some(website) = self.website {
            active.website = Set(patch::optional_text(website));
        }
        if let Some(address) = self.address {
            active.address = Set(address.as_ref().map(patch::to_json).transpose()?);
        }
        if let Some(company_type) = self.company_type {
            active.company_type = Set(company_type);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(description) = self.description {
            active.description = Set(patch::optional_text(description));
        }
        if let Some(tags) = self.tags {
            active.tags = Set(patch::tags(tags));
        }
        if let Some(social_media) = self.social_media {
            active.social_media = Set(social_media.as_ref().map(patch::to_json).transpose()?);
        }
        if let Some(owner) = self.owner {
            active.owner_id = Set(owner);
        }
        Ok(())
    }
}

#[tracing::instrument(name = "crm.companies.list", skip_all, fields(search = ?query.search, page = ?query.page))]
pub async fn list_companies(db: &DatabaseConnection, query: CompanyQuery) -> ApiResult<CompanyList> {
    let page = Page::new(query.page, query.limit, DEFAULT_PAGE_SIZE)?;
    let mut condition = Condition::all();
    if let Some(company_type) = query.company_type {
        condition = condition.add(company::Column::CompanyType.eq(company_type));
    }
    if let Some(status) = query.status {
        condition = condition.add(company::Column::Status.eq(status));
    }
    if let Some(size) = query.size {
        condition = condition.add(company::Column::Size.eq(size));
    }
    if let Some(industry) = patch::optional_text(query.industry) {
        condition = condition.add(company::Column::Industry.eq(industry));
    }
    if let Some(owner) = query.owner {
        condition = condition.add(company::Column::OwnerId.eq(owner));
    }
    if let Some(search) = query.search.as_deref().and_then(|term| {
        text_search(
            db.get_database_backend(),
            "company",
            &[company::Column::Name, company::Column::Domain],
            term,
        )
    }) {
        condition = condition.add(search);
    }

    let select = company::Entity::find()
        .filter(condition)
        .order_by_desc(company::Column::CreatedAt)
        .order_by_desc(company::Column::Id);
    let (models, page) = fetch_page(select, page, db).await?;
    let refs = Refs::load(db, company_ref_ids(&models)).await?;
    let companies = models
        .into_iter()
        .map(|model| CompanyView::build(model, &refs))
        .collect();
    Ok(CompanyList { companies, page })
}

async fn find_company(db: &DatabaseConnection, id: Uuid) -> ApiResult<company::Model> {
    company::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Company"))
}

pub async fn get_company(db: &DatabaseConnection, id: Uuid) -> ApiResult<CompanyView> {
    let model = find_company(db, id).await?;
    let refs = Refs::load(db, company_ref_ids([&model])).await?;
    Ok(CompanyView::build(model, &refs))
}

pub async fn create_company(
    db: &DatabaseConnection,
    input: NewCompany,
    actor: &CurrentUser,
) -> ApiResult<company::Model> {
    let now = Utc::now();
    let active = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(patch::required_text(input.name, "Company name")?),
        domain: Set(patch::optional_text(input.domain).map(|d| d.to_lowercase())),
        industry: Set(patch::optional_text(input.industry)),
        size: Set(input.size),
        revenue: Set(checked_revenue(input.revenue)?),
        phone: Set(patch::optional_text(input.phone)),
        website: Set(patch::optional_text(input.website)),
        address: Set(input.address.as_ref().map(patch::to_json).transpose()?),
        company_type: Set(input.company_type.unwrap_or_default()),
        status: Set(input.status.unwrap_or_default()),
        description: Set(patch::optional_text(input.description)),
        tags: Set(patch::tags(input.tags)),
        social_media: Set(input.social_media.as_ref().map(patch::to_json).transpose()?),
        owner_id: Set(input.owner.unwrap_or(actor.user_id)),
        created_by: Set(actor.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let txn = db.begin().await?;
    let model = active.insert(&txn).await?;
    journal::record(&txn, NewActivity::company_created(&model, actor.user_id)).await?;
    txn.commit().await?;
    tracing::info!(company_id = %model.id, "company created");
    Ok(model)
}

pub async fn update_company(
    db: &DatabaseConnection,
    id: Uuid,
    patch: CompanyPatch,
) -> ApiResult<company::Model> {
    let mut active: company::ActiveModel = find_company(db, id).await?.into();
    patch.apply(&mut active)?;
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

/// Contacts and deals that point at the company are left untouched.
pub async fn delete_company(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let result = company::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Company"));
    }
    tracing::info!(company_id = %id, "company deleted");
    Ok(())
}

pub async fn company_contacts(
    db: &DatabaseConnection,
    id: Uuid,
) -> ApiResult<Vec<ContactView<CompanyRef>>> {
    find_company(db, id).await?;
    let models = contact::Entity::find()
        .filter(contact::Column::CompanyId.eq(id))
        .order_by_desc(contact::Column::CreatedAt)
        .all(db)
        .await?;
    let refs = Refs::load(db, contact_ref_ids(&models)).await?;
    Ok(models
        .into_iter()
        .map(|model| ContactView::summary(model, &refs))
        .collect())
}

pub async fn company_deals(
    db: &DatabaseConnection,
    id: Uuid,
) -> ApiResult<Vec<DealView<CompanyRef, ContactRef>>> {
    find_company(db, id).await?;
    let models = deal::Entity::find()
        .filter(deal::Column::CompanyId.eq(id))
        .order_by_desc(deal::Column::CreatedAt)
        .all(db)
        .await?;
    let refs = Refs::load(db, deal_ref_ids(&models)).await?;
    Ok(models
        .into_iter()
        .map(|model| DealView::summary(model, &refs))
        .collect())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<CompanyQuery>,
) -> ApiResult<Json<CompanyList>> {
    Ok(Json(list_companies(state.db(), query).await?))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<CompanyView>> {
    Ok(Json(get_company(state.db(), id).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<NewCompany>,
) -> ApiResult<(StatusCode, Json<company::Model>)> {
    let model = create_company(state.db(), input, &user).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

#[tracing::instrument(skip_all, fields(company_id = %id))]
async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<CompanyPatch>,
) -> ApiResult<Json<company::Model>> {
    Ok(Json(update_company(state.db(), id, patch).await?))
}

#[tracing::instrument(skip_all, fields(company_id = %id))]
async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Message>> {
    delete_company(state.db(), id).await?;
    Ok(Json(Message::new("Company deleted successfully")))
}

async fn contacts(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<ContactView<CompanyRef>>>> {
    Ok(Json(company_contacts(state.db(), id).await?))
}

async fn deals(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<DealView<CompanyRef, ContactRef>>>> {
    Ok(Json(company_deals(state.db(), id).await?))
}

async fn feed(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<ActivityView>>> {
    let activities = activities::subject_feed(state.db(), ActivitySubject::Company(id)).await?;
    Ok(Json(activities))
}
