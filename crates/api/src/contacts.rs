use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use entity::contact::{self, Source, Status};
use entity::shared::{Address, SocialMedia};
use entity::{ActivitySubject, company};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, Condition, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, QueryParams, RecordId};
use crate::journal::{self, NewActivity};
use crate::patch::{self, nullable};
use crate::query::{DEFAULT_PAGE_SIZE, Page, PageInfo, fetch_page, text_search};
use crate::refs::{CompanyRef, Refs};
use crate::state::AppState;
use crate::views::{ActivityView, ContactView, contact_ref_ids};
use crate::{Message, activities};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/activities", get(feed))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub search: Option<String>,
    pub status: Option<Status>,
    pub source: Option<Source>,
    pub owner: Option<Uuid>,
    pub company: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ContactList {
    pub contacts: Vec<ContactView<CompanyRef>>,
    #[serde(flatten)]
    pub page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub title: Option<String>,
    pub company: Option<Uuid>,
    pub department: Option<String>,
    pub address: Option<Address>,
    pub status: Option<Status>,
    pub source: Option<Source>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub social_media: Option<SocialMedia>,
    pub owner: Option<Uuid>,
}

/// Partial update; clearable fields take an explicit `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub mobile: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub company: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub address: Option<Option<Address>>,
    pub status: Option<Status>,
    pub source: Option<Source>,
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub social_media: Option<Option<SocialMedia>>,
    pub owner: Option<Uuid>,
}

impl ContactPatch {
    fn apply(self, active: &mut contact::ActiveModel) -> ApiResult<()> {
        if let Some(first_name) = patch::patched_text(self.first_name, "First name")? {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = patch::patched_text(self.last_name, "Last name")? {
            active.last_name = Set(last_name);
        }
        if let Some(email) = self.email {
            active.email = Set(patch::email(Some(email), "Email")?);
        }
        if let Some(phone) = self.phone {
            active.phone = Set(patch::optional_text(phone));
        }
        if let Some(mobile) = self.mobile {
            active.mobile = Set(patch::optional_text(mobile));
        }
        if let Some(title) = self.title {
            active.title = Set(patch::optional_text(title));
        }
        if let Some(company) = self.company {
            active.company_id = Set(company);
        }
        if let Some(department) = self.department {
            active.department = Set(patch::optional_text(department));
        }
        if let Some(address) = self.address {
            active.address = Set(address.as_ref().map(patch::to_json).transpose()?);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(source) = self.source {
            active.source = Set(source);
        }
        if let Some(tags) = self.tags {
            active.tags = Set(patch::tags(tags));
        }
        if let Some(notes) = self.notes {
            active.notes = Set(patch::optional_text(notes));
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

#[tracing::instrument(name = "crm.contacts.list", skip_all, fields(search = ?query.search, page = ?query.page))]
pub async fn list_contacts(db: &DatabaseConnection, query: ContactQuery) -> ApiResult<ContactList> {
    let page = Page::new(query.page, query.limit, DEFAULT_PAGE_SIZE)?;
    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(contact::Column::Status.eq(status));
    }
    if let Some(source) = query.source {
        condition = condition.add(contact::Column::Source.eq(source));
    }
    if let Some(owner) = query.owner {
        condition = condition.add(contact::Column::OwnerId.eq(owner));
    }
    if let Some(company) = query.company {
        condition = condition.add(contact::Column::CompanyId.eq(company));
    }
    if let Some(search) = query.search.as_deref().and_then(|term| {
        text_search(
            db.get_database_backend(),
            "contact",
            &[
                contact::Column::FirstName,
                contact::Column::LastName,
                contact::Column::Email,
            ],
            term,
        )
    }) {
        condition = condition.add(search);
    }

    let select = contact::Entity::find()
        .filter(condition)
        .order_by_desc(contact::Column::CreatedAt)
        .order_by_desc(contact::Column::Id);
    let (models, page) = fetch_page(select, page, db).await?;
    let refs = Refs::load(db, contact_ref_ids(&models)).await?;
    let contacts = models
        .into_iter()
        .map(|model| ContactView::summary(model, &refs))
        .collect();
    Ok(ContactList { contacts, page })
}

pub async fn get_contact(
    db: &DatabaseConnection,
    id: Uuid,
) -> ApiResult<ContactView<company::Model>> {
    let model = contact::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact"))?;
    let refs = Refs::load(db, contact_ref_ids([&model])).await?;
    Ok(ContactView::detail(model, &refs))
}

pub async fn create_contact(
    db: &DatabaseConnection,
    input: NewContact,
    actor: &CurrentUser,
) -> ApiResult<contact::Model> {
    let now = Utc::now();
    let active = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(patch::required_text(input.first_name, "First name")?),
        last_name: Set(patch::required_text(input.last_name, "Last name")?),
        email: Set(patch::email(input.email, "Email")?),
        phone: Set(patch::optional_text(input.phone)),
        mobile: Set(patch::optional_text(input.mobile)),
        title: Set(patch::optional_text(input.title)),
        company_id: Set(input.company),
        department: Set(patch::optional_text(input.department)),
        address: Set(input.address.as_ref().map(patch::to_json).transpose()?),
        status: Set(input.status.unwrap_or_default()),
        source: Set(input.source.unwrap_or_default()),
        tags: Set(patch::tags(input.tags)),
        notes: Set(patch::optional_text(input.notes)),
        social_media: Set(input.social_media.as_ref().map(patch::to_json).transpose()?),
        owner_id: Set(input.owner.unwrap_or(actor.user_id)),
        created_by: Set(actor.user_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let txn = db.begin().await?;
    let model = active.insert(&txn).await?;
    journal::record(&txn, NewActivity::contact_created(&model, actor.user_id)).await?;
    txn.commit().await?;
    tracing::info!(contact_id = %model.id, "contact created");
    Ok(model)
}

pub async fn update_contact(
    db: &DatabaseConnection,
    id: Uuid,
    patch: ContactPatch,
) -> ApiResult<contact::Model> {
    let existing = contact::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact"))?;
    let mut active: contact::ActiveModel = existing.into();
    patch.apply(&mut active)?;
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub async fn delete_contact(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let result = contact::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Contact"));
    }
    tracing::info!(contact_id = %id, "contact deleted");
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<ContactQuery>,
) -> ApiResult<Json<ContactList>> {
    Ok(Json(list_contacts(state.db(), query).await?))
}

async fn show(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<ContactView<company::Model>>> {
    Ok(Json(get_contact(state.db(), id).await?))
}

#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(input): JsonBody<NewContact>,
) -> ApiResult<(StatusCode, Json<contact::Model>)> {
    let model = create_contact(state.db(), input, &user).await?;
    Ok((StatusCode::CREATED, Json(model)))
}

#[tracing::instrument(skip_all, fields(contact_id = %id))]
async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<ContactPatch>,
) -> ApiResult<Json<contact::Model>> {
    Ok(Json(update_contact(state.db(), id, patch).await?))
}

#[tracing::instrument(skip_all, fields(contact_id = %id))]
async fn remove(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Message>> {
    delete_contact(state.db(), id).await?;
    Ok(Json(Message::new("Contact deleted successfully")))
}

async fn feed(
    State(state): State<AppState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Vec<ActivityView>>> {
    let activities = activities::subject_feed(state.db(), ActivitySubject::Contact(id)).await?;
    Ok(Json(activities))
}
