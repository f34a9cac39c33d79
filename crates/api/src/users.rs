//! Registration, login and user administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use entity::user::{self, Role};
use entity::user_secret;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::auth::{CurrentUser, hash_password, issue_token, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, JsonBody, RecordId};
use crate::patch::{self, nullable};
use crate::state::AppState;
use crate::Message;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/me", get(me).put(update_me))
        .route("/{id}", put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The user row plus a freshly issued bearer token.
#[derive(Debug, Serialize)]
pub struct AuthSession {
    #[serde(flatten)]
    pub user: user::Model,
    pub token: String,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: Option<Option<String>>,
}

/// Fields an admin may change on any account.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn session_for(state: &AppState, user: user::Model) -> ApiResult<AuthSession> {
    let token = issue_token(user.id, user.role, &state.auth)
        .map_err(|err| ApiError::internal(err.into()))?;
    Ok(AuthSession { user, token })
}

async fn find_by_email(db: &DatabaseConnection, email: &str) -> ApiResult<Option<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?)
}

/// Rejects an email already held by a different account.
async fn ensure_email_free(db: &DatabaseConnection, email: &str, owner: Option<Uuid>) -> ApiResult<()> {
    match find_by_email(db, email).await? {
        Some(existing) if Some(existing.id) != owner => {
            Err(ApiError::validation("Email already in use"))
        }
        _ => Ok(()),
    }
}

#[tracing::instrument(name = "crm.users.register", skip_all)]
pub async fn register_user(db: &DatabaseConnection, input: Registration) -> ApiResult<user::Model> {
    let name = patch::required_text(input.name, "Name")?;
    let email = patch::email(input.email, "Email")?;
    let password = input.password.unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if find_by_email(db, &email).await?.is_some() {
        return Err(ApiError::validation("User already exists"));
    }
    let role = if user::Entity::find().count(db).await? == 0 {
        Role::Admin
    } else {
        Role::User
    };
    let password_hash = hash_password(&password)?;

    let now = Utc::now();
    let active = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        role: Set(role),
        department: Set(patch::optional_text(input.department)),
        avatar: Set(None),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let txn = db.begin().await?;
    let model = active.insert(&txn).await?;
    user_secret::ActiveModel {
        user_id: Set(model.id),
        password_hash: Set(password_hash),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;
    tracing::info!(user_id = %model.id, role = model.role.as_str(), "user registered");
    Ok(model)
}

#[tracing::instrument(name = "crm.users.login", skip_all)]
pub async fn login_user(db: &DatabaseConnection, input: Credentials) -> ApiResult<user::Model> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());
    let email = input
        .email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .ok_or_else(invalid)?;
    let password = input.password.ok_or_else(invalid)?;

    let user = find_by_email(db, &email).await?.ok_or_else(invalid)?;
    let secret = user_secret::Entity::find_by_id(user.id)
        .one(db)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&password, &secret.password_hash) {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".into()));
    }

    let mut active: user::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now().into()));
    let user = active.update(db).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub async fn get_user(db: &DatabaseConnection, id: Uuid) -> ApiResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn list_users(db: &DatabaseConnection) -> ApiResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

pub async fn update_profile(
    db: &DatabaseConnection,
    id: Uuid,
    patch: ProfilePatch,
) -> ApiResult<user::Model> {
    let existing = get_user(db, id).await?;
    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = patch::patched_text(patch.name, "Name")? {
        active.name = Set(name);
    }
    if let Some(raw) = patch.email {
        let email = patch::email(Some(raw), "Email")?;
        ensure_email_free(db, &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(department) = patch.department {
        active.department = Set(patch::optional_text(department));
    }
    if let Some(avatar) = patch.avatar {
        active.avatar = Set(patch::optional_text(avatar));
    }
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub async fn update_user(db: &DatabaseConnection, id: Uuid, patch: UserPatch) -> ApiResult<user::Model> {
    let existing = get_user(db, id).await?;
    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = patch::patched_text(patch.name, "Name")? {
        active.name = Set(name);
    }
    if let Some(raw) = patch.email {
        let email = patch::email(Some(raw), "Email")?;
        ensure_email_free(db, &email, Some(id)).await?;
        active.email = Set(email);
    }
    if let Some(role) = patch.role {
        active.role = Set(role);
    }
    if let Some(department) = patch.department {
        active.department = Set(patch::optional_text(department));
    }
    if let Some(is_active) = patch.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let model = active.update(db).await?;
    tracing::info!(user_id = %model.id, role = model.role.as_str(), "user updated");
    Ok(model)
}

pub async fn delete_user(db: &DatabaseConnection, id: Uuid) -> ApiResult<()> {
    let txn = db.begin().await?;
    user_secret::Entity::delete_by_id(id).exec(&txn).await?;
    let result = user::Entity::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("User"));
    }
    txn.commit().await?;
    tracing::info!(user_id = %id, "user deleted");
    Ok(())
}

async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<Registration>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    let user = register_user(state.db(), input).await?;
    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<Credentials>,
) -> ApiResult<Json<AuthSession>> {
    let user = login_user(state.db(), input).await?;
    Ok(Json(session_for(&state, user)?))
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<user::Model>> {
    Ok(Json(get_user(state.db(), user.user_id).await?))
}

async fn list(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<Vec<user::Model>>> {
    Ok(Json(list_users(state.db()).await?))
}

async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(patch): JsonBody<ProfilePatch>,
) -> ApiResult<Json<user::Model>> {
    Ok(Json(update_profile(state.db(), user.user_id, patch).await?))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id))]
async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<UserPatch>,
) -> ApiResult<Json<user::Model>> {
    Ok(Json(update_user(state.db(), id, patch).await?))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.user_id, user_id = %id))]
async fn remove(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Message>> {
    delete_user(state.db(), id).await?;
    Ok(Json(Message::new("User removed")))
}
