//! REST surface of the CRM: routers, handlers and the operations behind them.
//!
//! Every `/api/...` route except register and login expects a bearer token.

pub mod activities;
pub mod auth;
pub mod companies;
pub mod contacts;
pub mod dashboard;
pub mod deals;
pub mod error;
pub mod extract;
pub mod journal;
pub mod patch;
pub mod query;
pub mod refs;
pub mod reports;
pub mod seed;
pub mod state;
pub mod tasks;
pub mod users;
pub mod views;

use axum::Router;
use serde::{Deserialize, Serialize};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Plain acknowledgement body, e.g. after a delete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/auth", users::auth_routes())
        .nest("/api/users", users::routes())
        .nest("/api/contacts", contacts::routes())
        .nest("/api/companies", companies::routes())
        .nest("/api/deals", deals::routes())
        .nest("/api/tasks", tasks::routes())
        .nest("/api/activities", activities::routes())
        .nest("/api/dashboard", dashboard::routes())
        .with_state(state)
}
