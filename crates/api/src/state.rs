use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::auth::AuthConfig;

/// Everything a handler needs, handed in through axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, auth: AuthConfig) -> Self {
        Self {
            db: Arc::new(db),
            auth: Arc::new(auth),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }
}
