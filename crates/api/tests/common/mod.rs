#![allow(dead_code)]

use api::auth::AuthConfig;
use api::AppState;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::Router;
use http_body_util::BodyExt;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

/// A registered user and the bearer token issued at registration.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub role: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&conn, None).await.unwrap();
        Self::with_connection(conn)
    }

    pub fn with_connection(conn: DatabaseConnection) -> Self {
        let state = AppState::new(conn, AuthConfig::new("test-secret"));
        let router = api::router(state.clone());
        Self { state, router }
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.state.db()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, name: &str, email: &str) -> Session {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Session {
            id: id_of(&body),
            token: body["token"].as_str().unwrap().to_string(),
            role: body["role"].as_str().unwrap().to_string(),
        }
    }

    pub async fn company(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .post("/api/companies", token, json!({ "name": name, "industry": "Software" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "company failed: {body}");
        id_of(&body)
    }

    pub async fn contact(&self, token: &str, first: &str, company: Option<Uuid>) -> Uuid {
        let (status, body) = self
            .post(
                "/api/contacts",
                token,
                json!({
                    "firstName": first,
                    "lastName": "Tester",
                    "email": format!("{}@example.com", first.to_lowercase()),
                    "company": company,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "contact failed: {body}");
        id_of(&body)
    }

    pub async fn deal(&self, token: &str, body: Value) -> Value {
        let (status, body) = self.post("/api/deals", token, body).await;
        assert_eq!(status, StatusCode::CREATED, "deal failed: {body}");
        body
    }
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .unwrap_or_else(|| panic!("no id in {body}"))
}

/// A throwaway Postgres database, only when `TEST_DATABASE_URL` is set.
pub struct PgTestContext {
    pub app: TestApp,
    admin_url: String,
    db_name: String,
}

impl PgTestContext {
    pub async fn new() -> Option<Self> {
        let base = std::env::var("TEST_DATABASE_URL").ok()?;
        let (admin_url, db_name, test_url) = build_urls(&base)?;
        let admin = Database::connect(&admin_url).await.ok()?;
        let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
        let create_sql = format!("CREATE DATABASE \"{}\";", db_name);
        let _ = admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_sql))
            .await;
        admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, create_sql))
            .await
            .ok()?;
        let conn = Database::connect(&test_url).await.ok()?;
        Migrator::up(&conn, None).await.ok()?;
        Some(Self {
            app: TestApp::with_connection(conn),
            admin_url,
            db_name,
        })
    }

    pub async fn cleanup(self) {
        let Self {
            app,
            admin_url,
            db_name,
        } = self;
        drop(app);
        if let Ok(admin) = Database::connect(&admin_url).await {
            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE);", db_name);
            let _ = admin
                .execute(Statement::from_string(DatabaseBackend::Postgres, drop_sql))
                .await;
        }
    }
}

fn build_urls(base: &str) -> Option<(String, String, String)> {
    let url = Url::parse(base).ok()?;
    let db_path = url.path().trim_start_matches('/').to_string();
    let base_name = if db_path.is_empty() {
        "crm_test".to_string()
    } else {
        db_path
    };
    let db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
    let mut admin_url = url.clone();
    admin_url.set_path("/postgres");
    let mut test_url = url;
    test_url.set_path(&format!("/{}", db_name));
    Some((admin_url.to_string(), db_name, test_url.to_string()))
}
