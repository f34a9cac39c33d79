//! Typed HTTP client for the CRM REST surface.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Activity, Analytics, AuthSession, Company, Contact, DashboardStats, Deal, ListEnvelope, ListQuery,
    Message, NewActivity, NewCompany, NewContact, NewDeal, NewTask, StageColumn, Task, TimelineDay, User,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} ({status})")]
    Api { status: u16, message: String },
    #[error("not authorized: {0}")]
    Unauthorized(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// A record collection served under `/api/<PATH>` with the usual CRUD routes.
pub trait Resource: DeserializeOwned {
    const PATH: &'static str;
    type Input: Serialize;
}

impl Resource for Contact {
    const PATH: &'static str = "contacts";
    type Input = NewContact;
}

impl Resource for Company {
    const PATH: &'static str = "companies";
    type Input = NewCompany;
}

impl Resource for Deal {
    const PATH: &'static str = "deals";
    type Input = NewDeal;
}

impl Resource for Task {
    const PATH: &'static str = "tasks";
    type Input = NewTask;
}

#[derive(Clone, Debug)]
pub struct CrmClient {
    http: Client,
    base: String,
    token: Option<String>,
}

impl CrmClient {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<Message>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("Request failed").to_string(),
        };
        tracing::debug!(status = status.as_u16(), %message, "api error");
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> ClientResult<T> {
        self.send(self.http.get(self.url(path)).query(query)).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &(impl Serialize + ?Sized)) -> ClientResult<T> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn put_json<T: DeserializeOwned>(&self, path: &str, body: &(impl Serialize + ?Sized)) -> ClientResult<T> {
        self.send(self.http.put(self.url(path)).json(body)).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.http.delete(self.url(path))).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ClientResult<AuthSession> {
        let body = json!({ "name": name, "email": email, "password": password });
        self.post_json("auth/register", &body).await
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        let body = json!({ "email": email, "password": password });
        self.post_json("auth/login", &body).await
    }

    pub async fn me(&self) -> ClientResult<User> {
        self.get_json("auth/me", &[]).await
    }

    pub async fn users(&self) -> ClientResult<Vec<User>> {
        self.get_json("users", &[]).await
    }

    pub async fn update_me(&self, patch: &(impl Serialize + ?Sized)) -> ClientResult<User> {
        self.put_json("users/me", patch).await
    }

    pub async fn update_user(&self, id: Uuid, patch: &(impl Serialize + ?Sized)) -> ClientResult<User> {
        self.put_json(&format!("users/{id}"), patch).await
    }

    pub async fn delete_user(&self, id: Uuid) -> ClientResult<Message> {
        self.delete_json(&format!("users/{id}")).await
    }

    pub async fn list<R: Resource>(&self, query: &ListQuery) -> ClientResult<ListEnvelope<R>> {
        self.get_json(R::PATH, &query.pairs()).await
    }

    pub async fn get<R: Resource>(&self, id: Uuid) -> ClientResult<R> {
        self.get_json(&format!("{}/{id}", R::PATH), &[]).await
    }

    pub async fn create<R: Resource>(&self, input: &R::Input) -> ClientResult<R> {
        self.post_json(R::PATH, input).await
    }

    pub async fn update<R: Resource>(&self, id: Uuid, patch: &(impl Serialize + ?Sized)) -> ClientResult<R> {
        self.put_json(&format!("{}/{id}", R::PATH), patch).await
    }

    pub async fn delete<R: Resource>(&self, id: Uuid) -> ClientResult<Message> {
        self.delete_json(&format!("{}/{id}", R::PATH)).await
    }

    /// Activities whose subject is the given record, newest first.
    pub async fn activities<R: Resource>(&self, id: Uuid) -> ClientResult<Vec<Activity>> {
        self.get_json(&format!("{}/{id}/activities", R::PATH), &[]).await
    }

    pub async fn pipeline(&self) -> ClientResult<Vec<StageColumn>> {
        self.get_json("deals/pipeline", &[]).await
    }

    pub async fn my_tasks(&self, status: Option<&str>) -> ClientResult<Vec<Task>> {
        let query: Vec<(String, String)> = status
            .map(|status| vec![("status".to_string(), status.to_string())])
            .unwrap_or_default();
        self.get_json("tasks/my-tasks", &query).await
    }

    pub async fn company_contacts(&self, id: Uuid) -> ClientResult<Vec<Contact>> {
        self.get_json(&format!("companies/{id}/contacts"), &[]).await
    }

    pub async fn company_deals(&self, id: Uuid) -> ClientResult<Vec<Deal>> {
        self.get_json(&format!("companies/{id}/deals"), &[]).await
    }

    pub async fn list_activities(&self, query: &ListQuery) -> ClientResult<ListEnvelope<Activity>> {
        self.get_json("activities", &query.pairs()).await
    }

    pub async fn log_activity(&self, input: &NewActivity) -> ClientResult<Activity> {
        self.post_json("activities", input).await
    }

    pub async fn timeline(&self) -> ClientResult<Vec<TimelineDay>> {
        self.get_json("activities/timeline", &[]).await
    }

    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get_json("dashboard/stats", &[]).await
    }

    pub async fn analytics(&self, period: Option<&str>) -> ClientResult<Analytics> {
        let query: Vec<(String, String)> = period
            .map(|period| vec![("period".to_string(), period.to_string())])
            .unwrap_or_default();
        self.get_json("dashboard/analytics", &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_the_base_url() {
        let client = CrmClient::new("http://localhost:5000/api/");
        assert_eq!(client.url("contacts"), "http://localhost:5000/api/contacts");
        assert_eq!(client.url("/deals/pipeline"), "http://localhost:5000/api/deals/pipeline");
    }

    #[test]
    fn token_can_be_set_and_cleared() {
        let mut client = CrmClient::new(DEFAULT_BASE_URL).with_token("abc");
        assert_eq!(client.token(), Some("abc"));
        client.clear_token();
        assert_eq!(client.token(), None);
    }
}
