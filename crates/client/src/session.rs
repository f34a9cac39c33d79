//! Runs API calls and folds their results into the [`Store`].

use serde::Serialize;
use uuid::Uuid;

use crate::api::{ClientError, ClientResult, CrmClient, Resource};
use crate::model::{AuthSession, ListQuery, PageInfo, User};
use crate::store::{Sliced, Store};

pub struct CrmSession {
    client: CrmClient,
    store: Store,
}

impl CrmSession {
    pub fn new(client: CrmClient) -> Self {
        let mut store = Store::default();
        store.auth.token = client.token().map(str::to_string);
        Self { client, store }
    }

    pub fn client(&self) -> &CrmClient {
        &self.client
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Logs the failure and drops the session token when the server rejected it.
    fn failed(&mut self, err: ClientError) -> ClientError {
        tracing::error!(error = %err, "crm request failed");
        if err.is_unauthorized() {
            self.client.clear_token();
            self.store.auth.token = None;
            self.store.auth.user = None;
        }
        err
    }

    fn signed_in(&mut self, session: AuthSession) -> &User {
        self.client.set_token(session.token.clone());
        let auth = &mut self.store.auth;
        auth.token = Some(session.token);
        auth.loading = false;
        auth.error = None;
        auth.user.insert(session.user)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<&User> {
        self.store.auth.loading = true;
        self.store.auth.error = None;
        match self.client.login(email, password).await {
            Ok(session) => Ok(self.signed_in(session)),
            Err(err) => {
                self.store.auth.loading = false;
                self.store.auth.error = Some(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> ClientResult<&User> {
        self.store.auth.loading = true;
        self.store.auth.error = None;
        match self.client.register(name, email, password).await {
            Ok(session) => Ok(self.signed_in(session)),
            Err(err) => {
                self.store.auth.loading = false;
                self.store.auth.error = Some(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub fn logout(&mut self) {
        self.client.clear_token();
        self.store = Store::default();
    }

    /// Loads one list page and remembers the query for later refreshes.
    pub async fn fetch<R: Resource + Sliced>(&mut self, query: ListQuery) -> ClientResult<()> {
        let slice = R::slice_mut(&mut self.store);
        slice.pending();
        slice.query = query.clone();
        match self.client.list::<R>(&query).await {
            Ok(envelope) => {
                R::list_loaded(&mut self.store, envelope);
                Ok(())
            }
            Err(err) => {
                R::slice_mut(&mut self.store).rejected(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub async fn refresh<R: Resource + Sliced>(&mut self) -> ClientResult<()> {
        let query = R::slice(&self.store).query.clone();
        self.fetch::<R>(query).await
    }

    /// Loads a single record as the slice's current selection.
    pub async fn open<R: Resource + Sliced>(&mut self, id: Uuid) -> ClientResult<&R> {
        R::slice_mut(&mut self.store).pending();
        match self.client.get::<R>(id).await {
            Ok(record) => {
                let slice = R::slice_mut(&mut self.store);
                slice.loading = false;
                Ok(slice.current.insert(record))
            }
            Err(err) => {
                R::slice_mut(&mut self.store).rejected(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub async fn create<R: Resource + Sliced>(&mut self, input: &R::Input) -> ClientResult<R> {
        R::slice_mut(&mut self.store).pending();
        let record = match self.client.create::<R>(input).await {
            Ok(record) => record,
            Err(err) => {
                R::slice_mut(&mut self.store).rejected(err.to_string());
                return Err(self.failed(err));
            }
        };
        R::slice_mut(&mut self.store).created(record.clone());
        self.refresh::<R>().await?;
        Ok(record)
    }

    pub async fn update<R: Resource + Sliced>(
        &mut self,
        id: Uuid,
        patch: &(impl Serialize + ?Sized),
    ) -> ClientResult<R> {
        R::slice_mut(&mut self.store).pending();
        let record = match self.client.update::<R>(id, patch).await {
            Ok(record) => record,
            Err(err) => {
                R::slice_mut(&mut self.store).rejected(err.to_string());
                return Err(self.failed(err));
            }
        };
        R::slice_mut(&mut self.store).updated(record.clone());
        self.refresh::<R>().await?;
        let reopen = R::slice(&self.store)
            .current
            .as_ref()
            .is_some_and(|current| current.id() == id);
        if reopen {
            self.open::<R>(id).await?;
        }
        Ok(record)
    }

    /// Deletes after `confirm` agrees. Returns `false` when it declined and
    /// nothing was sent.
    pub async fn delete<R: Resource + Sliced>(
        &mut self,
        id: Uuid,
        confirm: impl FnOnce() -> bool,
    ) -> ClientResult<bool> {
        if !confirm() {
            return Ok(false);
        }
        R::slice_mut(&mut self.store).pending();
        if let Err(err) = self.client.delete::<R>(id).await {
            R::slice_mut(&mut self.store).rejected(err.to_string());
            return Err(self.failed(err));
        }
        R::slice_mut(&mut self.store).removed(id);
        self.refresh::<R>().await?;
        Ok(true)
    }

    pub async fn pipeline(&mut self) -> ClientResult<()> {
        self.store.deals.records.pending();
        match self.client.pipeline().await {
            Ok(columns) => {
                self.store.deals.records.loading = false;
                self.store.deals.pipeline = columns;
                Ok(())
            }
            Err(err) => {
                self.store.deals.records.rejected(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    /// Replaces the task list with the signed-in user's open tasks.
    pub async fn my_tasks(&mut self, status: Option<&str>) -> ClientResult<()> {
        self.store.tasks.pending();
        match self.client.my_tasks(status).await {
            Ok(tasks) => {
                let total = tasks.len() as u64;
                let page = PageInfo {
                    total_pages: 1,
                    current_page: 1,
                    total,
                };
                self.store.tasks.fulfilled_list(tasks, page);
                Ok(())
            }
            Err(err) => {
                self.store.tasks.rejected(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub async fn dashboard(&mut self) -> ClientResult<()> {
        self.store.dashboard.loading = true;
        self.store.dashboard.error = None;
        match self.client.dashboard_stats().await {
            Ok(stats) => {
                self.store.dashboard.loading = false;
                self.store.dashboard.stats = Some(stats);
                Ok(())
            }
            Err(err) => {
                self.store.dashboard.loading = false;
                self.store.dashboard.error = Some(err.to_string());
                Err(self.failed(err))
            }
        }
    }

    pub async fn analytics(&mut self, period: Option<&str>) -> ClientResult<()> {
        self.store.dashboard.loading = true;
        self.store.dashboard.error = None;
        match self.client.analytics(period).await {
            Ok(report) => {
                self.store.dashboard.loading = false;
                self.store.dashboard.analytics = Some(report);
                Ok(())
            }
            Err(err) => {
                self.store.dashboard.loading = false;
                self.store.dashboard.error = Some(err.to_string());
                Err(self.failed(err))
            }
        }
    }
}
