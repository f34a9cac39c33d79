//! Client-side cache of fetched records.
//!
//! Each slice mirrors one request lifecycle: `pending` when a request starts,
//! then either a fulfilled reducer or `rejected`. Mutations patch the cached
//! list in place; the session re-fetches afterwards.

use uuid::Uuid;

use crate::model::{
    Activity, Analytics, Company, Contact, DashboardStats, Deal, ListEnvelope, ListQuery, PageInfo,
    StageColumn, StageTotal, Task, User,
};

pub trait Identified {
    fn id(&self) -> Uuid;
}

macro_rules! identified {
    ($($ty:ty),* $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
        })*
    };
}

identified!(Contact, Company, Deal, Task, Activity, User);

#[derive(Clone, Debug)]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub current: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub page: PageInfo,
    /// Query of the last list request, reused on refresh.
    pub query: ListQuery,
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current: None,
            loading: false,
            error: None,
            page: PageInfo::default(),
            query: ListQuery::default(),
        }
    }
}

impl<T: Identified> Slice<T> {
    pub fn pending(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn rejected(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    pub fn fulfilled_list(&mut self, items: Vec<T>, page: PageInfo) {
        self.loading = false;
        self.items = items;
        self.page = page;
    }

    pub fn fulfilled_one(&mut self, item: T) {
        self.loading = false;
        self.current = Some(item);
    }

    pub fn created(&mut self, item: T) {
        self.loading = false;
        self.items.insert(0, item);
    }

    pub fn updated(&mut self, item: T)
    where
        T: Clone,
    {
        self.loading = false;
        let id = item.id();
        if let Some(slot) = self.items.iter_mut().find(|existing| existing.id() == id) {
            *slot = item.clone();
        }
        if self.current.as_ref().is_some_and(|current| current.id() == id) {
            self.current = Some(item);
        }
    }

    pub fn removed(&mut self, id: Uuid) {
        self.loading = false;
        self.items.retain(|item| item.id() != id);
        if self.current.as_ref().is_some_and(|current| current.id() == id) {
            self.current = None;
        }
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    pub fn find(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DealsSlice {
    pub records: Slice<Deal>,
    pub pipeline: Vec<StageColumn>,
    pub stage_stats: Vec<StageTotal>,
}

#[derive(Clone, Debug, Default)]
pub struct AuthSlice {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthSlice {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DashboardSlice {
    pub stats: Option<DashboardStats>,
    pub analytics: Option<Analytics>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Store {
    pub auth: AuthSlice,
    pub contacts: Slice<Contact>,
    pub companies: Slice<Company>,
    pub deals: DealsSlice,
    pub tasks: Slice<Task>,
    pub dashboard: DashboardSlice,
}

/// Maps a record type to its slice in the [`Store`].
pub trait Sliced: Identified + Clone + Sized + 'static {
    fn slice(store: &Store) -> &Slice<Self>;

    fn slice_mut(store: &mut Store) -> &mut Slice<Self>;

    fn list_loaded(store: &mut Store, envelope: ListEnvelope<Self>) {
        Self::slice_mut(store).fulfilled_list(envelope.items, envelope.page);
    }
}

impl Sliced for Contact {
    fn slice(store: &Store) -> &Slice<Self> {
        &store.contacts
    }

    fn slice_mut(store: &mut Store) -> &mut Slice<Self> {
        &mut store.contacts
    }
}

impl Sliced for Company {
    fn slice(store: &Store) -> &Slice<Self> {
        &store.companies
    }

    fn slice_mut(store: &mut Store) -> &mut Slice<Self> {
        &mut store.companies
    }
}

impl Sliced for Deal {
    fn slice(store: &Store) -> &Slice<Self> {
        &store.deals.records
    }

    fn slice_mut(store: &mut Store) -> &mut Slice<Self> {
        &mut store.deals.records
    }

    fn list_loaded(store: &mut Store, envelope: ListEnvelope<Self>) {
        store.deals.stage_stats = envelope.stage_stats;
        store.deals.records.fulfilled_list(envelope.items, envelope.page);
    }
}

impl Sliced for Task {
    fn slice(store: &Store) -> &Slice<Self> {
        &store.tasks
    }

    fn slice_mut(store: &mut Store) -> &mut Slice<Self> {
        &mut store.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, Stage};
    use chrono::Utc;

    fn deal(title: &str, value: f64) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            value,
            currency: "USD".to_string(),
            stage: Stage::Qualification,
            probability: 10,
            expected_close_date: Utc::now(),
            actual_close_date: None,
            contact: Some(Link::Id(Uuid::new_v4())),
            company: Some(Link::Id(Uuid::new_v4())),
            owner: None,
            lost_reason: None,
            won_details: None,
            next_step: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_then_rejected_records_the_error() {
        let mut slice: Slice<Deal> = Slice::default();
        slice.pending();
        assert!(slice.loading);
        slice.rejected("Deal not found");
        assert!(!slice.loading);
        assert_eq!(slice.error.as_deref(), Some("Deal not found"));
        slice.pending();
        assert!(slice.error.is_none());
    }

    #[test]
    fn created_records_are_prepended() {
        let mut slice = Slice::default();
        slice.fulfilled_list(vec![deal("old", 1.0)], PageInfo::default());
        slice.created(deal("new", 2.0));
        let titles: Vec<_> = slice.items.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, ["new", "old"]);
    }

    #[test]
    fn updates_replace_list_entry_and_current() {
        let original = deal("Renewal", 100.0);
        let mut slice = Slice::default();
        slice.fulfilled_list(vec![deal("other", 5.0), original.clone()], PageInfo::default());
        slice.fulfilled_one(original.clone());

        let mut changed = original.clone();
        changed.stage = Stage::Proposal;
        slice.updated(changed);

        assert_eq!(slice.find(original.id).map(|d| d.stage), Some(Stage::Proposal));
        assert_eq!(slice.current.as_ref().map(|d| d.stage), Some(Stage::Proposal));
        assert_eq!(slice.items[0].title, "other");
    }

    #[test]
    fn removal_drops_list_entry_and_matching_current() {
        let kept = deal("kept", 1.0);
        let gone = deal("gone", 2.0);
        let mut slice = Slice::default();
        slice.fulfilled_list(vec![kept.clone(), gone.clone()], PageInfo::default());
        slice.fulfilled_one(kept.clone());

        slice.removed(gone.id);
        assert_eq!(slice.items.len(), 1);
        assert!(slice.current.is_some());

        slice.removed(kept.id);
        assert!(slice.items.is_empty());
        assert!(slice.current.is_none());
    }

    #[test]
    fn deal_lists_carry_stage_stats_into_the_store() {
        let mut store = Store::default();
        let envelope = ListEnvelope {
            items: vec![deal("a", 10.0)],
            page: PageInfo {
                total_pages: 1,
                current_page: 1,
                total: 1,
            },
            stage_stats: vec![StageTotal {
                stage: Stage::Qualification,
                count: 1,
                total_value: 10.0,
            }],
        };
        Deal::list_loaded(&mut store, envelope);
        assert_eq!(store.deals.records.items.len(), 1);
        assert_eq!(store.deals.stage_stats.len(), 1);
        assert_eq!(store.deals.records.page.total, 1);
    }
}
