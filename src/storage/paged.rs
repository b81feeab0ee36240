//! Manually-paged list store.
//!
//! Holds exactly one list (`items`, `page`, `hasMore`, `loading`, `error`) and
//! mutates it in place: a load-more appends the next page, anything else replaces
//! the list with page 1. Switching query class wipes the list.
//!
//! The store is usable on its own through [`PagedListStore::fetch`], which computes
//! the target page from its own `page`, or behind a list binding through
//! [`PagedStore`], where the coordinator picks the page.

use crate::domain::{ClassKey, PaginatedList, Query, Result};
use crate::service::SearchService;
use crate::storage::backend::PagedStore;
use crate::storage::models::StoreSnapshot;
use crate::worker::{FetchRequest, FetchResponse};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::Instrument;

/// Manually-paged list store backed by a search service.
///
/// # Examples
///
/// ```
/// use pagesync::domain::{Filters, QueryComposer};
/// use pagesync::service::{InMemoryService, Searchable};
/// use pagesync::storage::PagedListStore;
/// use serde::Serialize;
/// use std::sync::Arc;
///
/// #[derive(Clone, Serialize)]
/// struct Family { name: String }
///
/// impl Searchable for Family {
///     fn search_text(&self) -> String { self.name.clone() }
/// }
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let records = (0..15).map(|i| Family { name: format!("Family {i}") }).collect();
/// let store: PagedListStore<Family> = PagedListStore::new(Arc::new(InMemoryService::new(records)));
/// let query = QueryComposer::new(10).compose(&Filters::new(), "", 1);
///
/// store.fetch(&query, false).await;
/// assert!(store.has_more());
/// store.fetch(&query, true).await;
/// assert_eq!(store.items().len(), 15);
/// assert_eq!(store.page(), 2);
/// # });
/// ```
pub struct PagedListStore<T> {
    service: Arc<dyn SearchService<T>>,
    state: Mutex<StoreSnapshot<T>>,
    updates: watch::Sender<StoreSnapshot<T>>,
}

impl<T> PagedListStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty store fetching from `service`.
    pub fn new(service: Arc<dyn SearchService<T>>) -> Self {
        let (updates, _) = watch::channel(StoreSnapshot::default());
        Self {
            service,
            state: Mutex::new(StoreSnapshot::default()),
            updates,
        }
    }

    /// Fetches page 1 (or the page after the current one for a load-more) and
    /// applies it.
    ///
    /// Returns the fetched page, or `None` if the fetch failed; the failure message
    /// lands in [`Self::error`] and the items stay as they were. `loading` is
    /// cleared either way.
    pub async fn fetch(&self, query: &Query, is_load_more: bool) -> Option<PaginatedList<T>> {
        let target = {
            let mut state = self.lock();
            state.loading = true;
            let page = if is_load_more { state.page.saturating_add(1) } else { 1 };
            self.publish(&state);
            query.with_page(page)
        };

        let outcome = self
            .service
            .fetch_page(&target)
            .instrument(tracing::debug_span!("paged_fetch", page = target.page, is_load_more))
            .await;
        self.apply(is_load_more, &outcome);
        outcome.ok()
    }

    /// Clears the list back to empty and idle.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = StoreSnapshot::default();
        self.publish(&state);
    }

    /// Records an error message without touching the items.
    pub fn set_error(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.error = Some(message.into());
        self.publish(&state);
    }

    /// Accumulated items.
    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    /// Page number of the last applied page.
    pub fn page(&self) -> u32 {
        self.lock().page
    }

    /// Whether a later page exists.
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    /// Whether a fetch is running.
    pub fn loading(&self) -> bool {
        self.lock().loading
    }

    /// Message of the last failed fetch.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    fn apply(&self, is_load_more: bool, outcome: &Result<PaginatedList<T>>) {
        let mut state = self.lock();

        match outcome {
            Ok(list) => {
                if is_load_more {
                    state.items.extend(list.items.iter().cloned());
                } else {
                    state.items = list.items.clone();
                }
                state.page = list.page;
                state.has_more = list.has_more();
                state.total_items = list.total_items;
                state.error = None;
                state.updated_at = Some(chrono::Utc::now().timestamp());

                tracing::debug!(
                    page = list.page,
                    total_pages = list.total_pages,
                    item_count = state.items.len(),
                    append = is_load_more,
                    "page applied to list store"
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "list store fetch failed");
                state.error = Some(e.user_message());
            }
        }

        state.loading = false;
        self.publish(&state);
    }

    fn lock(&self) -> MutexGuard<'_, StoreSnapshot<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &StoreSnapshot<T>) {
        self.updates.send_replace(state.clone());
    }
}

#[async_trait]
impl<T> PagedStore<T> for PagedListStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn activate(&self, class: &ClassKey, _query: &Query, _invalidate: bool) {
        tracing::debug!(class = %class, "list store switching class, clearing list");
        self.reset();
    }

    fn begin(&self, request: &FetchRequest) {
        let mut state = self.lock();
        state.loading = true;
        tracing::trace!(seq = request.seq, page = request.page(), "list store loading");
        self.publish(&state);
    }

    async fn load(&self, request: &FetchRequest) -> Result<PaginatedList<T>> {
        self.service.fetch_page(&request.query).await
    }

    fn commit(&self, response: FetchResponse<T>) {
        self.apply(response.request.is_load_more(), &response.outcome);
    }

    fn reset(&self) {
        PagedListStore::reset(self);
    }

    fn snapshot(&self) -> StoreSnapshot<T> {
        self.lock().clone()
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot<T>> {
        self.updates.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Filters, PagesyncError, QueryComposer};
    use crate::service::{InMemoryService, Searchable};
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Row {
        name: String,
    }

    impl Searchable for Row {
        fn search_text(&self) -> String {
            self.name.clone()
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        (0..n).map(|i| Row { name: format!("row {i}") }).collect()
    }

    fn query() -> Query {
        QueryComposer::new(2).compose(&Filters::new(), "", 1)
    }

    #[tokio::test]
    async fn fetch_replaces_then_appends() {
        let store: PagedListStore<Row> =
            PagedListStore::new(Arc::new(InMemoryService::new(rows(3))));

        let first = store.fetch(&query(), false).await.unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(store.items().len(), 2);
        assert!(store.has_more());

        store.fetch(&query(), true).await.unwrap();
        assert_eq!(store.items(), rows(3));
        assert_eq!(store.page(), 2);
        assert!(!store.has_more());
        assert!(!store.loading());

        store.fetch(&query(), false).await.unwrap();
        assert_eq!(store.items().len(), 2);
        assert_eq!(store.page(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_items_and_clears_loading() {
        let service = Arc::new(InMemoryService::new(rows(3)));
        let store: PagedListStore<Row> = PagedListStore::new(service.clone());
        store.fetch(&query(), false).await;

        service.fail_service("Family not found");
        assert!(store.fetch(&query(), true).await.is_none());
        assert_eq!(store.error().as_deref(), Some("Family not found"));
        assert_eq!(store.items().len(), 2);
        assert_eq!(store.page(), 1);
        assert!(store.has_more());
        assert!(!store.loading());

        service.fail_transport(PagesyncError::transport(""));
        store.fetch(&query(), true).await;
        assert_eq!(store.error().as_deref(), Some(crate::domain::FALLBACK_MESSAGE));
    }

    #[tokio::test]
    async fn reset_and_set_error() {
        let store: PagedListStore<Row> =
            PagedListStore::new(Arc::new(InMemoryService::new(rows(1))));
        store.fetch(&query(), false).await;
        store.set_error("offline");
        assert_eq!(store.items().len(), 1);

        let mut updates = store.subscribe();
        store.reset();
        assert!(updates.has_changed().unwrap());
        let snapshot = updates.borrow_and_update().clone();
        assert!(snapshot.items.is_empty());
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.page, 1);
    }
}
