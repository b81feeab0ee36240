//! Cursor-keyed page cache.
//!
//! Each query class owns an ordered array of pages in a [`QueryCache`]. The
//! visible list of a class is the lazy concatenation of its pages. A
//! [`InfiniteQueryStore`] is one list's view onto a (possibly shared) cache: it
//! points at the active class, appends next pages, and refetches page 1.
//!
//! # Cache Policy
//!
//! - **Keys** are [`ClassKey`]s, i.e. canonical JSON of every query field except
//!   `page`. Structurally equal queries share an entry.
//! - **Freshness**: pages written less than `stale_time` ago are reused on
//!   back-navigation without a fetch. Stale or invalidated pages stay visible
//!   while page 1 is refetched.
//! - **Eviction**: an entry nobody observes for `cache_time` is dropped by
//!   [`QueryCache::gc`]. Observed entries are never evicted.
//! - **Isolation**: refetching or invalidating one key never touches another.
//! - **Sharing**: lists on the same key continue from the last cached page. An
//!   appended page that does not follow it is dropped.

use crate::domain::{ClassKey, Cursor, PaginatedList, Query, Result};
use crate::service::SearchService;
use crate::storage::backend::PagedStore;
use crate::storage::models::StoreSnapshot;
use crate::worker::{FetchRequest, FetchResponse};
use crate::Config;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Pages of one query class.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    pages: Vec<PaginatedList<T>>,
    written_at: Option<Instant>,
    updated_at: Option<i64>,
    error: Option<String>,
    fetching: bool,
    observers: usize,
    unobserved_since: Option<Instant>,
}

impl<T> CacheEntry<T> {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            written_at: None,
            updated_at: None,
            error: None,
            fetching: false,
            observers: 0,
            unobserved_since: Some(Instant::now()),
        }
    }

    fn last_cursor(&self) -> Option<Cursor> {
        self.pages.last().map(PaginatedList::cursor)
    }
}

impl<T: Clone> CacheEntry<T> {
    fn snapshot(&self) -> StoreSnapshot<T> {
        let last = self.last_cursor();
        StoreSnapshot {
            items: self.pages.iter().flat_map(|p| p.items.iter().cloned()).collect(),
            page: last.map_or(1, |c| c.page.max(1)),
            has_more: last.is_some_and(|c| c.has_more()),
            loading: self.fetching,
            error: self.error.clone(),
            total_items: last.map_or(0, |c| c.total_items),
            updated_at: self.updated_at,
        }
    }
}

/// Shared page cache keyed by query class.
///
/// Cloning yields another handle to the same cache, so screens with identical
/// filters see each other's pages.
#[derive(Debug)]
pub struct QueryCache<T> {
    entries: Arc<Mutex<HashMap<ClassKey, CacheEntry<T>>>>,
    stale_time: Duration,
    cache_time: Duration,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            stale_time: self.stale_time,
            cache_time: self.cache_time,
        }
    }
}

impl<T: Clone> QueryCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            stale_time,
            cache_time,
        }
    }

    /// Creates an empty cache with the freshness windows from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.stale_time_ms),
            Duration::from_millis(config.cache_time_ms),
        )
    }

    /// Cursor of the last cached page for `key` if it is still fresh.
    #[must_use]
    pub fn fresh_cursor(&self, key: &ClassKey) -> Option<Cursor> {
        let entries = self.lock();
        let entry = entries.get(key)?;
        let written_at = entry.written_at?;

        if written_at.elapsed() < self.stale_time {
            entry.last_cursor()
        } else {
            None
        }
    }

    /// Cursor of the last cached page for `key`, fresh or stale.
    #[must_use]
    pub fn last_cursor(&self, key: &ClassKey) -> Option<Cursor> {
        self.lock().get(key).and_then(CacheEntry::last_cursor)
    }

    /// Concatenated items of every cached page for `key`.
    #[must_use]
    pub fn items(&self, key: &ClassKey) -> Vec<T> {
        self.lock()
            .get(key)
            .map(|entry| entry.pages.iter().flat_map(|p| p.items.iter().cloned()).collect())
            .unwrap_or_default()
    }

    /// Number of cached pages for `key`.
    #[must_use]
    pub fn page_count(&self, key: &ClassKey) -> usize {
        self.lock().get(key).map_or(0, |entry| entry.pages.len())
    }

    /// Returns `true` if the cache holds an entry for `key`.
    #[must_use]
    pub fn contains(&self, key: &ClassKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of entries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Marks the pages of `key` stale so the next activation refetches.
    ///
    /// The pages stay visible until the refetch lands.
    pub fn invalidate(&self, key: &ClassKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            tracing::debug!(key = %key, "cache entry invalidated");
            entry.written_at = None;
        }
    }

    /// Drops every page. Observed entries keep their observer counts.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.observers > 0);
        for entry in entries.values_mut() {
            entry.pages.clear();
            entry.written_at = None;
            entry.updated_at = None;
            entry.error = None;
        }
        tracing::debug!(retained = entries.len(), "query cache cleared");
    }

    /// Evicts entries that nobody has observed for `cache_time`.
    ///
    /// Returns the number of evicted entries.
    pub fn gc(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let cache_time = self.cache_time;

        entries.retain(|_, entry| {
            entry.observers > 0
                || entry
                    .unobserved_since
                    .map_or(true, |since| since.elapsed() < cache_time)
        });

        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "evicted unobserved cache entries");
        }
        evicted
    }

    fn observe(&self, key: &ClassKey) {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        entry.observers += 1;
        entry.unobserved_since = None;
    }

    fn unobserve(&self, key: &ClassKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
            if entry.observers == 0 {
                entry.fetching = false;
                entry.unobserved_since = Some(Instant::now());
            }
        }
    }

    fn remove_pages(&self, key: &ClassKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.pages.clear();
            entry.written_at = None;
            entry.updated_at = None;
            entry.error = None;
            entry.fetching = false;
        }
    }

    fn set_fetching(&self, key: &ClassKey, fetching: bool) {
        self.lock()
            .entry(key.clone())
            .or_insert_with(CacheEntry::new)
            .fetching = fetching;
    }

    fn write(&self, key: &ClassKey, append: bool, outcome: &Result<PaginatedList<T>>) {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);

        let next_page = entry.pages.last().map(|last| last.page.saturating_add(1));

        match outcome {
            Ok(list) if append && next_page != Some(list.page) => {
                tracing::debug!(
                    key = %key,
                    page = list.page,
                    cached_pages = entry.pages.len(),
                    "dropping page that does not continue the cached pages"
                );
            }
            Ok(list) => {
                if append {
                    entry.pages.push(list.clone());
                } else {
                    entry.pages = vec![list.clone()];
                }
                entry.written_at = Some(Instant::now());
                entry.updated_at = Some(Utc::now().timestamp());
                entry.error = None;

                tracing::debug!(
                    key = %key,
                    page = list.page,
                    total_pages = list.total_pages,
                    cached_pages = entry.pages.len(),
                    append,
                    "page written to query cache"
                );
            }
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "query cache fetch failed");
                entry.error = Some(e.user_message());
            }
        }

        entry.fetching = false;
    }

    fn snapshot(&self, key: &ClassKey) -> StoreSnapshot<T> {
        self.lock()
            .get(key)
            .map(CacheEntry::snapshot)
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClassKey, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Active class of an [`InfiniteQueryStore`].
#[derive(Debug, Clone)]
struct ActiveQuery {
    key: ClassKey,
    query: Query,
}

/// One list's view onto a [`QueryCache`].
///
/// # Examples
///
/// ```
/// use pagesync::domain::{Filters, QueryComposer};
/// use pagesync::service::{InMemoryService, Searchable};
/// use pagesync::storage::{InfiniteQueryStore, QueryCache};
/// use serde::Serialize;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Clone, Serialize)]
/// struct Member { name: String }
///
/// impl Searchable for Member {
///     fn search_text(&self) -> String { self.name.clone() }
/// }
///
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
/// # rt.block_on(async {
/// let records = (0..15).map(|i| Member { name: format!("Member {i}") }).collect();
/// let cache: QueryCache<Member> = QueryCache::new(Duration::from_secs(30), Duration::from_secs(300));
/// let store = InfiniteQueryStore::new(cache, Arc::new(InMemoryService::new(records)));
///
/// store.use_query(&QueryComposer::new(10).compose(&Filters::new(), "", 1));
/// store.fetch_next_page().await;
/// assert!(store.has_next_page());
/// store.fetch_next_page().await;
/// assert_eq!(store.items().len(), 15);
/// assert!(store.fetch_next_page().await.is_none());
/// # });
/// ```
pub struct InfiniteQueryStore<T> {
    cache: QueryCache<T>,
    service: Arc<dyn SearchService<T>>,
    active: Mutex<Option<ActiveQuery>>,
    updates: watch::Sender<StoreSnapshot<T>>,
}

impl<T> InfiniteQueryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a store over `cache`, fetching from `service`.
    pub fn new(cache: QueryCache<T>, service: Arc<dyn SearchService<T>>) -> Self {
        let (updates, _) = watch::channel(StoreSnapshot::default());
        Self {
            cache,
            service,
            active: Mutex::new(None),
            updates,
        }
    }

    /// Cache key of `query` (every field except `page`).
    #[must_use]
    pub fn query_key(query: &Query) -> ClassKey {
        ClassKey::new(query, &[])
    }

    /// The cache this store reads and writes.
    pub fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    /// Points the store at the class of `query` without fetching.
    pub fn use_query(&self, query: &Query) {
        self.switch_to(Self::query_key(query), query);
        self.publish();
    }

    /// Fetches one page of the active query from the search service.
    ///
    /// # Errors
    ///
    /// Returns transport and service failures alike.
    pub async fn fetch_page(&self, query: &Query, page_param: u32) -> Result<PaginatedList<T>> {
        self.service.fetch_page(&query.with_page(page_param)).await
    }

    /// Whether the last cached page of the active class reports a later page.
    pub fn has_next_page(&self) -> bool {
        self.active()
            .and_then(|active| self.cache.last_cursor(&active.key))
            .is_some_and(|c| c.has_more())
    }

    /// Appends the page after the last cached one.
    ///
    /// Fetches page 1 when nothing is cached yet. Returns `None` without a fetch
    /// when pagination is exhausted or no query is active, and `None` after a
    /// failed fetch (the message is kept in the snapshot).
    pub async fn fetch_next_page(&self) -> Option<PaginatedList<T>> {
        let active = self.active()?;
        let last = self.cache.last_cursor(&active.key);

        let (page, append) = match last {
            Some(cursor) => (cursor.next_page()?, true),
            None => (1, false),
        };

        self.run(&active, page, append).await
    }

    /// Refetches page 1 of the active class and replaces its pages.
    ///
    /// Other keys are untouched. On failure the cached pages stay.
    pub async fn refetch(&self) -> Option<PaginatedList<T>> {
        let active = self.active()?;
        self.cache.invalidate(&active.key);
        self.run(&active, 1, false).await
    }

    /// Concatenated items of the active class.
    pub fn items(&self) -> Vec<T> {
        self.active()
            .map(|active| self.cache.items(&active.key))
            .unwrap_or_default()
    }

    async fn run(&self, active: &ActiveQuery, page: u32, append: bool) -> Option<PaginatedList<T>> {
        self.cache.set_fetching(&active.key, true);
        self.publish();

        let outcome = self.fetch_page(&active.query, page).await;
        self.cache.write(&active.key, append, &outcome);
        self.publish();
        outcome.ok()
    }

    fn switch_to(&self, key: ClassKey, query: &Query) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|a| a.key == key) {
            return;
        }

        if let Some(previous) = active.take() {
            self.cache.unobserve(&previous.key);
        }
        self.cache.observe(&key);
        *active = Some(ActiveQuery {
            key,
            query: query.with_page(1),
        });
        drop(active);

        self.cache.gc();
    }

    fn active(&self) -> Option<ActiveQuery> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot_active());
    }

    fn snapshot_active(&self) -> StoreSnapshot<T> {
        self.active()
            .map(|active| self.cache.snapshot(&active.key))
            .unwrap_or_default()
    }
}

#[async_trait]
impl<T> PagedStore<T> for InfiniteQueryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn cached_cursor(&self, class: &ClassKey) -> Option<Cursor> {
        let cursor = self.cache.fresh_cursor(class);
        if cursor.is_some() {
            tracing::debug!(key = %class, "fresh cached pages found");
        }
        cursor
    }

    fn synced_cursor(&self, class: &ClassKey) -> Option<Cursor> {
        self.cache.last_cursor(class)
    }

    fn activate(&self, class: &ClassKey, query: &Query, invalidate: bool) {
        if invalidate {
            self.cache.invalidate(class);
        }
        self.switch_to(class.clone(), query);
        self.publish();
    }

    fn begin(&self, request: &FetchRequest) {
        self.cache.set_fetching(&request.class, true);
        self.publish();
    }

    async fn load(&self, request: &FetchRequest) -> Result<PaginatedList<T>> {
        self.service.fetch_page(&request.query).await
    }

    fn commit(&self, response: FetchResponse<T>) {
        self.cache.write(
            &response.request.class,
            response.request.is_load_more(),
            &response.outcome,
        );
        self.publish();
    }

    fn reset(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(previous) = previous {
            tracing::debug!(key = %previous.key, "cursor store reset");
            self.cache.remove_pages(&previous.key);
            self.cache.unobserve(&previous.key);
        }
        self.publish();
    }

    fn release(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(previous) = previous {
            self.cache.unobserve(&previous.key);
        }
    }

    fn snapshot(&self) -> StoreSnapshot<T> {
        self.snapshot_active()
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot<T>> {
        self.updates.subscribe()
    }
}
