//! List binding: debounced input, coordinator, and store wired together.
//!
//! A [`ListBinding`] owns the inputs of one list screen (search text, filters,
//! external dependencies), composes them into a query, and drives a backing store
//! through the fetch coordinator. Fetches run on tokio tasks; their completions
//! re-enter the coordinator, which drops any that are no longer current.
//!
//! # Locking
//!
//! All coordinator events and the store actions they produce run under one mutex,
//! so the store sees mutations in exactly the order the coordinator decided. No
//! lock is held across an `.await`. Fetch tasks hold only a weak reference to the
//! binding; once it is dropped their completions are discarded.

use super::contract::{ListBindingContract, ListSnapshot};
use super::debounce::Debouncer;
use crate::app::{handle_event, Action, Event, FetchState};
use crate::domain::{ClassKey, Filters, PagesyncError, Query, QueryComposer, Result};
use crate::storage::PagedStore;
use crate::worker::{FetchResponse, FetchWorker};
use crate::Config;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Per-list settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    /// Quiescence window for the search text.
    pub debounce: Duration,
    /// Page size stamped on every query.
    pub items_per_page: u32,
    /// Search text the list starts with.
    pub initial_search: String,
    /// Filters the list starts with.
    pub initial_filters: Filters,
    /// Opaque values whose change forces a full reset.
    pub dependencies: Vec<Value>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ListOptions {
    /// Options with the debounce window and page size from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            items_per_page: config.items_per_page,
            initial_search: String::new(),
            initial_filters: Filters::new(),
            dependencies: Vec::new(),
        }
    }

    /// Sets the quiescence window for the search text.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_items_per_page(mut self, items_per_page: u32) -> Self {
        self.items_per_page = items_per_page;
        self
    }

    /// Sets the search text the list starts with.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.initial_search = search.into();
        self
    }

    /// Sets the filters the list starts with.
    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.initial_filters = filters;
        self
    }

    /// Sets the external dependencies the list starts with.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<Value>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// User-facing inputs of one list.
#[derive(Debug, Clone)]
struct Inputs {
    /// As typed.
    search_query: String,
    /// After the debounce window.
    applied_term: String,
    filters: Filters,
    dependencies: Vec<Value>,
}

#[derive(Debug)]
struct Inner {
    state: FetchState,
    inputs: Inputs,
}

struct Core<T, S> {
    store: Arc<S>,
    composer: QueryComposer,
    inner: Mutex<Inner>,
    updates: watch::Sender<ListSnapshot<T>>,
    runtime: Handle,
}

impl<T, S> Core<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: PagedStore<T> + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn compose(&self, inputs: &Inputs) -> (Query, ClassKey) {
        let query = self
            .composer
            .compose(&inputs.filters, &inputs.applied_term, 1);
        let class = ClassKey::new(&query, &inputs.dependencies);
        (query, class)
    }

    /// Recomputes the query from the inputs and lets the coordinator decide.
    fn recompose(self: &Arc<Self>, inner: &mut Inner, force: bool) {
        let (query, class) = self.compose(&inner.inputs);

        let unchanged = inner.state.class.as_ref() == Some(&class);
        let cached = if force || unchanged {
            None
        } else {
            self.store.cached_cursor(&class)
        };

        self.process(
            inner,
            Event::QueryChanged {
                query,
                class,
                force,
                cached,
            },
        );
    }

    fn process(self: &Arc<Self>, inner: &mut Inner, event: Event<T>) {
        let (changed, actions) = handle_event(&mut inner.state, event);
        let acted = !actions.is_empty();

        for action in actions {
            self.execute(action);
        }

        if changed || acted {
            self.publish(inner);
        }
    }

    fn execute(self: &Arc<Self>, action: Action<T>) {
        match action {
            Action::Activate {
                class,
                query,
                invalidate,
            } => self.store.activate(&class, &query, invalidate),
            Action::ResetStore => self.store.reset(),
            Action::Dispatch(request) => {
                self.store.begin(&request);

                let core = Arc::downgrade(self);
                let store = Arc::clone(&self.store);
                self.runtime.spawn(async move {
                    let response = FetchWorker::run(store.as_ref(), request).await;
                    match core.upgrade() {
                        Some(core) => core.complete(response),
                        None => tracing::debug!(
                            seq = response.request.seq,
                            "binding dropped before fetch completed"
                        ),
                    }
                });
            }
            Action::Commit(response) => self.store.commit(response),
        }
    }

    fn complete(self: &Arc<Self>, response: FetchResponse<T>) {
        let mut inner = self.lock();
        self.process(&mut inner, Event::FetchCompleted(response));
        self.sync_cursor(&mut inner);
    }

    /// Aligns the coordinator's cursor with the pages the store actually holds.
    fn sync_cursor(self: &Arc<Self>, inner: &mut Inner) {
        let Some(class) = inner.state.class.clone() else {
            return;
        };
        if let Some(cursor) = self.store.synced_cursor(&class) {
            self.process(inner, Event::CursorSynced(cursor));
        }
    }

    fn apply_search_term(self: &Arc<Self>, term: String) {
        let mut inner = self.lock();
        if inner.state.closed {
            return;
        }
        tracing::debug!(term_len = term.len(), "debounced search term applied");
        inner.inputs.applied_term = term;
        self.recompose(&mut inner, false);
    }

    fn snapshot(&self, inner: &Inner) -> ListSnapshot<T> {
        let store = self.store.snapshot();
        ListSnapshot {
            items: store.items,
            loading: inner.state.phase.is_loading(),
            refreshing: inner.state.phase.is_refreshing(),
            error: inner.state.error.clone(),
            has_more: inner.state.has_more(),
            search_query: inner.inputs.search_query.clone(),
            filters: inner.inputs.filters.clone(),
            page: inner.state.page(),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(self.snapshot(inner));
    }
}

/// A searchable, paginated list over a backing store.
///
/// Creating a binding issues the initial page-1 fetch. Dropping it (or calling
/// [`Self::close`]) cancels the pending debounce timer; fetches still in flight
/// finish but are never applied.
///
/// # Examples
///
/// ```
/// use pagesync::binding::{ListBinding, ListOptions};
/// use pagesync::service::{InMemoryService, Searchable};
/// use pagesync::storage::PagedListStore;
/// use serde::Serialize;
/// use std::sync::Arc;
///
/// #[derive(Clone, Serialize)]
/// struct Member { name: String }
///
/// impl Searchable for Member {
///     fn search_text(&self) -> String { self.name.clone() }
/// }
///
/// # let rt = tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
/// # rt.block_on(async {
/// let records = (0..25).map(|i| Member { name: format!("Member {i}") }).collect();
/// let store: Arc<PagedListStore<Member>> =
///     Arc::new(PagedListStore::new(Arc::new(InMemoryService::new(records))));
/// let list = ListBinding::new(store, ListOptions::default()).unwrap();
///
/// let mut updates = list.subscribe();
/// updates.wait_for(|s| !s.loading).await.unwrap();
/// assert_eq!(list.snapshot().items.len(), 10);
/// assert!(list.snapshot().has_more);
/// # });
/// ```
pub struct ListBinding<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: PagedStore<T> + 'static,
{
    core: Arc<Core<T, S>>,
    debouncer: Mutex<Debouncer<String>>,
}

impl<T, S> ListBinding<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: PagedStore<T> + 'static,
{
    /// Creates a binding over `store` and dispatches the initial fetch.
    ///
    /// # Errors
    ///
    /// Returns [`PagesyncError::Runtime`] when called outside a tokio runtime.
    pub fn new(store: Arc<S>, options: ListOptions) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| PagesyncError::Runtime(e.to_string()))?;
        let (updates, _) = watch::channel(ListSnapshot::default());

        let inputs = Inputs {
            search_query: options.initial_search.clone(),
            applied_term: options.initial_search,
            filters: options.initial_filters,
            dependencies: options.dependencies,
        };

        let core = Arc::new(Core {
            store,
            composer: QueryComposer::new(options.items_per_page),
            inner: Mutex::new(Inner {
                state: FetchState::new(),
                inputs,
            }),
            updates,
            runtime: runtime.clone(),
        });

        {
            let mut inner = core.lock();
            tracing::debug!(
                items_per_page = core.composer.items_per_page(),
                debounce_ms = options.debounce.as_millis() as u64,
                "list binding created"
            );
            core.recompose(&mut inner, false);
        }

        Ok(Self {
            core,
            debouncer: Mutex::new(Debouncer::new(options.debounce, runtime)),
        })
    }

    /// Updates the search text.
    ///
    /// The text shows up in the snapshot immediately; the query follows once the
    /// input has been quiet for the debounce window, using the last value only.
    pub fn set_search_query(&self, query: impl Into<String>) {
        let text = query.into();
        {
            let mut inner = self.core.lock();
            if inner.state.closed {
                return;
            }
            inner.inputs.search_query.clone_from(&text);
            self.core.publish(&inner);
        }

        let core = Arc::downgrade(&self.core);
        self.debouncer().push(text, move |term| {
            if let Some(core) = core.upgrade() {
                core.apply_search_term(term);
            }
        });
    }

    /// Replaces the structured filters and recomputes the query immediately.
    pub fn set_filters(&self, filters: Filters) {
        let mut inner = self.core.lock();
        if inner.state.closed {
            return;
        }
        inner.inputs.filters = filters;
        self.core.recompose(&mut inner, false);
        self.core.publish(&inner);
    }

    /// Replaces the external dependencies.
    ///
    /// A changed list forces a reset and a fresh page-1 fetch even if the query
    /// itself is unchanged, bypassing cached pages.
    pub fn set_dependencies(&self, dependencies: Vec<Value>) {
        let mut inner = self.core.lock();
        if inner.state.closed || inner.inputs.dependencies == dependencies {
            return;
        }
        tracing::debug!(count = dependencies.len(), "external dependencies changed");
        inner.inputs.dependencies = dependencies;
        self.core.recompose(&mut inner, true);
    }

    /// Requests the next page.
    ///
    /// A no-op while any fetch is in flight or when no page is left.
    pub fn handle_load_more(&self) {
        let mut inner = self.core.lock();
        self.core.sync_cursor(&mut inner);
        self.core.process(&mut inner, Event::LoadMore);
    }

    /// Re-acquires page 1 and replaces the items on success.
    pub fn handle_refresh(&self) {
        let mut inner = self.core.lock();
        let (query, class) = self.core.compose(&inner.inputs);
        self.core.process(&mut inner, Event::Refresh { query, class });
    }

    /// Clears everything back to idle, keeping the current search and filters.
    ///
    /// With `refetch`, page 1 of the current query is fetched again.
    pub fn reset(&self, refetch: bool) {
        self.debouncer().cancel();

        let mut inner = self.core.lock();
        let pending = inner.inputs.search_query.clone();
        inner.inputs.applied_term = pending;
        let (query, class) = self.core.compose(&inner.inputs);
        self.core.process(
            &mut inner,
            Event::Reset {
                refetch,
                query,
                class,
            },
        );
    }

    /// Current state.
    pub fn snapshot(&self) -> ListSnapshot<T> {
        let inner = self.core.lock();
        self.core.snapshot(&inner)
    }

    /// Subscribes to snapshots published on every visible change.
    pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<T>> {
        self.core.updates.subscribe()
    }

    /// Query the list is currently showing (debounced term, page 1).
    pub fn query(&self) -> Query {
        let inner = self.core.lock();
        self.core.compose(&inner.inputs).0
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.core.store
    }

    /// Tears the binding down. Idempotent.
    ///
    /// Cancels the pending debounce timer and turns late fetch completions into
    /// no-ops.
    pub fn close(&self) {
        {
            let mut inner = self.core.lock();
            if inner.state.closed {
                return;
            }
            self.core.process(&mut inner, Event::Teardown);
        }
        self.debouncer().cancel();
        self.core.store.release();
        tracing::debug!("list binding closed");
    }

    fn debouncer(&self) -> MutexGuard<'_, Debouncer<String>> {
        self.debouncer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, S> ListBindingContract<T> for ListBinding<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: PagedStore<T> + 'static,
{
    fn snapshot(&self) -> ListSnapshot<T> {
        Self::snapshot(self)
    }

    fn set_search_query(&self, query: String) {
        Self::set_search_query(self, query);
    }

    fn set_filters(&self, filters: Filters) {
        Self::set_filters(self, filters);
    }

    fn handle_refresh(&self) {
        Self::handle_refresh(self);
    }

    fn handle_load_more(&self) {
        Self::handle_load_more(self);
    }

    fn reset(&self, refetch: bool) {
        Self::reset(self, refetch);
    }
}

impl<T, S> Drop for ListBinding<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: PagedStore<T> + 'static,
{
    fn drop(&mut self) {
        self.close();
    }
}
