//! Fetch execution on background tasks.
//!
//! The list binding never awaits the search service itself. Each dispatched
//! [`FetchRequest`] runs on its own tokio task through [`FetchWorker::run`], which
//! loads the page from the backing store and packages the outcome as a
//! [`FetchResponse`] for the coordinator. The worker has no say over whether the
//! result is applied; that is decided when the response comes back.

use crate::domain::{PaginatedList, Result};
use crate::storage::PagedStore;
use crate::worker::{FetchRequest, FetchResponse};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Runs fetch requests against a backing store.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchWorker;

impl FetchWorker {
    /// Helper for handling fetch results with consistent logging.
    fn handle_fetch_result<T>(
        request: &FetchRequest,
        result: Result<PaginatedList<T>>,
    ) -> Result<PaginatedList<T>> {
        match &result {
            Ok(list) => {
                tracing::debug!(
                    seq = request.seq,
                    page = list.page,
                    total_pages = list.total_pages,
                    item_count = list.items.len(),
                    "fetch successful"
                );
            }
            Err(e) => {
                tracing::debug!(
                    seq = request.seq,
                    page = request.page(),
                    error = %e,
                    "fetch failed"
                );
            }
        }
        result
    }

    /// Loads the page `request` targets and returns the completion.
    ///
    /// The fetch span is parented to the span that dispatched the request, using
    /// the trace context captured at dispatch time.
    ///
    /// # Example
    ///
    /// ```
    /// use pagesync::service::{InMemoryService, Searchable};
    /// use pagesync::storage::PagedListStore;
    /// use pagesync::worker::FetchWorker;
    /// # use pagesync::app::{handle_event, Action, Event, FetchState};
    /// # use pagesync::domain::{Filters, QueryComposer};
    /// use serde::Serialize;
    /// use std::sync::Arc;
    ///
    /// #[derive(Clone, Serialize)]
    /// struct Tag { name: String }
    ///
    /// impl Searchable for Tag {
    ///     fn search_text(&self) -> String { self.name.clone() }
    /// }
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    /// # rt.block_on(async {
    /// let store: PagedListStore<Tag> = PagedListStore::new(Arc::new(InMemoryService::new(vec![
    ///     Tag { name: "admin".into() },
    /// ])));
    /// # let query = QueryComposer::new(10).compose(&Filters::new(), "", 1);
    /// # let mut state = FetchState::new();
    /// # let (_, actions) = handle_event::<Tag>(&mut state, Event::QueryChanged {
    /// #     class: query.class_key(), query, force: false, cached: None,
    /// # });
    /// # let Some(Action::Dispatch(request)) = actions.into_iter().last() else { unreachable!() };
    /// let response = FetchWorker::run(&store, request).await;
    /// assert_eq!(response.outcome.unwrap().items.len(), 1);
    /// # });
    /// ```
    pub async fn run<T, S>(store: &S, request: FetchRequest) -> FetchResponse<T>
    where
        T: Clone + Send + Sync + 'static,
        S: PagedStore<T> + ?Sized,
    {
        let span = tracing::debug_span!(
            "fetch",
            seq = request.seq,
            page = request.page(),
            kind = ?request.kind
        );
        if let Some(parent) = request.trace_context.as_ref().and_then(|tc| tc.to_otel_context()) {
            span.set_parent(parent);
        }

        let result = store.load(&request).instrument(span.clone()).await;
        let outcome = span.in_scope(|| Self::handle_fetch_result(&request, result));

        FetchResponse { request, outcome }
    }
}
