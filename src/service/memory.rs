//! In-memory search service.
//!
//! Filters a local record set the way the remote endpoint does, then pages it.
//! Used for offline lists, demos and tests.
//!
//! # Filtering Algorithm
//!
//! 1. **Structured filters**: each filter is compared against the record's JSON
//!    field of the same name. `null`, `""` and the literal `"all"` match anything.
//!    An array filter matches if the field equals any element; an array field
//!    matches if it contains the filter value.
//! 2. **Search term**: split by whitespace, lowercased; every token must
//!    fuzzy-match the record's search text (skim algorithm).
//! 3. **Ordering**: unchanged for an empty term, otherwise by descending total
//!    match score (stable).
//! 4. **Paging**: `totalPages = ceil(totalItems / itemsPerPage)`; a page past the
//!    end returns no items.

use super::SearchService;
use crate::domain::{ApiResponse, PagesyncError, PaginatedList, Query, Result};
use async_trait::async_trait;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::Instrument;

/// Filter value that matches every record.
const MATCH_ALL: &str = "all";

/// A record the in-memory service can search.
pub trait Searchable: Clone + Serialize + Send + Sync + 'static {
    /// Text the search term is fuzzy-matched against (e.g. a member's full name).
    fn search_text(&self) -> String;
}

/// Injected failure for the next calls.
#[derive(Debug, Clone)]
enum Failure {
    Transport(PagesyncError),
    Service(String),
}

/// Search service over a local record set.
///
/// # Examples
///
/// ```
/// use pagesync::domain::{Filters, QueryComposer};
/// use pagesync::service::{InMemoryService, SearchService, Searchable};
/// use serde::Serialize;
///
/// #[derive(Clone, Serialize)]
/// struct Member { name: String }
///
/// impl Searchable for Member {
///     fn search_text(&self) -> String { self.name.clone() }
/// }
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let service = InMemoryService::new(vec![
///     Member { name: "Ann Smith".into() },
///     Member { name: "Bob Jones".into() },
/// ]);
/// let query = QueryComposer::new(10).compose(&Filters::new(), "smith", 1);
/// let page = service.fetch_page(&query).await.unwrap();
/// assert_eq!(page.items.len(), 1);
/// # });
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryService<T> {
    records: Mutex<Vec<T>>,
    failure: Mutex<Option<Failure>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl<T: Searchable> InMemoryService<T> {
    /// Creates a service over `records`.
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
            failure: Mutex::new(None),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Delays every answer by `latency` (uses the tokio clock).
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replaces the record set.
    pub fn set_records(&self, records: Vec<T>) {
        if let Ok(mut guard) = self.records.lock() {
            *guard = records;
        }
    }

    /// Makes every following call fail at the transport level until cleared.
    pub fn fail_transport(&self, error: PagesyncError) {
        self.set_failure(Some(Failure::Transport(error)));
    }

    /// Makes every following call answer `isSuccess: false` until cleared.
    pub fn fail_service(&self, message: impl Into<String>) {
        self.set_failure(Some(Failure::Service(message.into())));
    }

    /// Clears an injected failure.
    pub fn clear_failure(&self) {
        self.set_failure(None);
    }

    /// Number of searches served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_failure(&self, failure: Option<Failure>) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = failure;
        }
    }

    fn run(&self, query: &Query) -> Result<PaginatedList<T>> {
        let records = self
            .records
            .lock()
            .map_err(|e| PagesyncError::transport(format!("record set poisoned: {e}")))?;

        let tokens: Vec<String> = query
            .search_term
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let matcher = SkimMatcherV2::default();

        let mut matched: Vec<(i64, &T)> = records
            .iter()
            .filter(|record| matches_filters(*record, query))
            .filter_map(|record| {
                if tokens.is_empty() {
                    return Some((0, record));
                }
                let text = record.search_text().to_lowercase();
                tokens
                    .iter()
                    .map(|token| matcher.fuzzy_match(&text, token))
                    .sum::<Option<i64>>()
                    .map(|score| (score, record))
            })
            .collect();

        if !tokens.is_empty() {
            matched.sort_by(|a, b| b.0.cmp(&a.0));
        }

        let per_page = query.items_per_page.max(1) as usize;
        let total_items = matched.len();
        let total_pages = u32::try_from(total_items.div_ceil(per_page)).unwrap_or(u32::MAX);
        let page = query.page.max(1);
        let start = (page as usize - 1).saturating_mul(per_page);

        let items = matched
            .into_iter()
            .skip(start)
            .take(per_page)
            .map(|(_, record)| record.clone())
            .collect();

        Ok(PaginatedList::new(items, page, total_pages, total_items as u64))
    }
}

fn matches_filters<T: Serialize>(record: &T, query: &Query) -> bool {
    let Ok(Value::Object(fields)) = serde_json::to_value(record) else {
        return query.filters.values().all(is_wildcard);
    };

    query.filters.iter().all(|(key, wanted)| {
        if is_wildcard(wanted) {
            return true;
        }
        let Some(actual) = fields.get(key) else {
            return false;
        };
        match (wanted, actual) {
            (Value::Array(options), _) => options.iter().any(|o| o == actual),
            (_, Value::Array(values)) => values.iter().any(|v| v == wanted),
            _ => wanted == actual,
        }
    })
}

fn is_wildcard(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == MATCH_ALL,
        _ => false,
    }
}

#[async_trait]
impl<T: Searchable> SearchService<T> for InMemoryService<T> {
    async fn search(&self, query: &Query) -> Result<ApiResponse<PaginatedList<T>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let span = tracing::debug_span!(
            "memory_search",
            page = query.page,
            term_len = query.search_term.len()
        );

        async {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            let failure = self.failure.lock().ok().and_then(|f| f.clone());
            match failure {
                Some(Failure::Transport(e)) => return Err(e),
                Some(Failure::Service(message)) => return Ok(ApiResponse::failure(message)),
                None => {}
            }

            let page = self.run(query)?;
            tracing::debug!(
                total_items = page.total_items,
                returned = page.items.len(),
                "memory search served"
            );
            Ok(ApiResponse::success(page))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Filters, QueryComposer};
    use serde_json::json;
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::Layer;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Member {
        name: String,
        gender: String,
        tags: Vec<String>,
    }

    impl Searchable for Member {
        fn search_text(&self) -> String {
            self.name.clone()
        }
    }

    fn member(name: &str, gender: &str, tags: &[&str]) -> Member {
        Member {
            name: name.to_string(),
            gender: gender.to_string(),
            tags: tags.iter().map(ToString::to_string).collect(),
        }
    }

    fn service() -> InMemoryService<Member> {
        InMemoryService::new(vec![
            member("Ann Smith", "female", &["founder"]),
            member("Bob Smith", "male", &[]),
            member("Carla Jones", "female", &["founder"]),
            member("Dan Brown", "male", &[]),
            member("Eve Smithers", "female", &[]),
        ])
    }

    fn query(filters: Value, term: &str, page: u32, per_page: u32) -> Query {
        let filters: Filters = filters.as_object().cloned().unwrap_or_default();
        QueryComposer::new(per_page).compose(&filters, term, page)
    }

    #[tokio::test]
    async fn pages_unfiltered_records() {
        let service = service();

        let first = service.fetch_page(&query(json!({}), "", 1, 2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 5);
        assert!(first.has_more());

        let last = service.fetch_page(&query(json!({}), "", 3, 2)).await.unwrap();
        assert_eq!(last.items, vec![member("Eve Smithers", "female", &[])]);
        assert!(!last.has_more());
    }

    #[tokio::test]
    async fn structured_filters_and_wildcards() {
        let service = service();

        let women = service
            .fetch_page(&query(json!({ "gender": "female", "tags": "all" }), "", 1, 10))
            .await
            .unwrap();
        assert_eq!(women.total_items, 3);

        let founders = service
            .fetch_page(&query(json!({ "tags": "founder" }), "", 1, 10))
            .await
            .unwrap();
        assert_eq!(founders.total_items, 2);

        let either = service
            .fetch_page(&query(json!({ "name": ["Dan Brown", "Bob Smith"] }), "", 1, 10))
            .await
            .unwrap();
        assert_eq!(either.total_items, 2);
    }

    #[tokio::test]
    async fn fuzzy_term_requires_every_token() {
        let service = service();

        let smiths = service.fetch_page(&query(json!({}), "smith", 1, 10)).await.unwrap();
        assert_eq!(smiths.total_items, 3);

        let ann = service.fetch_page(&query(json!({}), "ann smith", 1, 10)).await.unwrap();
        assert_eq!(ann.items[0].name, "Ann Smith");
    }

    #[tokio::test]
    async fn empty_result_is_not_an_error() {
        let service = service();
        let none = service.fetch_page(&query(json!({}), "zzzz", 1, 10)).await.unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total_pages, 0);
        assert!(!none.has_more());
    }

    #[tokio::test]
    async fn injected_failures() {
        let service = service();

        service.fail_service("Family not found");
        let err = service.fetch_page(&query(json!({}), "", 1, 10)).await.unwrap_err();
        assert_eq!(err.user_message(), "Family not found");

        service.fail_transport(PagesyncError::transport("timeout"));
        assert!(service.search(&query(json!({}), "", 1, 10)).await.is_err());

        service.clear_failure();
        assert!(service.fetch_page(&query(json!({}), "", 1, 10)).await.is_ok());
        assert_eq!(service.calls(), 3);
    }

    /// Records the names of the spans each event was emitted in.
    struct EventScopes(Arc<Mutex<Vec<Vec<String>>>>);

    impl<S> Layer<S> for EventScopes
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let names = ctx
                .event_scope(event)
                .map(|scope| scope.from_root().map(|span| span.name().to_string()).collect())
                .unwrap_or_default();
            self.0.lock().unwrap().push(names);
        }
    }

    #[test]
    fn search_events_are_recorded_in_the_search_span() {
        let scopes = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(EventScopes(Arc::clone(&scopes)));
        let service = service().with_latency(Duration::from_millis(5));

        tracing::subscriber::with_default(subscriber, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            runtime.block_on(async {
                service.search(&query(json!({}), "", 1, 2)).await.unwrap();
            });
        });

        let scopes = scopes.lock().unwrap();
        assert!(!scopes.is_empty());
        assert!(scopes
            .iter()
            .all(|names| names.iter().any(|name| name == "memory_search")));
    }
}
