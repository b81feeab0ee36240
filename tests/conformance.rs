//! Behaviour every list binding must show, whichever backing store it uses.
//!
//! Each scenario is a generic async fn over the store type; the macro at the
//! bottom instantiates it once per store.

mod common;

use common::{options, settle, settled, strings, ScriptedService};
use pagesync::binding::ListBinding;
use pagesync::storage::{InfiniteQueryStore, PagedListStore, PagedStore, QueryCache};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

type MakeStore<S> = fn(Arc<ScriptedService>) -> Arc<S>;

fn paged_list_store(service: Arc<ScriptedService>) -> Arc<PagedListStore<String>> {
    Arc::new(PagedListStore::new(service))
}

fn query_cache_store(service: Arc<ScriptedService>) -> Arc<InfiniteQueryStore<String>> {
    let cache = QueryCache::new(Duration::from_secs(30), Duration::from_secs(300));
    Arc::new(InfiniteQueryStore::new(cache, service))
}

/// Binding whose first page (`A`, `B`) has landed.
async fn with_first_page<S>(
    make: MakeStore<S>,
    total_pages: u32,
) -> (Arc<ScriptedService>, ListBinding<String, S>)
where
    S: PagedStore<String> + 'static,
{
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();

    service.wait_for_calls(1).await;
    service.respond_page(0, &["A", "B"], 1, total_pages, u64::from(total_pages) * 2);
    settled(&list).await;

    (service, list)
}

async fn initial_load_then_load_more<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();

    service.wait_for_calls(1).await;
    let first = &service.calls()[0];
    assert_eq!(first.page, 1);
    assert_eq!(first.items_per_page, 10);
    assert_eq!(first.search_term, "");
    assert_eq!(first.filters.get("category"), Some(&json!("all")));
    assert!(list.snapshot().loading);

    service.respond_page(0, &["A", "B"], 1, 2, 20);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A", "B"]));
    assert!(snapshot.has_more);
    assert_eq!(snapshot.page, 1);

    list.handle_load_more();
    service.wait_for_calls(2).await;
    assert_eq!(service.calls()[1].page, 2);
    assert!(list.snapshot().loading);

    service.respond_page(1, &["C", "D"], 2, 2, 20);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A", "B", "C", "D"]));
    assert!(!snapshot.has_more);
    assert_eq!(snapshot.page, 2);
    assert_eq!(snapshot.error, None);
}

async fn filter_change_restarts_at_page_one<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 2).await;
    list.handle_load_more();
    service.wait_for_calls(2).await;
    service.respond_page(1, &["C", "D"], 2, 2, 20);
    assert_eq!(settled(&list).await.page, 2);

    list.set_filters(common::filters(json!({ "category": "filtered" })));
    service.wait_for_calls(3).await;

    let query = &service.calls()[2];
    assert_eq!(query.page, 1);
    assert_eq!(query.filters.get("category"), Some(&json!("filtered")));
    assert_eq!(list.snapshot().filters.get("category"), Some(&json!("filtered")));

    service.respond_page(2, &["X", "Y"], 1, 1, 2);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["X", "Y"]));
    assert_eq!(snapshot.page, 1);
    assert!(!snapshot.has_more);
}

async fn last_page_stops_pagination<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 1).await;
    assert!(!list.snapshot().has_more);

    list.handle_load_more();
    settle().await;
    assert_eq!(service.call_count(), 1);
}

async fn overlapping_load_more_fetches_once<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 3).await;

    list.handle_load_more();
    list.handle_load_more();
    service.wait_for_calls(2).await;
    settle().await;
    assert_eq!(service.call_count(), 2);

    service.respond_page(1, &["C", "D"], 2, 3, 6);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A", "B", "C", "D"]));
    assert_eq!(service.call_count(), 2);
}

async fn refresh_replaces_accumulated_pages<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 3).await;
    list.handle_load_more();
    service.wait_for_calls(2).await;
    service.respond_page(1, &["C", "D"], 2, 3, 6);
    settled(&list).await;

    list.handle_refresh();
    service.wait_for_calls(3).await;
    assert_eq!(service.calls()[2].page, 1);

    let during = list.snapshot();
    assert!(during.refreshing);
    assert!(!during.loading);
    assert_eq!(during.items, strings(&["A", "B", "C", "D"]));

    service.respond_page(2, &["A2", "B2"], 1, 3, 6);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A2", "B2"]));
    assert_eq!(snapshot.page, 1);
    assert!(snapshot.has_more);
}

async fn late_result_for_old_term_is_dropped<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();
    service.wait_for_calls(1).await;

    list.set_search_query("b");
    tokio::time::sleep(Duration::from_millis(301)).await;
    service.wait_for_calls(2).await;
    assert_eq!(service.calls()[1].search_term, "b");

    service.respond_page(0, &["OLD"], 1, 1, 1);
    settle().await;
    let snapshot = list.snapshot();
    assert!(snapshot.items.is_empty());
    assert!(snapshot.loading);

    service.respond_page(1, &["NEW"], 1, 1, 1);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["NEW"]));
    assert_eq!(snapshot.search_query, "b");
}

async fn refresh_supersedes_pending_load_more<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 3).await;

    list.handle_load_more();
    service.wait_for_calls(2).await;
    list.handle_refresh();
    service.wait_for_calls(3).await;

    service.respond_page(1, &["C", "D"], 2, 3, 6);
    settle().await;
    let snapshot = list.snapshot();
    assert_eq!(snapshot.items, strings(&["A", "B"]));
    assert!(snapshot.refreshing);

    service.respond_page(2, &["A2"], 1, 3, 6);
    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A2"]));
    assert_eq!(snapshot.page, 1);
}

async fn typing_burst_issues_one_query<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();
    service.wait_for_calls(1).await;
    service.respond_page(0, &["A"], 1, 1, 1);
    settled(&list).await;

    for text in ["s", "sm", "smi"] {
        list.set_search_query(text);
        assert_eq!(list.snapshot().search_query, text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(service.call_count(), 1);

    tokio::time::sleep(Duration::from_millis(250)).await;
    service.wait_for_calls(2).await;
    settle().await;

    assert_eq!(service.call_count(), 2);
    assert_eq!(service.calls()[1].search_term, "smi");
    assert_eq!(service.calls()[1].page, 1);
}

async fn failed_load_more_keeps_items<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let (service, list) = with_first_page(make, 2).await;

    list.handle_load_more();
    service.wait_for_calls(2).await;
    service.respond_failure(1, "Members unavailable");

    let snapshot = settled(&list).await;
    assert_eq!(snapshot.items, strings(&["A", "B"]));
    assert_eq!(snapshot.error.as_deref(), Some("Members unavailable"));
    assert!(snapshot.has_more);

    list.handle_load_more();
    service.wait_for_calls(3).await;
    assert_eq!(service.calls()[2].page, 2);
    assert_eq!(list.snapshot().error, None);
}

async fn failed_initial_load_reports_error<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();
    service.wait_for_calls(1).await;

    service.respond_transport_error(0, "connection refused");
    let snapshot = settled(&list).await;
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
    assert!(!snapshot.has_more);
}

async fn empty_result_is_not_an_error<S: PagedStore<String> + 'static>(make: MakeStore<S>) {
    let service = ScriptedService::new();
    let list = ListBinding::new(make(Arc::clone(&service)), options()).unwrap();
    service.wait_for_calls(1).await;

    service.respond_page(0, &[], 1, 0, 0);
    let snapshot = settled(&list).await;
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.error, None);
    assert!(!snapshot.has_more);
}

async fn reset_clears_and_optionally_refetches<S>(make: MakeStore<S>)
where
    S: PagedStore<String> + 'static,
{
    let (service, list) = with_first_page(make, 2).await;

    list.reset(false);
    settle().await;
    let snapshot = list.snapshot();
    assert!(snapshot.items.is_empty());
    assert!(!snapshot.loading);
    assert!(!snapshot.has_more);
    assert_eq!(service.call_count(), 1);

    list.reset(true);
    service.wait_for_calls(2).await;
    assert_eq!(service.calls()[1].page, 1);
    service.respond_page(1, &["A", "B"], 1, 2, 4);
    assert_eq!(settled(&list).await.items, strings(&["A", "B"]));
}

macro_rules! conformance {
    ($($scenario:ident),* $(,)?) => {
        mod paged_list {
            $(
                #[tokio::test(start_paused = true)]
                async fn $scenario() {
                    super::$scenario(super::paged_list_store).await;
                }
            )*
        }

        mod query_cache {
            $(
                #[tokio::test(start_paused = true)]
                async fn $scenario() {
                    super::$scenario(super::query_cache_store).await;
                }
            )*
        }
    };
}

conformance!(
    initial_load_then_load_more,
    filter_change_restarts_at_page_one,
    last_page_stops_pagination,
    overlapping_load_more_fetches_once,
    refresh_replaces_accumulated_pages,
    late_result_for_old_term_is_dropped,
    refresh_supersedes_pending_load_more,
    typing_burst_issues_one_query,
    failed_load_more_keeps_items,
    failed_initial_load_reports_error,
    empty_result_is_not_an_error,
    reset_clears_and_optionally_refetches,
);
