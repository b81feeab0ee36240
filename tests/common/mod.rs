//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use pagesync::binding::{ListBinding, ListOptions, ListSnapshot};
use pagesync::domain::{ApiResponse, Filters, PaginatedList, Query};
use pagesync::service::SearchService;
use pagesync::storage::PagedStore;
use pagesync::{PagesyncError, Result};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};

type Reply = Result<ApiResponse<PaginatedList<String>>>;

struct Call {
    query: Query,
    reply: Option<oneshot::Sender<Reply>>,
}

/// Search service whose every call blocks until the test answers it.
pub struct ScriptedService {
    calls: Mutex<Vec<Call>>,
    count: watch::Sender<usize>,
}

impl ScriptedService {
    pub fn new() -> Arc<Self> {
        let (count, _) = watch::channel(0);
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            count,
        })
    }

    /// Queries received so far, in call order.
    pub fn calls(&self) -> Vec<Query> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.query.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Waits until at least `n` calls have been received.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut count = self.count.subscribe();
        count.wait_for(|c| *c >= n).await.unwrap();
    }

    /// Answers call `index`.
    pub fn respond(&self, index: usize, reply: Reply) {
        let sender = self.calls.lock().unwrap()[index]
            .reply
            .take()
            .expect("call already answered");
        let _ = sender.send(reply);
    }

    /// Answers call `index` with a successful page.
    pub fn respond_page(
        &self,
        index: usize,
        items: &[&str],
        page: u32,
        total_pages: u32,
        total_items: u64,
    ) {
        let items = items.iter().map(ToString::to_string).collect();
        let list = PaginatedList::new(items, page, total_pages, total_items);
        self.respond(index, Ok(ApiResponse::success(list)));
    }

    /// Answers call `index` with `isSuccess: false`.
    pub fn respond_failure(&self, index: usize, message: &str) {
        self.respond(index, Ok(ApiResponse::failure(message)));
    }

    /// Fails call `index` at the transport level.
    pub fn respond_transport_error(&self, index: usize, message: &str) {
        self.respond(index, Err(PagesyncError::transport(message)));
    }
}

#[async_trait]
impl SearchService<String> for ScriptedService {
    async fn search(&self, query: &Query) -> Reply {
        let (tx, rx) = oneshot::channel();
        {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                query: query.clone(),
                reply: Some(tx),
            });
            self.count.send_replace(calls.len());
        }
        rx.await
            .unwrap_or_else(|_| Err(PagesyncError::transport("call abandoned")))
    }
}

pub fn filters(value: Value) -> Filters {
    value.as_object().cloned().unwrap_or_default()
}

/// Options for the reference scenario: category `all`, 10 per page, 300 ms debounce.
pub fn options() -> ListOptions {
    ListOptions::default()
        .with_debounce(Duration::from_millis(300))
        .with_items_per_page(10)
        .with_filters(filters(json!({ "category": "all" })))
}

/// Lets spawned tasks run (and paused time advance by 1 ms).
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Waits until no fetch is visibly running and returns the snapshot.
pub async fn settled<S>(list: &ListBinding<String, S>) -> ListSnapshot<String>
where
    S: PagedStore<String> + 'static,
{
    let mut updates = list.subscribe();
    updates
        .wait_for(|s| !s.loading && !s.refreshing)
        .await
        .unwrap();
    drop(updates);
    list.snapshot()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
