//! The shape every list screen consumes.
//!
//! Rendering reads a [`ListSnapshot`] and calls the control functions of
//! [`ListBindingContract`]; it never sees which backing store sits underneath.

use crate::domain::Filters;
use serde::Serialize;

/// Point-in-time state of a list binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot<T> {
    /// Accumulated items of the current query class.
    pub items: Vec<T>,
    /// An initial load or a load-more is running.
    pub loading: bool,
    /// A refresh is running.
    pub refreshing: bool,
    /// Message of the last failed fetch.
    pub error: Option<String>,
    /// Whether a later page exists.
    pub has_more: bool,
    /// Search text as typed (not yet debounced).
    pub search_query: String,
    /// Structured filters as last set.
    pub filters: Filters,
    /// Page number of the last applied page.
    pub page: u32,
}

impl<T> Default for ListSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            refreshing: false,
            error: None,
            has_more: false,
            search_query: String::new(),
            filters: Filters::new(),
            page: 1,
        }
    }
}

/// Read/control surface of a paginated, searchable list.
///
/// Only [`Self::snapshot`] and the control functions are required; the field
/// accessors read from a fresh snapshot.
pub trait ListBindingContract<T: Clone> {
    /// Current state.
    fn snapshot(&self) -> ListSnapshot<T>;

    /// Updates the search text; the query follows after the debounce window.
    fn set_search_query(&self, query: String);

    /// Replaces the structured filters; the query follows immediately.
    fn set_filters(&self, filters: Filters);

    /// Re-acquires page 1 and replaces the items on success.
    fn handle_refresh(&self);

    /// Appends the next page unless one is loading or none is left.
    fn handle_load_more(&self);

    /// Clears everything back to idle, optionally re-issuing the initial fetch.
    fn reset(&self, refetch: bool);

    /// Accumulated items of the current class.
    fn items(&self) -> Vec<T> {
        self.snapshot().items
    }

    /// Whether an initial load or load-more is running.
    fn loading(&self) -> bool {
        self.snapshot().loading
    }

    /// Whether a refresh is running.
    fn refreshing(&self) -> bool {
        self.snapshot().refreshing
    }

    /// Message of the last failed fetch.
    fn error(&self) -> Option<String> {
        self.snapshot().error
    }

    /// Whether another page can be loaded.
    fn has_more(&self) -> bool {
        self.snapshot().has_more
    }

    /// Search text as typed.
    fn search_query(&self) -> String {
        self.snapshot().search_query
    }

    /// Current structured filters.
    fn filters(&self) -> Filters {
        self.snapshot().filters
    }
}
