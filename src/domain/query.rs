//! Canonical query objects and their equivalence classes.
//!
//! A [`Query`] merges a free-text search term with structured filter fields and a
//! page cursor. Queries that agree on everything except `page` belong to the same
//! equivalence class, identified by a [`ClassKey`]. Class keys are built from a
//! canonical serialization (object keys sorted at every depth), so two filter maps
//! built in different insertion orders compare equal.
//!
//! [`QueryComposer`] is the stateless merge step. It never decides when the page
//! resets; the coordinator does that when it observes a class change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Structured filter fields, passed through to the search service untouched.
pub type Filters = Map<String, Value>;

/// Wire name of the free-text search field.
pub const SEARCH_TERM_KEY: &str = "searchTerm";

/// Wire name of the 1-based page cursor.
pub const PAGE_KEY: &str = "page";

/// Wire name of the page size.
pub const ITEMS_PER_PAGE_KEY: &str = "itemsPerPage";

const RESERVED_KEYS: [&str; 3] = [SEARCH_TERM_KEY, PAGE_KEY, ITEMS_PER_PAGE_KEY];

/// An immutable search request: search term, page cursor, page size and filters.
///
/// Serializes flat, the way the search endpoint expects it:
///
/// ```json
/// { "searchTerm": "", "page": 1, "itemsPerPage": 10, "category": "all" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Free-text search term (already debounced when produced by a binding).
    pub search_term: String,

    /// 1-based page cursor.
    pub page: u32,

    /// Page size, fixed by the owning list binding.
    pub items_per_page: u32,

    /// Structured filters. Unknown fields are passed through.
    #[serde(flatten)]
    pub filters: Filters,
}

impl Query {
    /// Returns a copy of this query targeting `page` (clamped to at least 1).
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Returns the equivalence-class key of this query, ignoring `page`.
    #[must_use]
    pub fn class_key(&self) -> ClassKey {
        ClassKey::new(self, &[])
    }

    /// Returns `true` when both queries belong to the same equivalence class.
    #[must_use]
    pub fn same_class(&self, other: &Self) -> bool {
        self.class_key() == other.class_key()
    }

    /// Flattens the query into ordered `(key, value)` pairs for a REST query string.
    ///
    /// # Encoding Rules
    ///
    /// - `searchTerm` is emitted only when non-empty
    /// - `page` and `itemsPerPage` are always emitted
    /// - filters follow in sorted key order
    /// - `null` and empty-string filters are skipped
    /// - arrays repeat the key once per element
    /// - nested objects are JSON-encoded
    ///
    /// # Example
    ///
    /// ```
    /// use pagesync::domain::QueryComposer;
    /// use serde_json::json;
    ///
    /// let filters = json!({ "familyId": 7, "gender": null }).as_object().cloned().unwrap();
    /// let query = QueryComposer::new(20).compose(&filters, "ann", 2);
    /// let params = query.to_params();
    /// assert_eq!(params[0], ("searchTerm".to_string(), "ann".to_string()));
    /// assert!(params.iter().all(|(k, _)| k != "gender"));
    /// ```
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);

        if !self.search_term.is_empty() {
            params.push((SEARCH_TERM_KEY.to_string(), self.search_term.clone()));
        }
        params.push((PAGE_KEY.to_string(), self.page.to_string()));
        params.push((ITEMS_PER_PAGE_KEY.to_string(), self.items_per_page.to_string()));

        let mut keys: Vec<&String> = self.filters.keys().collect();
        keys.sort();

        for key in keys {
            match &self.filters[key.as_str()] {
                Value::Array(values) => {
                    for value in values {
                        if let Some(encoded) = encode_param(value) {
                            params.push((key.clone(), encoded));
                        }
                    }
                }
                value => {
                    if let Some(encoded) = encode_param(value) {
                        params.push((key.clone(), encoded));
                    }
                }
            }
        }

        params
    }
}

fn encode_param(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(canonicalize(value).to_string()),
    }
}

/// Identity of a query equivalence class.
///
/// Built from a canonical JSON rendering of every query field except `page`, plus
/// the binding's external dependencies. Two keys are equal iff the queries are
/// structurally equal outside `page` and the dependency lists match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassKey(String);

impl ClassKey {
    /// Computes the key for `query` under the given external dependencies.
    #[must_use]
    pub fn new(query: &Query, dependencies: &[Value]) -> Self {
        let mut canonical = Map::new();
        if !dependencies.is_empty() {
            canonical.insert(
                "dependencies".to_string(),
                canonicalize(&Value::Array(dependencies.to_vec())),
            );
        }
        canonical.insert(
            "filters".to_string(),
            canonicalize(&Value::Object(query.filters.clone())),
        );
        canonical.insert(ITEMS_PER_PAGE_KEY.to_string(), Value::from(query.items_per_page));
        canonical.insert(SEARCH_TERM_KEY.to_string(), Value::from(query.search_term.as_str()));

        Self(Value::Object(canonical).to_string())
    }

    /// Returns the canonical serialization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rebuilds `value` with object keys inserted in sorted order at every depth.
///
/// Holds regardless of whether `serde_json` keeps insertion order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(values) => Value::Array(values.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Stateless merge of structured filters, search term and page into a [`Query`].
///
/// Holds the page size so every query a binding composes carries the same
/// `itemsPerPage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryComposer {
    items_per_page: u32,
}

impl QueryComposer {
    /// Creates a composer for the given page size (clamped to at least 1).
    #[must_use]
    pub fn new(items_per_page: u32) -> Self {
        Self {
            items_per_page: items_per_page.max(1),
        }
    }

    /// Page size stamped on every composed query.
    #[must_use]
    pub const fn items_per_page(&self) -> u32 {
        self.items_per_page
    }

    /// Composes a query from `base_filters`, `search_term` and `page`.
    ///
    /// Copies the filters, overwrites the search term and sets the page. Reserved
    /// keys (`searchTerm`, `page`, `itemsPerPage`) found among the filters are
    /// dropped so they cannot shadow the real fields; every other field passes
    /// through.
    #[must_use]
    pub fn compose(&self, base_filters: &Filters, search_term: &str, page: u32) -> Query {
        let mut filters = base_filters.clone();
        for key in RESERVED_KEYS {
            if filters.remove(key).is_some() {
                tracing::trace!(key = key, "dropping reserved key from filters");
            }
        }

        Query {
            search_term: search_term.to_string(),
            page: page.max(1),
            items_per_page: self.items_per_page,
            filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(value: Value) -> Filters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn compose_overwrites_term_and_page_and_passes_unknown_fields() {
        let composer = QueryComposer::new(10);
        let base = filters(json!({ "category": "all", "livingOnly": true, "searchTerm": "stale" }));

        let query = composer.compose(&base, "smith", 3);

        assert_eq!(query.search_term, "smith");
        assert_eq!(query.page, 3);
        assert_eq!(query.items_per_page, 10);
        assert_eq!(query.filters.get("category"), Some(&json!("all")));
        assert_eq!(query.filters.get("livingOnly"), Some(&json!(true)));
        assert!(!query.filters.contains_key("searchTerm"));
    }

    #[test]
    fn compose_clamps_page_to_one() {
        let query = QueryComposer::new(10).compose(&Filters::new(), "", 0);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn class_key_ignores_page_and_key_order() {
        let composer = QueryComposer::new(10);
        let a = composer.compose(&filters(json!({ "a": 1, "b": { "y": 2, "x": 1 } })), "q", 1);
        let b = composer.compose(&filters(json!({ "b": { "x": 1, "y": 2 }, "a": 1 })), "q", 4);

        assert_eq!(a.class_key(), b.class_key());
        assert!(a.same_class(&b));
    }

    #[test]
    fn class_key_changes_with_term_filters_or_dependencies() {
        let composer = QueryComposer::new(10);
        let base = composer.compose(&filters(json!({ "category": "all" })), "", 1);

        let other_term = composer.compose(&base.filters, "x", 1);
        let other_filter = composer.compose(&filters(json!({ "category": "filtered" })), "", 1);

        assert_ne!(base.class_key(), other_term.class_key());
        assert_ne!(base.class_key(), other_filter.class_key());
        assert_ne!(
            ClassKey::new(&base, &[json!("family-1")]),
            ClassKey::new(&base, &[json!("family-2")])
        );
    }

    #[test]
    fn serializes_flat_with_camel_case_fields() {
        let query = QueryComposer::new(10).compose(&filters(json!({ "category": "all" })), "", 1);
        let value = serde_json::to_value(&query).unwrap();

        assert_eq!(
            value,
            json!({ "searchTerm": "", "page": 1, "itemsPerPage": 10, "category": "all" })
        );

        let back: Query = serde_json::from_value(value).unwrap();
        assert_eq!(back, query);
    }

    #[test]
    fn params_skip_empty_values_and_repeat_arrays() {
        let query = QueryComposer::new(5).compose(
            &filters(json!({
                "tags": ["a", "b"],
                "note": "",
                "parent": null,
                "range": { "to": 1900, "from": 1850 }
            })),
            "",
            2,
        );

        assert_eq!(
            query.to_params(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("itemsPerPage".to_string(), "5".to_string()),
                ("range".to_string(), r#"{"from":1850,"to":1900}"#.to_string()),
                ("tags".to_string(), "a".to_string()),
                ("tags".to_string(), "b".to_string()),
            ]
        );
    }
}
