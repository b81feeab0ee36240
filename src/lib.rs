//! Pagesync: incremental paginated search and list synchronization.
//!
//! Pagesync is the data layer behind a searchable, infinitely-scrolling list. It
//! provides:
//! - Debounced search text merged with structured filters into one canonical query
//! - Page-cursor bookkeeping with refresh (replace) and load-more (append) semantics
//! - Suppression of overlapping load-more triggers and of stale results
//! - Two interchangeable backing stores: one mutable list, or a per-query page cache
//! - A single list contract every screen consumes, whatever the store

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! The crate follows a layered architecture pattern:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Binding Layer (binding/)                           │  ← Screen-facing
//! │  - Debounced search text                            │
//! │  - ListBindingContract + snapshots                  │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │  ← Fetch coordinator
//! │  - Event handling                                   │
//! │  - Stale-result suppression                         │
//! │  - Store actions                                    │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Worker Layer  │   │ Storage Layer │   │ Service Layer │
//! │ (worker/)     │   │ (storage/)    │   │ (service/)    │
//! │ - Fetch tasks │   │ - Paged list  │   │ - Search API  │
//! │ - Trace ctx   │   │ - Query cache │   │ - In-memory   │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain Layer (domain/)                             │
//! │  - Query, class keys, composer                      │
//! │  - Pages, response envelope                         │
//! │  - Error types                                      │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - OpenTelemetry tracing                            │
//! │  - File-based OTLP export                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: Queries, pages, errors
//! - [`app`]: Fetch coordinator state machine
//! - [`worker`]: Fetch requests and their execution
//! - [`storage`]: Backing stores
//! - [`service`]: Search service boundary
//! - [`binding`]: List bindings and the debouncer
//! - [`observability`]: OpenTelemetry tracing
//!
//! # Example
//!
//! ```rust
//! use pagesync::binding::{ListBinding, ListBindingContract, ListOptions};
//! use pagesync::service::{InMemoryService, Searchable};
//! use pagesync::storage::{InfiniteQueryStore, QueryCache};
//! use pagesync::Config;
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Serialize)]
//! struct Member { name: String, gender: String }
//!
//! impl Searchable for Member {
//!     fn search_text(&self) -> String { self.name.clone() }
//! }
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap();
//! # rt.block_on(async {
//! let config = Config::default();
//! let service = Arc::new(InMemoryService::new(vec![
//!     Member { name: "Ann Smith".into(), gender: "female".into() },
//!     Member { name: "Bob Smith".into(), gender: "male".into() },
//! ]));
//! let cache: QueryCache<Member> = QueryCache::from_config(&config);
//! let store = Arc::new(InfiniteQueryStore::new(cache, service));
//! let list = ListBinding::new(store, ListOptions::from_config(&config))?;
//!
//! list.set_search_query("ann");
//! tokio::time::sleep(std::time::Duration::from_millis(config.debounce_ms + 1)).await;
//! list.subscribe().wait_for(|s| !s.loading).await.ok();
//! assert_eq!(list.items().len(), 1);
//! # Ok::<(), pagesync::PagesyncError>(())
//! # }).unwrap();
//! ```

pub mod app;
pub mod binding;
pub mod domain;
pub mod observability;
pub mod service;
pub mod storage;
pub mod worker;

pub use binding::{ListBinding, ListBindingContract, ListOptions, ListSnapshot};
pub use domain::{PagesyncError, Result};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Layer configuration.
///
/// Built from defaults, a string map (lenient), or a TOML document (strict).
///
/// # Example
///
/// ```toml
/// debounce_ms = 250
/// items_per_page = 20
/// stale_time_ms = 60000
/// trace_level = "pagesync=debug"
/// trace_file = "/tmp/pagesync-otlp.json"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Quiescence window for search text in milliseconds. `0` applies input
    /// immediately. Default: `300`
    pub debounce_ms: u64,

    /// Page size stamped on every query. Must be at least 1. Default: `10`
    pub items_per_page: u32,

    /// Cached pages younger than this are reused without a fetch. Default: `30000`
    pub stale_time_ms: u64,

    /// Unobserved cache entries older than this are evicted. Default: `300000`
    pub cache_time_ms: u64,

    /// Tracing filter directive.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`, or any `EnvFilter`
    /// directive. Default: `"info"`
    pub trace_level: Option<String>,

    /// OTLP JSON trace output file. Without it, events go to stderr.
    pub trace_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            items_per_page: 10,
            stale_time_ms: 30_000,
            cache_time_ms: 300_000,
            trace_level: None,
            trace_file: None,
        }
    }
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// # Parsing Rules
    ///
    /// - Numeric keys fall back to their defaults when missing or unparsable
    /// - `items_per_page` of `0` falls back to the default
    /// - `trace_level` and `trace_file` are taken verbatim; empty means unset
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use pagesync::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("items_per_page".to_string(), "25".to_string());
    /// map.insert("debounce_ms".to_string(), "soon".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.items_per_page, 25);
    /// assert_eq!(config.debounce_ms, 300);
    /// ```
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();

        let number = |key: &str| map.get(key).and_then(|s| s.trim().parse::<u64>().ok());
        let text = |key: &str| {
            map.get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            debounce_ms: number("debounce_ms").unwrap_or(defaults.debounce_ms),
            items_per_page: number("items_per_page")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.items_per_page),
            stale_time_ms: number("stale_time_ms").unwrap_or(defaults.stale_time_ms),
            cache_time_ms: number("cache_time_ms").unwrap_or(defaults.cache_time_ms),
            trace_level: text("trace_level"),
            trace_file: text("trace_file"),
        }
    }

    /// Parses and validates a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PagesyncError::Parse`] for malformed TOML, unknown keys or
    /// mistyped values, and [`PagesyncError::Config`] if validation fails.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| PagesyncError::Parse(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PagesyncError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading configuration");
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks invariants that the type cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`PagesyncError::Config`] if `items_per_page` is `0`.
    pub fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 {
            return Err(PagesyncError::Config(
                "items_per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.items_per_page, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn map_parsing_is_lenient() {
        let map: BTreeMap<String, String> = [
            ("items_per_page", "0"),
            ("stale_time_ms", " 500 "),
            ("trace_level", "  "),
            ("trace_file", "/tmp/t.json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = Config::from_map(&map);
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.stale_time_ms, 500);
        assert_eq!(config.trace_level, None);
        assert_eq!(config.trace_file.as_deref(), Some("/tmp/t.json"));
    }

    #[test]
    fn toml_parsing_is_strict() {
        let config = Config::from_toml_str("debounce_ms = 0\nitems_per_page = 25\n").unwrap();
        assert_eq!(config.debounce_ms, 0);
        assert_eq!(config.items_per_page, 25);
        assert_eq!(config.cache_time_ms, 300_000);

        assert!(matches!(
            Config::from_toml_str("items_per_page = 0"),
            Err(PagesyncError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("page_size = 5"),
            Err(PagesyncError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("debounce_ms = \"fast\""),
            Err(PagesyncError::Parse(_))
        ));
    }
}
