//! Domain layer for pagesync.
//!
//! This module contains the value types every other layer speaks: queries and
//! their equivalence classes, result pages, the service response envelope, and
//! the crate error type. Nothing here performs I/O or holds mutable state.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`query`]: `Query`, `ClassKey` and the stateless `QueryComposer`
//! - [`page`]: `PaginatedList`, `Cursor` and the `ApiResponse` envelope
//!
//! # Examples
//!
//! ```
//! use pagesync::domain::{Filters, QueryComposer};
//!
//! let composer = QueryComposer::new(10);
//! let first = composer.compose(&Filters::new(), "ann", 1);
//! let third = composer.compose(&Filters::new(), "ann", 3);
//! assert_eq!(first.class_key(), third.class_key());
//! ```

pub mod error;
pub mod page;
pub mod query;

pub use error::{PagesyncError, Result, FALLBACK_MESSAGE};
pub use page::{ApiError, ApiResponse, Cursor, PaginatedList};
pub use query::{ClassKey, Filters, Query, QueryComposer};
