//! Search service boundary.
//!
//! The layer consumes exactly one remote operation: a paged search returning the
//! `{ isSuccess, value | error }` envelope. Transport failures (the call itself
//! failing) come back as `Err`; service-reported failures come back as an
//! `ApiResponse` with `is_success == false`. [`SearchService::fetch_page`]
//! collapses both into a single `Result`, which is how every store consumes it.
//!
//! # Modules
//!
//! - [`memory`]: In-memory reference implementation with fuzzy matching

pub mod memory;

pub use memory::{InMemoryService, Searchable};

use crate::domain::{ApiResponse, PaginatedList, Query, Result};
use async_trait::async_trait;

/// Paged search over one record type.
///
/// # Implementations
///
/// - [`InMemoryService`]: filters and pages a local record set
/// - REST clients in the host application
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use pagesync::domain::{ApiResponse, PaginatedList, Query, Result};
/// use pagesync::service::SearchService;
///
/// struct Empty;
///
/// #[async_trait]
/// impl SearchService<String> for Empty {
///     async fn search(&self, _query: &Query) -> Result<ApiResponse<PaginatedList<String>>> {
///         Ok(ApiResponse::success(PaginatedList::empty()))
///     }
/// }
/// ```
#[async_trait]
pub trait SearchService<T: Send + 'static>: Send + Sync {
    /// Runs the search for `query` (its `page` selects the page).
    ///
    /// # Errors
    ///
    /// Returns [`crate::PagesyncError::Transport`] when the call itself fails.
    async fn search(&self, query: &Query) -> Result<ApiResponse<PaginatedList<T>>>;

    /// Runs the search and unwraps the envelope.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged, `Service` for `isSuccess: false`, and
    /// `MissingValue` for a success without payload.
    async fn fetch_page(&self, query: &Query) -> Result<PaginatedList<T>> {
        self.search(query).await?.into_result()
    }
}
