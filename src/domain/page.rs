//! Page results and the service response envelope.

use super::error::{PagesyncError, Result};
use serde::{Deserialize, Serialize};

/// One page of search results as returned by the search service.
///
/// ```json
/// { "items": [...], "page": 1, "totalPages": 2, "totalItems": 20 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedList<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// 1-based page number this result belongs to.
    pub page: u32,
    /// Total number of pages for the query.
    pub total_pages: u32,
    /// Total number of items across all pages.
    pub total_items: u64,
}

impl<T> PaginatedList<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, page: u32, total_pages: u32, total_items: u64) -> Self {
        Self {
            items,
            page,
            total_pages,
            total_items,
        }
    }

    /// Creates the terminal empty result (`hasMore == false`).
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), 1, 0, 0)
    }

    /// Returns `true` if a later page exists.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// Returns `true` when `page` lies beyond `totalPages` for a non-empty result.
    ///
    /// Such pages are still applied, but treated as the last page.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        self.total_items > 0 && self.page > self.total_pages
    }

    /// Cursor describing where this page leaves pagination.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        Cursor {
            page: self.page,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

/// Page-cursor bookkeeping derived from the most recently applied page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// Page number of the last applied page.
    pub page: u32,
    /// `totalPages` reported with it.
    pub total_pages: u32,
    /// `totalItems` reported with it.
    pub total_items: u64,
}

impl Cursor {
    /// Returns `true` if a later page exists.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// Page to request next, or `None` when pagination is exhausted.
    #[must_use]
    pub const fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            Some(self.page + 1)
        } else {
            None
        }
    }
}

/// Error payload of a failed service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable failure reason.
    #[serde(default)]
    pub message: String,
}

/// Service response envelope: `{ isSuccess, value }` or `{ isSuccess: false, error }`.
///
/// # Examples
///
/// ```
/// use pagesync::domain::{ApiResponse, PaginatedList};
///
/// let body = r#"{"isSuccess":false,"error":{"message":"Not allowed"}}"#;
/// let response: ApiResponse<PaginatedList<String>> = serde_json::from_str(body)?;
/// assert_eq!(response.into_result().unwrap_err().user_message(), "Not allowed");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub is_success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Wraps a successful payload.
    pub fn success(value: T) -> Self {
        Self {
            is_success: true,
            value: Some(value),
            error: None,
        }
    }

    /// Wraps a failure message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            value: None,
            error: Some(ApiError {
                message: message.into(),
            }),
        }
    }

    /// Converts the envelope into a `Result`.
    ///
    /// `isSuccess: false` becomes [`PagesyncError::Service`], so callers treat it
    /// exactly like a transport failure.
    ///
    /// # Errors
    ///
    /// Returns `Service` for failed responses and `MissingValue` for successful
    /// responses without a payload.
    pub fn into_result(self) -> Result<T> {
        if self.is_success {
            self.value.ok_or(PagesyncError::MissingValue)
        } else {
            Err(PagesyncError::Service(
                self.error.map(|e| e.message).unwrap_or_default(),
            ))
        }
    }
}
