//! Store snapshot model.
//!
//! Both backing stores publish the same [`StoreSnapshot`] shape so a list binding
//! can read them interchangeably. Snapshots are plain owned values, cloned out of
//! the store under its lock.

use serde::{Deserialize, Serialize};

/// Point-in-time view of a backing store's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot<T> {
    /// Accumulated items of the active list, in page order.
    pub items: Vec<T>,

    /// Page number of the last applied page (`1` for an empty list).
    pub page: u32,

    /// Whether a later page exists.
    pub has_more: bool,

    /// Whether a fetch is running against the store.
    pub loading: bool,

    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,

    /// `totalItems` reported by the last applied page.
    pub total_items: u64,

    /// Unix timestamp (seconds) of the last applied page, `None` before any page.
    pub updated_at: Option<i64>,
}

impl<T> Default for StoreSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            has_more: false,
            loading: false,
            error: None,
            total_items: 0,
            updated_at: None,
        }
    }
}

impl<T> StoreSnapshot<T> {
    /// Returns `true` for a settled list with no items and no error.
    ///
    /// Rendering shows this as the empty state, never as an error banner.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.items.is_empty() && !self.loading && self.error.is_none() && self.updated_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_unix_timestamp() {
        let snapshot = StoreSnapshot {
            items: vec!["A".to_string()],
            total_items: 1,
            updated_at: Some(1_700_000_000),
            ..StoreSnapshot::default()
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["updatedAt"], 1_700_000_000);
        assert_eq!(json["hasMore"], false);

        let decoded: StoreSnapshot<String> = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, snapshot);
        assert!(!decoded.is_empty_result());
    }

    #[test]
    fn empty_result_needs_an_applied_page() {
        let mut snapshot: StoreSnapshot<String> = StoreSnapshot::default();
        assert!(!snapshot.is_empty_result());

        snapshot.updated_at = Some(chrono::Utc::now().timestamp());
        assert!(snapshot.is_empty_result());
    }
}
