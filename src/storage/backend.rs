//! Backing store abstraction.
//!
//! This module defines the [`PagedStore`] trait that abstracts over the two ways a
//! list keeps its pages: a single mutable list that is replaced or appended to, and
//! a cursor cache keyed by query class. The list binding drives either one through
//! the same calls, in the order the fetch coordinator decides.
//!
//! # Call Order
//!
//! ```text
//! activate ─► begin ─► load (on a fetch task) ─► commit
//!                 ▲                                 │
//!                 └──────── next trigger ◄──────────┘
//! ```
//!
//! `commit` is only ever called for the fetch of record; stale completions are
//! dropped before they reach the store.

use crate::domain::{ClassKey, Cursor, PaginatedList, Query, Result};
use crate::storage::models::StoreSnapshot;
use crate::worker::{FetchRequest, FetchResponse};
use async_trait::async_trait;
use tokio::sync::watch;

/// Abstraction over backing stores for one paginated list.
///
/// Implementations must be shareable between the binding and its fetch tasks.
///
/// # Implementations
///
/// - [`crate::storage::PagedListStore`]: one mutable list (manual paging)
/// - [`crate::storage::InfiniteQueryStore`]: per-class page arrays in a shared
///   [`crate::storage::QueryCache`]
#[async_trait]
pub trait PagedStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Cursor of fresh cached pages for `class`, if the store can show them
    /// without fetching.
    ///
    /// The manually-paged store never caches.
    fn cached_cursor(&self, _class: &ClassKey) -> Option<Cursor> {
        None
    }

    /// Cursor of the last page the store holds for `class`, fresh or not.
    ///
    /// Reported by stores whose pages other lists may also write, so a binding
    /// continues from where the pages actually end. The manually-paged store owns
    /// its list alone and reports nothing.
    fn synced_cursor(&self, _class: &ClassKey) -> Option<Cursor> {
        None
    }

    /// Switches the store to the class of `query`.
    ///
    /// With `invalidate` set, cached pages of the class must not be reused.
    fn activate(&self, class: &ClassKey, query: &Query, invalidate: bool);

    /// Marks the store as loading for `request`.
    fn begin(&self, request: &FetchRequest);

    /// Fetches the page `request` targets from the search service.
    ///
    /// Must not touch the visible list; results are applied by [`Self::commit`].
    ///
    /// # Errors
    ///
    /// Returns transport and service failures alike.
    async fn load(&self, request: &FetchRequest) -> Result<PaginatedList<T>>;

    /// Applies a completion of the fetch of record.
    ///
    /// A successful load-more appends; any other success replaces. A failure
    /// records the message and leaves the items untouched. Loading is always
    /// cleared.
    fn commit(&self, response: FetchResponse<T>);

    /// Clears the store back to an empty, idle list.
    fn reset(&self);

    /// Releases the store's interest in its active class (binding teardown).
    fn release(&self) {}

    /// Current view of the active list.
    fn snapshot(&self) -> StoreSnapshot<T>;

    /// Subscribes to snapshots published after every store mutation.
    fn subscribe(&self) -> watch::Receiver<StoreSnapshot<T>>;
}
