//! Actions representing side effects to be executed against the backing store.
//!
//! The event handler returns a `Vec<Action<T>>` after processing each event. The
//! list binding executes them in order, under the same lock that serialized the
//! event, so store mutations happen in exactly the order the coordinator decided.
//!
//! # Example
//!
//! ```rust
//! use pagesync::app::{handle_event, Action, Event, FetchState};
//! use pagesync::domain::{Filters, QueryComposer};
//!
//! let query = QueryComposer::new(10).compose(&Filters::new(), "", 1);
//! let mut state = FetchState::new();
//! let (_, actions) = handle_event::<String>(&mut state, Event::QueryChanged {
//!     class: query.class_key(),
//!     query,
//!     force: false,
//!     cached: None,
//! });
//! assert!(matches!(actions[0], Action::Activate { .. }));
//! assert!(matches!(actions[1], Action::Dispatch(_)));
//! ```

use crate::domain::{ClassKey, Query};
use crate::worker::{FetchRequest, FetchResponse};

/// Store-side effects produced by the coordinator.
#[derive(Debug, Clone)]
pub enum Action<T> {
    /// Switches the store to a new equivalence class.
    ///
    /// The manually-paged store clears its list; the cursor cache points at the
    /// class's cache entry. With `invalidate` set, cached pages for the class are
    /// dropped first (used when external dependencies change).
    Activate {
        /// Key of the new class.
        class: ClassKey,
        /// Page-1 query of the new class.
        query: Query,
        /// Drop cached pages for the class before activating it.
        invalidate: bool,
    },

    /// Clears the store back to an empty, idle list.
    ResetStore,

    /// Marks the store as loading and runs the request on a fetch task.
    Dispatch(FetchRequest),

    /// Applies a current (non-stale) completion to the store.
    Commit(FetchResponse<T>),
}
