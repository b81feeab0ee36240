//! Fetch lifecycle state types.
//!
//! [`FetchPhase`] is the coordinator's state machine position for the current
//! equivalence class; [`FetchKind`] tags every outgoing request with the reason it
//! was issued.
//!
//! # State Machine
//!
//! ```text
//! Idle ──► Loading ──► Ready ──► Refreshing ──► Ready
//!                        │
//!                        └────► LoadingMore ──► Ready
//! ```
//!
//! A class change from any state re-enters `Loading` (or `Ready` directly when a
//! fresh cached cursor can be restored).

use serde::{Deserialize, Serialize};

/// Why a fetch was issued.
///
/// Decides how a successful result is applied: `Initial` and `Refresh` replace the
/// list, `LoadMore` appends to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchKind {
    /// First page of a new equivalence class.
    Initial,
    /// Page 1 again for the current class, replacing what is shown.
    Refresh,
    /// Next page for the current class, appended.
    LoadMore,
}

impl FetchKind {
    /// Returns `true` if a successful result is appended rather than replacing.
    #[must_use]
    pub const fn is_load_more(self) -> bool {
        matches!(self, Self::LoadMore)
    }
}

/// Position of the coordinator in the fetch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// No class is active; nothing has been requested.
    #[default]
    Idle,
    /// First page of the current class is in flight.
    Loading,
    /// Page 1 is being re-acquired for the current class.
    Refreshing,
    /// The next page is in flight.
    LoadingMore,
    /// The last fetch of record completed (successfully or not).
    Ready,
}

impl FetchPhase {
    /// Phase entered when a request of the given kind is dispatched.
    #[must_use]
    pub const fn for_kind(kind: FetchKind) -> Self {
        match kind {
            FetchKind::Initial => Self::Loading,
            FetchKind::Refresh => Self::Refreshing,
            FetchKind::LoadMore => Self::LoadingMore,
        }
    }

    /// Returns `true` while a fetch of record is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Loading | Self::Refreshing | Self::LoadingMore)
    }

    /// `loading` flag of the list contract (initial load or load-more).
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }

    /// `refreshing` flag of the list contract.
    #[must_use]
    pub const fn is_refreshing(self) -> bool {
        matches!(self, Self::Refreshing)
    }
}
