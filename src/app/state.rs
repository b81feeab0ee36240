//! Coordinator state for one list binding.
//!
//! [`FetchState`] is the single source of truth for the fetch lifecycle of the
//! current equivalence class: which class is active, which request is the fetch of
//! record, where pagination stands, and the last error. It holds no items; those
//! belong to the backing store. The event handler is the only writer.

use super::modes::{FetchKind, FetchPhase};
use crate::domain::{ClassKey, Cursor, Query};
use crate::worker::FetchRequest;

/// Fetch lifecycle state of one list binding.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    /// Position in the fetch state machine.
    pub phase: FetchPhase,

    /// Key of the active equivalence class, `None` while idle.
    pub class: Option<ClassKey>,

    /// Page-1 query of the active class.
    pub query: Option<Query>,

    /// Cursor from the most recently applied page of the active class.
    ///
    /// `None` until the first page of the class lands (or a cached cursor is
    /// restored). A failed fetch leaves it untouched.
    pub cursor: Option<Cursor>,

    /// Human-readable message of the last failed fetch of record.
    pub error: Option<String>,

    /// The fetch of record. Completions for any other request are stale.
    pub in_flight: Option<FetchRequest>,

    /// Set once the owning binding is torn down; every later event is ignored.
    pub closed: bool,

    /// Sequence number handed to the next dispatched request.
    next_seq: u64,
}

impl FetchState {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the last applied page reported a later page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.cursor.is_some_and(|c| c.has_more())
    }

    /// Page number of the last applied page, `1` before any page landed.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.cursor.map_or(1, |c| c.page.max(1))
    }

    /// Returns `true` while a fetch of record is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns `true` if `request` is still the fetch of record for the active class.
    ///
    /// Both the sequence number and the class key must match. A request for an old
    /// class, or one superseded by a refresh in the same class, is stale.
    #[must_use]
    pub fn is_current(&self, request: &FetchRequest) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|current| current.seq == request.seq)
            && self.class.as_ref() == Some(&request.class)
    }

    /// Makes a new request the fetch of record and enters the matching phase.
    ///
    /// Any request already in flight is superseded.
    pub(crate) fn begin(&mut self, kind: FetchKind, query: Query) -> Option<FetchRequest> {
        let class = self.class.clone()?;
        self.next_seq += 1;

        let request = FetchRequest::new(self.next_seq, class, kind, query);

        if let Some(previous) = self.in_flight.replace(request.clone()) {
            tracing::debug!(
                superseded_seq = previous.seq,
                superseded_kind = ?previous.kind,
                "in-flight fetch superseded"
            );
        }
        self.phase = FetchPhase::for_kind(kind);
        self.error = None;

        Some(request)
    }

    /// Enters a new equivalence class with no pages.
    pub(crate) fn enter_class(&mut self, class: ClassKey, query: Query) {
        self.class = Some(class);
        self.query = Some(query.with_page(1));
        self.cursor = None;
        self.error = None;
        self.in_flight = None;
        self.phase = FetchPhase::Idle;
    }

    /// Forgets the active class and everything derived from it.
    pub(crate) fn clear(&mut self) {
        self.class = None;
        self.query = None;
        self.cursor = None;
        self.error = None;
        self.in_flight = None;
        self.phase = FetchPhase::Idle;
    }
}
