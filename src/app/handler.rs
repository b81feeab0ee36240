//! Event handling and fetch state transitions.
//!
//! This module implements the fetch coordinator: a pure function from
//! `(FetchState, Event)` to a state change plus a list of store actions. It decides
//! whether a trigger is an initial load, a refresh or a load-more, coalesces
//! overlapping load-more triggers, and drops completions that are no longer the
//! fetch of record.
//!
//! # Architecture
//!
//! 1. The list binding turns user input and fetch completions into [`Event`]s
//! 2. [`handle_event`] pattern-matches the event and mutates [`FetchState`]
//! 3. Store side effects come back as [`Action`]s, executed in order
//!
//! # Stale Results
//!
//! Every request carries the class key and sequence number it was dispatched with.
//! A completion is applied only if it is still the in-flight request of the active
//! class. Late answers for an old search term, or for a load-more superseded by a
//! refresh, are dropped without touching state.

use super::actions::Action;
use super::modes::{FetchKind, FetchPhase};
use super::state::FetchState;
use crate::domain::{ClassKey, Cursor, Query};
use crate::worker::FetchResponse;

/// Inputs to the fetch coordinator.
#[derive(Debug, Clone)]
pub enum Event<T> {
    /// The composed query (debounced search term + filters) was recomputed.
    ///
    /// A no-op when `class` equals the active class and `force` is unset.
    QueryChanged {
        /// Composed query; its `page` is ignored.
        query: Query,
        /// Class key of `query` under the binding's external dependencies.
        class: ClassKey,
        /// Reset even if the class is unchanged (external dependencies changed).
        force: bool,
        /// Fresh cursor the store can restore for `class` without fetching.
        cached: Option<Cursor>,
    },

    /// Requests the next page. Ignored while busy or when pagination is exhausted.
    LoadMore,

    /// Re-acquires page 1 for the current class, replacing the list on success.
    ///
    /// Carries the binding's current query so a refresh from idle can start it.
    Refresh {
        /// Current composed query.
        query: Query,
        /// Its class key.
        class: ClassKey,
    },

    /// Clears everything back to idle, optionally re-issuing the initial fetch.
    Reset {
        /// Re-issue page 1 for `query` after clearing.
        refetch: bool,
        /// Current composed query.
        query: Query,
        /// Its class key.
        class: ClassKey,
    },

    /// A fetch task finished.
    FetchCompleted(FetchResponse<T>),

    /// The backing store reports where its pages of the active class end.
    ///
    /// Sent by stores whose pages other lists may write too, before a load-more
    /// and after every completion. Ignored while a fetch is in flight.
    CursorSynced(Cursor),

    /// The owning binding is gone; nothing may be applied any more.
    Teardown,
}

/// Processes an event, mutates coordinator state, and returns store actions.
///
/// # Returns
///
/// `(changed, actions)`: `changed` tells the binding whether observers must be
/// notified, `actions` are executed in order. This function never fails; fetch
/// errors are folded into [`FetchState::error`].
///
/// # Tracing
///
/// Each call creates a debug-level span with the event kind and current phase.
///
/// # Example
///
/// ```rust
/// use pagesync::app::{handle_event, Event, FetchState};
///
/// let mut state = FetchState::new();
/// let (changed, actions) = handle_event::<String>(&mut state, Event::LoadMore);
/// assert!(!changed);
/// assert!(actions.is_empty());
/// ```
pub fn handle_event<T>(state: &mut FetchState, event: Event<T>) -> (bool, Vec<Action<T>>) {
    let _span = tracing::debug_span!(
        "handle_event",
        event_type = event_name(&event),
        phase = ?state.phase
    )
    .entered();

    if state.closed {
        tracing::debug!("binding torn down, ignoring event");
        return (false, vec![]);
    }

    match event {
        Event::QueryChanged {
            query,
            class,
            force,
            cached,
        } => {
            if !force && state.class.as_ref() == Some(&class) {
                tracing::trace!("query class unchanged");
                return (false, vec![]);
            }
            enter_class(state, query, class, force, cached)
        }
        Event::LoadMore => {
            if state.class.is_none() {
                tracing::debug!("load-more before any class is active");
                return (false, vec![]);
            }
            if state.is_busy() {
                tracing::debug!(phase = ?state.phase, "load-more coalesced with in-flight fetch");
                return (false, vec![]);
            }
            let Some(next_page) = state.cursor.and_then(|c| c.next_page()) else {
                tracing::debug!("pagination exhausted");
                return (false, vec![]);
            };
            let Some(query) = state.query.as_ref().map(|q| q.with_page(next_page)) else {
                return (false, vec![]);
            };

            tracing::debug!(page = next_page, "loading more");
            dispatch(state, FetchKind::LoadMore, query)
        }
        Event::Refresh { query, class } => {
            if state.class.as_ref() != Some(&class) {
                tracing::debug!("refresh outside the active class, starting it");
                return enter_class(state, query, class, true, None);
            }
            let Some(query) = state.query.as_ref().map(|q| q.with_page(1)) else {
                return (false, vec![]);
            };

            tracing::debug!(had_in_flight = state.is_busy(), "refreshing");
            dispatch(state, FetchKind::Refresh, query)
        }
        Event::Reset {
            refetch,
            query,
            class,
        } => {
            tracing::debug!(refetch = refetch, "resetting list");
            state.clear();

            let mut actions = vec![Action::ResetStore];
            if refetch {
                let (_, more) = enter_class(state, query, class, true, None);
                actions.extend(more);
            }
            (true, actions)
        }
        Event::FetchCompleted(response) => {
            if !state.is_current(&response.request) {
                tracing::debug!(
                    seq = response.request.seq,
                    page = response.request.page(),
                    kind = ?response.request.kind,
                    "dropping stale fetch result"
                );
                return (false, vec![]);
            }

            state.in_flight = None;
            state.phase = FetchPhase::Ready;

            match &response.outcome {
                Ok(list) => {
                    if list.is_out_of_range() {
                        tracing::warn!(
                            page = list.page,
                            total_pages = list.total_pages,
                            "page beyond totalPages, treating as last page"
                        );
                    }
                    state.cursor = Some(list.cursor());
                    state.error = None;
                    tracing::debug!(
                        page = list.page,
                        total_pages = list.total_pages,
                        item_count = list.items.len(),
                        "fetch applied"
                    );
                }
                Err(e) => {
                    let message = e.user_message();
                    tracing::debug!(error = %e, "fetch failed, keeping last-known-good data");
                    state.error = Some(message);
                }
            }

            (true, vec![Action::Commit(response)])
        }
        Event::CursorSynced(cursor) => {
            if state.class.is_none() || state.is_busy() || state.cursor == Some(cursor) {
                return (false, vec![]);
            }
            tracing::debug!(
                local_page = state.cursor.map(|c| c.page),
                store_page = cursor.page,
                "cursor reconciled with store"
            );
            state.cursor = Some(cursor);
            (true, vec![])
        }
        Event::Teardown => {
            tracing::debug!("tearing down coordinator");
            state.closed = true;
            state.in_flight = None;
            (false, vec![])
        }
    }
}

fn enter_class<T>(
    state: &mut FetchState,
    query: Query,
    class: ClassKey,
    force: bool,
    cached: Option<Cursor>,
) -> (bool, Vec<Action<T>>) {
    tracing::debug!(class = %class, force = force, "entering query class");

    let first_page = query.with_page(1);
    state.enter_class(class.clone(), first_page.clone());

    let mut actions = vec![Action::Activate {
        class,
        query: first_page.clone(),
        invalidate: force,
    }];

    match cached {
        Some(cursor) if !force => {
            tracing::debug!(page = cursor.page, "restored cached pages");
            state.cursor = Some(cursor);
            state.phase = FetchPhase::Ready;
        }
        _ => {
            let (_, dispatched) = dispatch(state, FetchKind::Initial, first_page);
            actions.extend(dispatched);
        }
    }

    (true, actions)
}

fn dispatch<T>(state: &mut FetchState, kind: FetchKind, query: Query) -> (bool, Vec<Action<T>>) {
    state
        .begin(kind, query)
        .map_or((false, vec![]), |request| (true, vec![Action::Dispatch(request)]))
}

const fn event_name<T>(event: &Event<T>) -> &'static str {
    match event {
        Event::QueryChanged { .. } => "query_changed",
        Event::LoadMore => "load_more",
        Event::Refresh { .. } => "refresh",
        Event::Reset { .. } => "reset",
        Event::FetchCompleted(_) => "fetch_completed",
        Event::CursorSynced(_) => "cursor_synced",
        Event::Teardown => "teardown",
    }
}
