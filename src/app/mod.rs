//! Fetch coordinator: state, events, and store actions.
//!
//! This module defines the coordination layer sitting between a list binding and
//! its backing store. It is pure: no I/O, no timers, no locking. The binding feeds
//! it events and executes the actions it returns.
//!
//! # Architecture
//!
//! ```text
//! Binding input → Events → handle_event → FetchState mutations → Actions → Store
//!                              ↑                                      ↓
//!                              └──────── FetchCompleted ◄── fetch task
//! ```
//!
//! # Modules
//!
//! - [`actions`]: Store side effects emitted by the event handler
//! - [`handler`]: Event processing and state transitions
//! - [`modes`]: Fetch phase and fetch kind enums
//! - [`state`]: Coordinator state container
//!
//! # Example
//!
//! ```rust
//! use pagesync::app::{handle_event, Event, FetchPhase, FetchState};
//! use pagesync::domain::{Filters, QueryComposer};
//!
//! let query = QueryComposer::new(10).compose(&Filters::new(), "", 1);
//! let mut state = FetchState::new();
//! handle_event::<String>(&mut state, Event::QueryChanged {
//!     class: query.class_key(),
//!     query,
//!     force: false,
//!     cached: None,
//! });
//! assert_eq!(state.phase, FetchPhase::Loading);
//! ```

pub mod actions;
pub mod handler;
pub mod modes;
pub mod state;

pub use actions::Action;
pub use handler::{handle_event, Event};
pub use modes::{FetchKind, FetchPhase};
pub use state::FetchState;
