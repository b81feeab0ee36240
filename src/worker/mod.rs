//! Fetch execution off the binding's call path.
//!
//! Dispatched fetches run on tokio tasks so the binding's control functions never
//! block on the network. Requests carry distributed tracing context so spans on the
//! fetch task link back to the dispatching span.
//!
//! # Architecture
//!
//! - `messages`: Request/response types with trace context propagation
//! - `handler`: [`FetchWorker`], which executes one request against a store

pub mod handler;
pub mod messages;

pub use handler::FetchWorker;
pub use messages::{FetchRequest, FetchResponse, TraceContext};
