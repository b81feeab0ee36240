//! List bindings consumed by rendering.
//!
//! # Modules
//!
//! - [`contract`]: [`ListBindingContract`] and the [`ListSnapshot`] it exposes
//! - [`debounce`]: Trailing-edge [`Debouncer`] for the search text
//! - [`list`]: [`ListBinding`], generic over the backing store, and [`ListOptions`]

pub mod contract;
pub mod debounce;
pub mod list;

pub use contract::{ListBindingContract, ListSnapshot};
pub use debounce::Debouncer;
pub use list::{ListBinding, ListOptions};
