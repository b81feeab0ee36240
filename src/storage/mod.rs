//! Backing stores for paginated lists.
//!
//! Two interchangeable stores satisfy the [`PagedStore`] contract. A list binding
//! is generic over the store, so a screen can switch variants without any other
//! change.
//!
//! # Modules
//!
//! - `backend`: The [`PagedStore`] trait every store implements
//! - `paged`: One mutable list, replaced or appended to ([`PagedListStore`])
//! - `cursor`: Per-class page arrays in a shared cache ([`QueryCache`],
//!   [`InfiniteQueryStore`])
//! - `models`: The [`StoreSnapshot`] both stores publish

pub mod backend;
pub mod cursor;
pub mod models;
pub mod paged;

pub use backend::PagedStore;
pub use cursor::{InfiniteQueryStore, QueryCache};
pub use models::StoreSnapshot;
pub use paged::PagedListStore;
