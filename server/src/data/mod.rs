//! Data storage layer
//!
//! - `filters` - store-level conditions built from validated filters
//! - `store` - the `RowStore` trait every backend implements
//! - `sqlite` - SQLite service and row store (default, embedded)
//! - `memory` - in-memory row store
//! - `error` - store error type with transient/fatal classification

pub mod error;
pub mod filters;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryRowStore;
pub use sqlite::{SqliteRowStore, SqliteService};
pub use store::{Row, RowStore, StoreColumn};
