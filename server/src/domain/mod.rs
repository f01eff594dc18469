//! Domain logic
//!
//! - `applier` - applies filter sets to a row store and builds result pages
//! - `tables` - queryable tables and the catalog the API serves
//! - `orders` - demo orders table: columns, schema and seed data

pub mod applier;
pub mod orders;
pub mod tables;

pub use applier::{ApplyError, ApplyOptions, PredicateApplier};
pub use tables::{Table, TableCatalog};
