//! # Gridline
//!
//! Typed table filters shared by Gridline clients and servers.
//!
//! A domain module declares a [`ColumnRegistry`]; callers build a
//! [`FilterSet`] through a [`FilterModel`], ship it with [`query::encode`],
//! and the server rebuilds the identical set with [`query::decode`] before
//! applying it to its store. Results come back in a [`PaginatedEnvelope`].
//!
//! ```
//! use std::sync::Arc;
//! use gridline::{ColumnDataType, ColumnDefinition, ColumnRegistry, Cursor, FilterModel, FilterOperator};
//! use gridline::query::{decode, encode};
//!
//! let registry = Arc::new(
//!     ColumnRegistry::from_columns([
//!         ColumnDefinition::new("status", ColumnDataType::Option)
//!             .with_options(["pending", "shipped", "cancelled"]),
//!     ])
//!     .unwrap(),
//! );
//!
//! let mut model = FilterModel::new(registry.clone());
//! model
//!     .set_filter("status", FilterOperator::IsAnyOf, vec!["pending".into(), "shipped".into()])
//!     .unwrap();
//!
//! let params = encode(&model.snapshot(), Cursor::new(0, 20).unwrap());
//! let (filters, cursor) = decode(&registry, &params).unwrap();
//! assert_eq!(filters, model.snapshot());
//! assert_eq!(cursor.page_size(), 20);
//! ```

pub mod client;
pub mod columns;
pub mod envelope;
pub mod model;
pub mod operators;
pub mod query;
pub mod retry;
pub mod value;

pub use client::{ClientError, GridlineClient};
pub use columns::{
    ColumnDataType, ColumnDefinition, ColumnInfo, ColumnRegistry, ColumnRegistryBuilder,
    OperatorInfo, RegistryError,
};
pub use envelope::{ErrorEnvelope, PaginatedEnvelope, PaginationMeta, TableColumns};
pub use model::{FilterDetail, FilterModel, FilterSet, ValidationError};
pub use operators::{Arity, CatalogError, FilterOperator, MAX_FILTER_VALUES, arity_of, operators_for};
pub use query::{Cursor, CursorError, MalformedFilterError, QueryParams};
pub use retry::RetryPolicy;
pub use value::{FilterValue, parse_date};
