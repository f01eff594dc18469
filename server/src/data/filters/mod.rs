//! Store-level filter conditions
//!
//! Validated filters from the shared model are turned into [`Condition`]s by
//! [`condition_for`]; each row store then renders or evaluates them.
//!
//! ## Usage
//!
//! ```
//! use gridline_server::data::filters::{CasePolicy, Predicate, SqlParams, condition_for};
//! use gridline::{ColumnDataType, ColumnDefinition, FilterDetail, FilterOperator};
//!
//! let column = ColumnDefinition::new("price", ColumnDataType::Number);
//! let detail = FilterDetail::new(&column, FilterOperator::LessThan, vec![10.0.into()]).unwrap();
//! let predicate = Predicate::new(vec![condition_for(&column, &detail, CasePolicy::default()).unwrap()]);
//!
//! let mut params = SqlParams::default();
//! assert_eq!(predicate.to_sql(&mut params), r#""price" < ?"#);
//! ```

mod builder;
mod types;

pub use builder::condition_for;
pub use types::{
    CasePolicy, Comparison, Condition, OrderKey, Predicate, SetMatch, SqlParams, SqlValue,
    TextMatch,
};
