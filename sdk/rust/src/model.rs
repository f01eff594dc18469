//! Filter model
//!
//! A [`FilterModel`] owns the active filters of one table view. Every
//! [`FilterDetail`] is validated against its column when it is constructed,
//! so a [`FilterSet`] only ever holds well-formed predicates.
//!
//! ```
//! use std::sync::Arc;
//! use gridline::{ColumnDataType, ColumnDefinition, ColumnRegistry, FilterModel, FilterOperator};
//!
//! let registry = ColumnRegistry::from_columns([
//!     ColumnDefinition::new("price", ColumnDataType::Number),
//! ])
//! .unwrap();
//! let mut model = FilterModel::new(Arc::new(registry));
//!
//! let snapshot = model
//!     .set_filter("price", FilterOperator::Between, vec![10.0.into(), 50.0.into()])
//!     .unwrap();
//! assert_eq!(snapshot.len(), 1);
//!
//! // Operator not legal for a number column: rejected, model untouched
//! assert!(model.set_filter("price", FilterOperator::Contains, vec!["x".into()]).is_err());
//! assert_eq!(model.snapshot(), snapshot);
//! ```

use std::sync::Arc;

use chrono::Datelike;
use indexmap::IndexMap;
use thiserror::Error;

use crate::columns::{ColumnDataType, ColumnDefinition, ColumnRegistry};
use crate::operators::{Arity, FilterOperator, arity_of};
use crate::value::{DATE_YEARS, FilterValue};

/// Rejection reasons for a filter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Operator '{operator}' is not supported for {data_type} column '{column}'")]
    UnsupportedOperator {
        column: String,
        data_type: ColumnDataType,
        operator: FilterOperator,
    },

    #[error("Operator '{operator}' on column '{column}' expects {expected}, got {got}")]
    Arity {
        column: String,
        operator: FilterOperator,
        expected: Arity,
        got: usize,
    },

    #[error("Invalid value for column '{column}': {reason}")]
    InvalidValue { column: String, reason: String },
}

impl ValidationError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::Arity { .. } => "INVALID_FILTER_ARITY",
            Self::InvalidValue { .. } => "INVALID_FILTER_VALUE",
        }
    }
}

/// One active predicate on one column
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDetail {
    column_id: String,
    operator: FilterOperator,
    values: Vec<FilterValue>,
}

impl FilterDetail {
    /// Validate `operator` and `values` against `column`
    pub fn new(
        column: &ColumnDefinition,
        operator: FilterOperator,
        values: Vec<FilterValue>,
    ) -> Result<Self, ValidationError> {
        let data_type = column.data_type();
        let arity =
            arity_of(data_type, operator).map_err(|_| ValidationError::UnsupportedOperator {
                column: column.id().to_string(),
                data_type,
                operator,
            })?;

        if !arity.accepts(values.len()) {
            return Err(ValidationError::Arity {
                column: column.id().to_string(),
                operator,
                expected: arity,
                got: values.len(),
            });
        }

        let invalid = |reason: String| ValidationError::InvalidValue {
            column: column.id().to_string(),
            reason,
        };

        for value in &values {
            if data_type == ColumnDataType::Date
                && let FilterValue::Date(dt) = value
                && !DATE_YEARS.contains(&dt.year())
            {
                return Err(invalid(format!(
                    "date {} is outside the years 0000-9999",
                    value
                )));
            }
            if !value.fits(data_type) {
                return Err(invalid(format!(
                    "expected a {} value, got {} '{}'",
                    data_type,
                    value.kind(),
                    value
                )));
            }
            if data_type.has_options()
                && !column.options().is_empty()
                && let Some(text) = value.as_text()
                && !column.options().iter().any(|o| o == text)
            {
                return Err(invalid(format!("'{}' is not a declared option", text)));
            }
        }

        if let [low, high] = values.as_slice()
            && !bounds_ordered(low, high)
        {
            return Err(invalid(format!(
                "range lower bound {} is greater than upper bound {}",
                low, high
            )));
        }

        Ok(Self {
            column_id: column.id().to_string(),
            operator,
            values,
        })
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn values(&self) -> &[FilterValue] {
        &self.values
    }
}

fn bounds_ordered(low: &FilterValue, high: &FilterValue) -> bool {
    match (low, high) {
        (FilterValue::Number(a), FilterValue::Number(b)) => a <= b,
        (FilterValue::Date(a), FilterValue::Date(b)) => a <= b,
        _ => true,
    }
}

/// Ordered collection of filters, at most one per column
///
/// Order is the position of the most recent write for each column. It only
/// affects rendering; filters are always combined with AND.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: IndexMap<String, FilterDetail>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the filter for the detail's column, moving it last
    pub fn insert(&mut self, detail: FilterDetail) -> Option<FilterDetail> {
        let previous = self.filters.shift_remove(detail.column_id());
        self.filters.insert(detail.column_id.clone(), detail);
        previous
    }

    /// Remove the filter for `column_id`; no-op when absent
    pub fn remove(&mut self, column_id: &str) -> Option<FilterDetail> {
        self.filters.shift_remove(column_id)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn get(&self, column_id: &str) -> Option<&FilterDetail> {
        self.filters.get(column_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterDetail> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

// Equality is order-sensitive, unlike IndexMap's
impl PartialEq for FilterSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a FilterDetail;
    type IntoIter = indexmap::map::Values<'a, String, FilterDetail>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.values()
    }
}

/// Mutable filter state of a single table view
#[derive(Debug, Clone)]
pub struct FilterModel {
    registry: Arc<ColumnRegistry>,
    filters: FilterSet,
}

impl FilterModel {
    pub fn new(registry: Arc<ColumnRegistry>) -> Self {
        Self {
            registry,
            filters: FilterSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ColumnRegistry> {
        &self.registry
    }

    /// Validate and insert (or replace) the filter for `column_id`
    ///
    /// On failure the model is left unchanged.
    pub fn set_filter(
        &mut self,
        column_id: &str,
        operator: FilterOperator,
        values: Vec<FilterValue>,
    ) -> Result<FilterSet, ValidationError> {
        let column = self
            .registry
            .get(column_id)
            .map_err(|_| ValidationError::UnknownColumn(column_id.to_string()))?;
        let detail = FilterDetail::new(column, operator, values)?;
        self.filters.insert(detail);
        Ok(self.snapshot())
    }

    /// Returns true if a filter was removed
    pub fn remove_filter(&mut self, column_id: &str) -> bool {
        self.filters.remove(column_id).is_some()
    }

    pub fn clear_all(&mut self) {
        self.filters.clear();
    }

    pub fn filter(&self, column_id: &str) -> Option<&FilterDetail> {
        self.filters.get(column_id)
    }

    /// Immutable copy of the current filters
    pub fn snapshot(&self) -> FilterSet {
        self.filters.clone()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnDefinition;
    use chrono::{TimeZone, Utc};

    fn model() -> FilterModel {
        let registry = ColumnRegistry::from_columns([
            ColumnDefinition::new("customer", ColumnDataType::Text),
            ColumnDefinition::new("status", ColumnDataType::Option)
                .with_options(["pending", "shipped", "cancelled"]),
            ColumnDefinition::new("tags", ColumnDataType::MultiOption),
            ColumnDefinition::new("price", ColumnDataType::Number),
            ColumnDefinition::new("created_at", ColumnDataType::Date),
            ColumnDefinition::new("paid", ColumnDataType::Boolean),
        ])
        .unwrap();
        FilterModel::new(Arc::new(registry))
    }

    #[test]
    fn set_filter_then_snapshot_has_one_entry() {
        let mut model = model();
        let snapshot = model
            .set_filter(
                "status",
                FilterOperator::IsAnyOf,
                vec!["pending".into(), "shipped".into()],
            )
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        let detail = snapshot.get("status").unwrap();
        assert_eq!(detail.operator(), FilterOperator::IsAnyOf);
        assert_eq!(
            detail.values(),
            &[
                FilterValue::Text("pending".into()),
                FilterValue::Text("shipped".into())
            ]
        );
        assert_eq!(model.snapshot(), snapshot);
    }

    #[test]
    fn valid_triples_for_every_type() {
        let mut model = model();
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let cases: Vec<(&str, FilterOperator, Vec<FilterValue>)> = vec![
            ("customer", FilterOperator::Contains, vec!["acme".into()]),
            ("customer", FilterOperator::IsEmpty, vec![]),
            ("price", FilterOperator::GreaterThan, vec![5.0.into()]),
            ("price", FilterOperator::Between, vec![5.0.into(), 5.0.into()]),
            ("created_at", FilterOperator::Before, vec![day.into()]),
            ("paid", FilterOperator::IsTrue, vec![]),
            ("status", FilterOperator::IsNot, vec!["cancelled".into()]),
            ("tags", FilterOperator::IncludesAll, vec!["gift".into()]),
        ];

        for (column, op, values) in cases {
            let snapshot = model.set_filter(column, op, values.clone()).unwrap();
            let detail = snapshot.get(column).unwrap();
            assert_eq!(detail.operator(), op);
            assert_eq!(detail.values(), values.as_slice());
            assert_eq!(
                snapshot.iter().filter(|d| d.column_id() == column).count(),
                1
            );
        }
    }

    #[test]
    fn operator_outside_type_is_rejected() {
        let mut model = model();
        let err = model
            .set_filter("price", FilterOperator::Contains, vec!["x".into()])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedOperator {
                column: "price".into(),
                data_type: ColumnDataType::Number,
                operator: FilterOperator::Contains,
            }
        );
        assert!(model.is_empty());
    }

    #[test]
    fn invalid_triples_leave_model_unchanged() {
        let mut model = model();
        let before = model
            .set_filter("price", FilterOperator::LessThan, vec![100.0.into()])
            .unwrap();

        let invalid: Vec<(&str, FilterOperator, Vec<FilterValue>)> = vec![
            ("missing", FilterOperator::Equals, vec!["x".into()]),
            ("price", FilterOperator::Between, vec![1.0.into()]),
            ("price", FilterOperator::Between, vec![9.0.into(), 1.0.into()]),
            ("price", FilterOperator::Equals, vec!["ten".into()]),
            ("paid", FilterOperator::IsTrue, vec!["yes".into()]),
            ("status", FilterOperator::IsAnyOf, vec![]),
            ("status", FilterOperator::Is, vec!["lost".into()]),
            ("customer", FilterOperator::IsAnyOf, vec!["a".into()]),
        ];

        for (column, op, values) in invalid {
            assert!(model.set_filter(column, op, values).is_err());
            assert_eq!(model.snapshot(), before);
        }
    }

    #[test]
    fn arity_error_reports_counts() {
        let mut model = model();
        let err = model
            .set_filter("paid", FilterOperator::IsFalse, vec!["no".into()])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Arity {
                column: "paid".into(),
                operator: FilterOperator::IsFalse,
                expected: Arity::None,
                got: 1,
            }
        );
        assert_eq!(err.code(), "INVALID_FILTER_ARITY");
    }

    #[test]
    fn replacing_moves_filter_to_end() {
        let mut model = model();
        model
            .set_filter("customer", FilterOperator::Equals, vec!["a".into()])
            .unwrap();
        model
            .set_filter("price", FilterOperator::GreaterThan, vec![1.0.into()])
            .unwrap();
        let snapshot = model
            .set_filter("customer", FilterOperator::StartsWith, vec!["b".into()])
            .unwrap();

        let order: Vec<&str> = snapshot.iter().map(|d| d.column_id()).collect();
        assert_eq!(order, vec!["price", "customer"]);
        assert_eq!(
            snapshot.get("customer").unwrap().operator(),
            FilterOperator::StartsWith
        );
    }

    #[test]
    fn remove_and_clear_are_idempotent() {
        let mut model = model();
        model
            .set_filter("paid", FilterOperator::IsTrue, vec![])
            .unwrap();

        assert!(model.remove_filter("paid"));
        assert!(!model.remove_filter("paid"));
        assert!(!model.remove_filter("never-set"));

        model
            .set_filter("paid", FilterOperator::IsFalse, vec![])
            .unwrap();
        model.clear_all();
        model.clear_all();
        assert!(model.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_model() {
        let mut model = model();
        let snapshot = model
            .set_filter("paid", FilterOperator::IsTrue, vec![])
            .unwrap();
        model.clear_all();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn filter_set_equality_is_order_sensitive() {
        let registry = model().registry().clone();
        let paid = FilterDetail::new(
            registry.get("paid").unwrap(),
            FilterOperator::IsTrue,
            vec![],
        )
        .unwrap();
        let price = FilterDetail::new(
            registry.get("price").unwrap(),
            FilterOperator::LessThan,
            vec![3.0.into()],
        )
        .unwrap();

        let mut a = FilterSet::new();
        a.insert(paid.clone());
        a.insert(price.clone());
        let mut b = FilterSet::new();
        b.insert(price);
        b.insert(paid);
        assert_ne!(a, b);
    }
}
