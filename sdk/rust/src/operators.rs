//! Operator catalog
//!
//! Static mapping from column data type to its legal operators and the value
//! arity each operator expects.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::columns::ColumnDataType;

/// Maximum number of values a list-arity filter may carry
pub const MAX_FILTER_VALUES: usize = 100;

/// Comparison operators across all column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    Contains,
    StartsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    LessThan,
    Between,
    Before,
    After,
    IsTrue,
    IsFalse,
    Is,
    IsNot,
    IsAnyOf,
    IncludesAny,
    IncludesAll,
    Excludes,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 18] = [
        Self::Equals,
        Self::Contains,
        Self::StartsWith,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::GreaterThan,
        Self::LessThan,
        Self::Between,
        Self::Before,
        Self::After,
        Self::IsTrue,
        Self::IsFalse,
        Self::Is,
        Self::IsNot,
        Self::IsAnyOf,
        Self::IncludesAny,
        Self::IncludesAll,
        Self::Excludes,
    ];

    /// Wire name, identical to the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
            Self::IsEmpty => "isEmpty",
            Self::IsNotEmpty => "isNotEmpty",
            Self::GreaterThan => "greaterThan",
            Self::LessThan => "lessThan",
            Self::Between => "between",
            Self::Before => "before",
            Self::After => "after",
            Self::IsTrue => "isTrue",
            Self::IsFalse => "isFalse",
            Self::Is => "is",
            Self::IsNot => "isNot",
            Self::IsAnyOf => "isAnyOf",
            Self::IncludesAny => "includesAny",
            Self::IncludesAll => "includesAll",
            Self::Excludes => "excludes",
        }
    }

    /// Parse a wire name (case-sensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of values an operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    None,
    Single,
    Pair,
    List,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::None => count == 0,
            Self::Single => count == 1,
            Self::Pair => count == 2,
            Self::List => (1..=MAX_FILTER_VALUES).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("no values"),
            Self::Single => f.write_str("exactly 1 value"),
            Self::Pair => f.write_str("exactly 2 values"),
            Self::List => write!(f, "1 to {} values", MAX_FILTER_VALUES),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Operator '{operator}' is not supported for {data_type} columns")]
    UnsupportedOperator {
        data_type: ColumnDataType,
        operator: FilterOperator,
    },
}

/// Legal operators for a data type, in display order. Never empty.
pub fn operators_for(data_type: ColumnDataType) -> &'static [FilterOperator] {
    use FilterOperator::*;

    match data_type {
        ColumnDataType::Text => &[Equals, Contains, StartsWith, IsEmpty, IsNotEmpty],
        ColumnDataType::Number => &[Equals, GreaterThan, LessThan, Between],
        ColumnDataType::Date => &[Equals, Before, After, Between],
        ColumnDataType::Boolean => &[IsTrue, IsFalse],
        ColumnDataType::Option => &[Is, IsNot, IsAnyOf],
        ColumnDataType::MultiOption => &[IncludesAny, IncludesAll, Excludes],
    }
}

/// Arity of an operator within a data type
pub fn arity_of(
    data_type: ColumnDataType,
    operator: FilterOperator,
) -> Result<Arity, CatalogError> {
    if !operators_for(data_type).contains(&operator) {
        return Err(CatalogError::UnsupportedOperator {
            data_type,
            operator,
        });
    }

    Ok(match operator {
        FilterOperator::IsEmpty
        | FilterOperator::IsNotEmpty
        | FilterOperator::IsTrue
        | FilterOperator::IsFalse => Arity::None,
        FilterOperator::Between => Arity::Pair,
        FilterOperator::IsAnyOf
        | FilterOperator::IncludesAny
        | FilterOperator::IncludesAll
        | FilterOperator::Excludes => Arity::List,
        FilterOperator::Equals
        | FilterOperator::Contains
        | FilterOperator::StartsWith
        | FilterOperator::GreaterThan
        | FilterOperator::LessThan
        | FilterOperator::Before
        | FilterOperator::After
        | FilterOperator::Is
        | FilterOperator::IsNot => Arity::Single,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_operators() {
        for data_type in ColumnDataType::ALL {
            let ops = operators_for(data_type);
            assert!(!ops.is_empty(), "{} has no operators", data_type);
            for op in ops {
                assert!(arity_of(data_type, *op).is_ok());
            }
        }
    }

    #[test]
    fn every_operator_belongs_to_some_type() {
        for op in FilterOperator::ALL {
            assert!(
                ColumnDataType::ALL
                    .iter()
                    .any(|dt| operators_for(*dt).contains(&op)),
                "{} is orphaned",
                op
            );
        }
    }

    #[test]
    fn arity_table() {
        use ColumnDataType as T;
        use FilterOperator as Op;

        let cases = [
            (T::Text, Op::Equals, Arity::Single),
            (T::Text, Op::IsEmpty, Arity::None),
            (T::Number, Op::Between, Arity::Pair),
            (T::Date, Op::Before, Arity::Single),
            (T::Boolean, Op::IsFalse, Arity::None),
            (T::Option, Op::IsAnyOf, Arity::List),
            (T::MultiOption, Op::Excludes, Arity::List),
        ];
        for (data_type, op, expected) in cases {
            assert_eq!(arity_of(data_type, op), Ok(expected));
        }
    }

    #[test]
    fn unsupported_operator_is_rejected() {
        let err = arity_of(ColumnDataType::Number, FilterOperator::Contains).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnsupportedOperator {
                data_type: ColumnDataType::Number,
                operator: FilterOperator::Contains,
            }
        );
        assert_eq!(
            err.to_string(),
            "Operator 'contains' is not supported for number columns"
        );
    }

    #[test]
    fn wire_names_match_serde() {
        for op in FilterOperator::ALL {
            let json = serde_json::to_string(&op).unwrap();
            assert_eq!(json, format!("\"{}\"", op.as_str()));
            assert_eq!(FilterOperator::parse(op.as_str()), Some(op));
        }
        assert_eq!(FilterOperator::parse("STARTSWITH"), None);
    }

    #[test]
    fn arity_accepts_counts() {
        assert!(Arity::None.accepts(0));
        assert!(!Arity::Single.accepts(2));
        assert!(Arity::Pair.accepts(2));
        assert!(!Arity::List.accepts(0));
        assert!(Arity::List.accepts(MAX_FILTER_VALUES));
        assert!(!Arity::List.accepts(MAX_FILTER_VALUES + 1));
    }
}
