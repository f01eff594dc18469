//! Condition builder
//!
//! Translates a validated filter detail into a store-level [`Condition`]
//! addressed by the column's accessor.

use chrono::{DateTime, Days, Utc};
use gridline::{
    ColumnDataType, ColumnDefinition, FilterDetail, FilterOperator, FilterValue, ValidationError,
};

use super::types::{CasePolicy, Comparison, Condition, SetMatch, TextMatch};

/// Build the condition for one filter on `column`
///
/// The detail has normally been validated already; a detail that does not
/// fit the column (for example one built against another registry) is
/// rejected with the same error the filter model would have produced.
pub fn condition_for(
    column: &ColumnDefinition,
    detail: &FilterDetail,
    case: CasePolicy,
) -> Result<Condition, ValidationError> {
    let field = column.accessor().to_string();
    let op = detail.operator();
    let values = detail.values();

    let unsupported = || ValidationError::UnsupportedOperator {
        column: column.id().to_string(),
        data_type: column.data_type(),
        operator: op,
    };
    let invalid = |reason: &str| ValidationError::InvalidValue {
        column: column.id().to_string(),
        reason: reason.to_string(),
    };
    let single = || match values {
        [value] if value.fits(column.data_type()) => Ok(value.clone()),
        _ => Err(invalid("expected exactly one value")),
    };
    let pair = || match values {
        [low, high] => Ok((low.clone(), high.clone())),
        _ => Err(invalid("expected exactly two values")),
    };
    let text_list = || -> Result<Vec<String>, ValidationError> {
        let mut out: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            let text = value
                .as_text()
                .ok_or_else(|| invalid("expected text values"))?;
            if !out.iter().any(|v| v == text) {
                out.push(text.to_string());
            }
        }
        if out.is_empty() {
            return Err(invalid("expected at least one value"));
        }
        Ok(out)
    };
    let single_text = || -> Result<String, ValidationError> {
        single()?
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| invalid("expected a text value"))
    };

    let condition = match column.data_type() {
        ColumnDataType::Text => match op {
            FilterOperator::Equals | FilterOperator::Contains | FilterOperator::StartsWith => {
                let text_op = match op {
                    FilterOperator::Equals => TextMatch::Equals,
                    FilterOperator::Contains => TextMatch::Contains,
                    _ => TextMatch::StartsWith,
                };
                Condition::Text {
                    field,
                    op: text_op,
                    value: single_text()?,
                    case,
                }
            }
            FilterOperator::IsEmpty => Condition::Empty {
                field,
                negated: false,
            },
            FilterOperator::IsNotEmpty => Condition::Empty {
                field,
                negated: true,
            },
            _ => return Err(unsupported()),
        },
        ColumnDataType::Number => match op {
            FilterOperator::Equals => compare(field, Comparison::Eq, single()?),
            FilterOperator::GreaterThan => compare(field, Comparison::Gt, single()?),
            FilterOperator::LessThan => compare(field, Comparison::Lt, single()?),
            FilterOperator::Between => {
                let (low, high) = pair()?;
                Condition::Range { field, low, high }
            }
            _ => return Err(unsupported()),
        },
        ColumnDataType::Date => match op {
            FilterOperator::Equals => match single()? {
                FilterValue::Date(dt) => {
                    let (start, end) =
                        utc_day_bounds(dt).ok_or_else(|| invalid("date out of range"))?;
                    Condition::Range {
                        field,
                        low: start.into(),
                        high: end.into(),
                    }
                }
                _ => return Err(invalid("expected a date value")),
            },
            FilterOperator::Before => compare(field, Comparison::Lt, single()?),
            FilterOperator::After => compare(field, Comparison::Gt, single()?),
            FilterOperator::Between => {
                let (low, high) = pair()?;
                Condition::Range { field, low, high }
            }
            _ => return Err(unsupported()),
        },
        ColumnDataType::Boolean => match op {
            FilterOperator::IsTrue => Condition::Flag { field, value: true },
            FilterOperator::IsFalse => Condition::Flag {
                field,
                value: false,
            },
            _ => return Err(unsupported()),
        },
        ColumnDataType::Option => match op {
            FilterOperator::Is => Condition::Membership {
                field,
                values: vec![single_text()?],
                negated: false,
            },
            FilterOperator::IsNot => Condition::Membership {
                field,
                values: vec![single_text()?],
                negated: true,
            },
            FilterOperator::IsAnyOf => Condition::Membership {
                field,
                values: text_list()?,
                negated: false,
            },
            _ => return Err(unsupported()),
        },
        ColumnDataType::MultiOption => {
            let mode = match op {
                FilterOperator::IncludesAny => SetMatch::Any,
                FilterOperator::IncludesAll => SetMatch::All,
                FilterOperator::Excludes => SetMatch::None,
                _ => return Err(unsupported()),
            };
            Condition::Tags {
                field,
                mode,
                values: text_list()?,
            }
        }
    };

    Ok(condition)
}

fn compare(field: String, op: Comparison, value: FilterValue) -> Condition {
    Condition::Compare { field, op, value }
}

/// First and last millisecond of the UTC calendar day containing `dt`
fn utc_day_bounds(dt: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let day = dt.date_naive();
    let start = day.and_hms_opt(0, 0, 0)?.and_utc();
    let next = day.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?.and_utc();
    Some((start, next - chrono::Duration::milliseconds(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gridline::ColumnRegistry;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::from_columns([
            ColumnDefinition::new("customer", ColumnDataType::Text).with_accessor("customer_name"),
            ColumnDefinition::new("status", ColumnDataType::Option),
            ColumnDefinition::new("tags", ColumnDataType::MultiOption),
            ColumnDefinition::new("price", ColumnDataType::Number),
            ColumnDefinition::new("created_at", ColumnDataType::Date),
            ColumnDefinition::new("paid", ColumnDataType::Boolean),
        ])
        .unwrap()
    }

    fn build(column: &str, op: FilterOperator, values: Vec<FilterValue>) -> Condition {
        let registry = registry();
        let column = registry.get(column).unwrap();
        let detail = FilterDetail::new(column, op, values).unwrap();
        condition_for(column, &detail, CasePolicy::Insensitive).unwrap()
    }

    #[test]
    fn text_uses_accessor() {
        let condition = build("customer", FilterOperator::StartsWith, vec!["ac".into()]);
        assert_eq!(
            condition,
            Condition::Text {
                field: "customer_name".into(),
                op: TextMatch::StartsWith,
                value: "ac".into(),
                case: CasePolicy::Insensitive,
            }
        );
    }

    #[test]
    fn date_equals_covers_whole_day() {
        let noon = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let condition = build("created_at", FilterOperator::Equals, vec![noon.into()]);
        let Condition::Range { low, high, .. } = condition else {
            panic!("expected a range, got {:?}", condition);
        };
        assert_eq!(
            low,
            FilterValue::Date(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            high,
            FilterValue::Date(
                Utc.with_ymd_and_hms(2024, 6, 15, 23, 59, 59).unwrap()
                    + chrono::Duration::milliseconds(999)
            )
        );
    }

    #[test]
    fn before_and_after_are_strict() {
        let day = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        assert!(matches!(
            build("created_at", FilterOperator::Before, vec![day.into()]),
            Condition::Compare {
                op: Comparison::Lt,
                ..
            }
        ));
        assert!(matches!(
            build("created_at", FilterOperator::After, vec![day.into()]),
            Condition::Compare {
                op: Comparison::Gt,
                ..
            }
        ));
    }

    #[test]
    fn option_operators() {
        assert_eq!(
            build("status", FilterOperator::IsNot, vec!["cancelled".into()]),
            Condition::Membership {
                field: "status".into(),
                values: vec!["cancelled".into()],
                negated: true,
            }
        );
        assert_eq!(
            build(
                "status",
                FilterOperator::IsAnyOf,
                vec!["pending".into(), "shipped".into(), "pending".into()]
            ),
            Condition::Membership {
                field: "status".into(),
                values: vec!["pending".into(), "shipped".into()],
                negated: false,
            }
        );
    }

    #[test]
    fn multi_option_modes() {
        let cases = [
            (FilterOperator::IncludesAny, SetMatch::Any),
            (FilterOperator::IncludesAll, SetMatch::All),
            (FilterOperator::Excludes, SetMatch::None),
        ];
        for (op, mode) in cases {
            assert_eq!(
                build("tags", op, vec!["gift".into()]),
                Condition::Tags {
                    field: "tags".into(),
                    mode,
                    values: vec!["gift".into()],
                }
            );
        }
    }

    #[test]
    fn boolean_flags() {
        assert_eq!(
            build("paid", FilterOperator::IsFalse, vec![]),
            Condition::Flag {
                field: "paid".into(),
                value: false,
            }
        );
    }

    #[test]
    fn detail_from_another_column_is_rejected() {
        let registry = registry();
        let price = registry.get("price").unwrap();
        let paid = registry.get("paid").unwrap();
        let detail =
            FilterDetail::new(price, FilterOperator::GreaterThan, vec![1.0.into()]).unwrap();

        let err = condition_for(paid, &detail, CasePolicy::Insensitive).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedOperator { .. }));
    }
}
