//! In-memory row store
//!
//! Rows are held keyed by accessor in the same shape the SQLite table uses:
//! dates as epoch milliseconds (RFC 3339 strings are accepted too), tags as
//! JSON arrays of strings. Conditions are evaluated directly against them.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gridline::{ColumnDataType, FilterValue, parse_date};
use parking_lot::RwLock;
use serde_json::Value;

use super::error::StoreError;
use super::filters::{CasePolicy, Comparison, Condition, OrderKey, Predicate, SetMatch, TextMatch};
use super::store::{Row, RowStore, StoreColumn};

pub struct MemoryRowStore {
    columns: Vec<StoreColumn>,
    rows: RwLock<Vec<Row>>,
}

impl MemoryRowStore {
    pub fn new(columns: Vec<StoreColumn>) -> Self {
        Self {
            columns,
            rows: RwLock::new(Vec::new()),
        }
    }

    pub fn insert(&self, row: Row) {
        self.rows.write().push(row);
    }

    pub fn extend(&self, rows: impl IntoIterator<Item = Row>) {
        self.rows.write().extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Re-key a stored row by column id and convert it to the response shape
    fn project(&self, row: &Row) -> Row {
        let mut out = Row::new();
        for column in &self.columns {
            let raw = row.get(&column.accessor).unwrap_or(&Value::Null);
            let value = match column.data_type {
                ColumnDataType::Date => date_millis(raw)
                    .and_then(DateTime::<Utc>::from_timestamp_millis)
                    .map_or(Value::Null, |dt| {
                        Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
                    }),
                ColumnDataType::MultiOption if raw.is_null() => Value::Array(Vec::new()),
                _ => raw.clone(),
            };
            out.insert(column.id.clone(), value);
        }
        out
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let rows = self.rows.read();
        Ok(rows.iter().filter(|row| matches_all(row, predicate)).count() as u64)
    }

    async fn find(
        &self,
        predicate: &Predicate,
        order: &OrderKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Row>, StoreError> {
        let rows = self.rows.read();
        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| matches_all(row, predicate))
            .collect();
        matched.sort_by(|a, b| compare_rows(b, a, order));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|row| self.project(row))
            .collect())
    }
}

/// Ascending comparison by (created, id); nulls sort first
fn compare_rows(a: &Row, b: &Row, order: &OrderKey) -> Ordering {
    let created = |row: &Row| row.get(&order.created_field).and_then(date_millis);
    let id = |row: &Row| {
        row.get(&order.id_field)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    created(a)
        .cmp(&created(b))
        .then_with(|| id(a).cmp(&id(b)))
}

fn matches_all(row: &Row, predicate: &Predicate) -> bool {
    predicate.conditions.iter().all(|c| matches(row, c))
}

fn matches(row: &Row, condition: &Condition) -> bool {
    let field = row.get(condition.field()).unwrap_or(&Value::Null);

    match condition {
        Condition::Text {
            op, value, case, ..
        } => {
            let Some(text) = field.as_str() else {
                return false;
            };
            let (text, value) = match case {
                // ASCII-only folding, matching SQLite's LOWER() and LIKE
                CasePolicy::Insensitive => (text.to_ascii_lowercase(), value.to_ascii_lowercase()),
                CasePolicy::Sensitive => (text.to_string(), value.clone()),
            };
            match op {
                TextMatch::Equals => text == value,
                TextMatch::Contains => text.contains(&value),
                TextMatch::StartsWith => text.starts_with(&value),
            }
        }
        Condition::Empty { negated, .. } => {
            let empty = match field {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            empty != *negated
        }
        Condition::Compare { op, value, .. } => {
            let Some(ord) = compare_field(field, value) else {
                return false;
            };
            match op {
                Comparison::Eq => ord == Ordering::Equal,
                Comparison::Gt => ord == Ordering::Greater,
                Comparison::Lt => ord == Ordering::Less,
            }
        }
        Condition::Range { low, high, .. } => {
            compare_field(field, low).is_some_and(|o| o != Ordering::Less)
                && compare_field(field, high).is_some_and(|o| o != Ordering::Greater)
        }
        Condition::Flag { value, .. } => field.as_bool() == Some(*value),
        Condition::Membership {
            values, negated, ..
        } => match field.as_str() {
            Some(s) => values.iter().any(|v| v == s) != *negated,
            None => *negated,
        },
        Condition::Tags { mode, values, .. } => {
            let tags: Vec<&str> = field
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let has = |v: &String| tags.contains(&v.as_str());
            match mode {
                SetMatch::Any => values.iter().any(has),
                SetMatch::All => values.iter().all(has),
                SetMatch::None => !values.iter().any(has),
            }
        }
    }
}

fn compare_field(field: &Value, target: &FilterValue) -> Option<Ordering> {
    match target {
        FilterValue::Number(n) => field.as_f64()?.partial_cmp(n),
        FilterValue::Date(dt) => Some(date_millis(field)?.cmp(&dt.timestamp_millis())),
        FilterValue::Text(s) => Some(field.as_str()?.cmp(s.as_str())),
    }
}

fn date_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_date(s).map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<StoreColumn> {
        [
            ("id", "id", ColumnDataType::Text),
            ("name", "name", ColumnDataType::Text),
            ("kind", "kind", ColumnDataType::Option),
            ("labels", "labels", ColumnDataType::MultiOption),
            ("amount", "amount", ColumnDataType::Number),
            ("created_at", "created", ColumnDataType::Date),
            ("active", "active", ColumnDataType::Boolean),
        ]
        .into_iter()
        .map(|(id, accessor, data_type)| StoreColumn {
            id: id.into(),
            accessor: accessor.into(),
            data_type,
        })
        .collect()
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn setup_store() -> MemoryRowStore {
        let store = MemoryRowStore::new(columns());
        store.extend([
            row(json!({"id": "a", "name": "Alpha", "kind": "x", "labels": ["red", "blue"],
                       "amount": 10.0, "created": 1000, "active": true})),
            row(json!({"id": "b", "name": "beta", "kind": "y", "labels": ["red"],
                       "amount": 20.5, "created": 2000, "active": false})),
            row(json!({"id": "c", "name": null, "kind": null, "labels": null,
                       "amount": null, "created": "1970-01-01T00:00:02Z", "active": true})),
            row(json!({"id": "d", "name": "Alphabet", "kind": "x", "labels": [],
                       "amount": 30.0, "created": 3000, "active": true})),
        ]);
        store
    }

    fn order() -> OrderKey {
        OrderKey::new("created", "id")
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_find_orders_by_created_then_id_desc() {
        let store = setup_store();
        let rows = store
            .find(&Predicate::default(), &order(), 0, 10)
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec!["d", "c", "b", "a"]);

        let page = store
            .find(&Predicate::default(), &order(), 1, 2)
            .await
            .unwrap();
        assert_eq!(ids(&page), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_projection_uses_column_ids() {
        let store = setup_store();
        let rows = store
            .find(&Predicate::default(), &order(), 1, 1)
            .await
            .unwrap();
        assert_eq!(rows[0]["created_at"], "1970-01-01T00:00:02.000Z");
        assert_eq!(rows[0]["labels"], json!([]));
        assert!(rows[0].get("created").is_none());
    }

    #[tokio::test]
    async fn test_text_case_policies() {
        let store = setup_store();
        let starts = |case| {
            Predicate::new(vec![Condition::Text {
                field: "name".into(),
                op: TextMatch::StartsWith,
                value: "alpha".into(),
                case,
            }])
        };
        assert_eq!(store.count(&starts(CasePolicy::Insensitive)).await.unwrap(), 2);
        assert_eq!(store.count(&starts(CasePolicy::Sensitive)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insensitive_folds_ascii_only() {
        let store = MemoryRowStore::new(columns());
        store.insert(row(json!({"id": "e", "name": "ÉCOLE Zürich", "created": 1})));
        let contains = |value: &str| {
            Predicate::new(vec![Condition::Text {
                field: "name".into(),
                op: TextMatch::Contains,
                value: value.into(),
                case: CasePolicy::Insensitive,
            }])
        };
        assert_eq!(store.count(&contains("zürich")).await.unwrap(), 1);
        assert_eq!(store.count(&contains("école")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_checks() {
        let store = setup_store();
        let empty = |negated| {
            Predicate::new(vec![Condition::Empty {
                field: "name".into(),
                negated,
            }])
        };
        assert_eq!(store.count(&empty(false)).await.unwrap(), 1);
        assert_eq!(store.count(&empty(true)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let store = setup_store();
        let predicate = Predicate::new(vec![Condition::Range {
            field: "amount".into(),
            low: 10.0.into(),
            high: 20.5.into(),
        }]);
        let rows = store.find(&predicate, &order(), 0, 10).await.unwrap();
        assert_eq!(ids(&rows), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_date_comparison_mixes_storage_forms() {
        let store = setup_store();
        let after = DateTime::<Utc>::from_timestamp_millis(1500).unwrap();
        let predicate = Predicate::new(vec![Condition::Compare {
            field: "created".into(),
            op: Comparison::Gt,
            value: after.into(),
        }]);
        assert_eq!(store.count(&predicate).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_tags_and_membership() {
        let store = setup_store();
        let tags = |mode, values: &[&str]| {
            Predicate::new(vec![Condition::Tags {
                field: "labels".into(),
                mode,
                values: values.iter().map(|v| v.to_string()).collect(),
            }])
        };
        assert_eq!(store.count(&tags(SetMatch::Any, &["blue", "red"])).await.unwrap(), 2);
        assert_eq!(store.count(&tags(SetMatch::All, &["blue", "red"])).await.unwrap(), 1);
        assert_eq!(store.count(&tags(SetMatch::None, &["red"])).await.unwrap(), 2);

        let not_x = Predicate::new(vec![Condition::Membership {
            field: "kind".into(),
            values: vec!["x".into()],
            negated: true,
        }]);
        let rows = store.find(&not_x, &order(), 0, 10).await.unwrap();
        assert_eq!(ids(&rows), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_flag_and_count_agree_with_find() {
        let store = setup_store();
        let predicate = Predicate::new(vec![Condition::Flag {
            field: "active".into(),
            value: true,
        }]);
        let total = store.count(&predicate).await.unwrap();
        let rows = store.find(&predicate, &order(), 0, 100).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(rows.len() as u64, total);
    }
}
