//! SQLite row store
//!
//! Storage layout expected per column type:
//! - text / option: TEXT
//! - number: REAL
//! - date: INTEGER epoch milliseconds (UTC)
//! - boolean: INTEGER 0/1
//! - multiOption: TEXT holding a JSON array of strings

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gridline::ColumnDataType;
use serde_json::Value;
use sqlx::Row as _;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};

use super::SqlitePool;
use crate::data::error::StoreError;
use crate::data::filters::{OrderKey, Predicate, SqlParams, SqlValue};
use crate::data::store::{Row, RowStore, StoreColumn};
use crate::utils::sql::quote_ident;

const BACKEND: &str = "sqlite";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Row store over one SQLite table
pub struct SqliteRowStore {
    pool: SqlitePool,
    table: String,
    columns: Vec<StoreColumn>,
    select_list: String,
}

impl SqliteRowStore {
    pub fn new(pool: SqlitePool, table: impl Into<String>, columns: Vec<StoreColumn>) -> Self {
        let select_list = columns
            .iter()
            .map(|c| {
                let expr = match c.data_type {
                    ColumnDataType::Number => format!("CAST({} AS REAL)", quote_ident(&c.accessor)),
                    _ => quote_ident(&c.accessor),
                };
                format!("{} AS {}", expr, quote_ident(&c.id))
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            pool,
            table: table.into(),
            columns,
            select_list,
        }
    }

    fn decode_row(&self, row: &SqliteRow) -> Result<Row, StoreError> {
        let mut out = Row::new();
        for column in &self.columns {
            let id = column.id.as_str();
            let value = match column.data_type {
                ColumnDataType::Text | ColumnDataType::Option => row
                    .try_get::<Option<String>, _>(id)?
                    .map_or(Value::Null, Value::String),
                ColumnDataType::Number => row
                    .try_get::<Option<f64>, _>(id)?
                    .map_or(Value::Null, Value::from),
                ColumnDataType::Boolean => row
                    .try_get::<Option<bool>, _>(id)?
                    .map_or(Value::Null, Value::Bool),
                ColumnDataType::Date => match row.try_get::<Option<i64>, _>(id)? {
                    None => Value::Null,
                    Some(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                        .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)))
                        .ok_or_else(|| {
                            StoreError::invalid_row(BACKEND, format!("{}: bad timestamp", id))
                        })?,
                },
                ColumnDataType::MultiOption => match row.try_get::<Option<String>, _>(id)? {
                    None => Value::Array(Vec::new()),
                    Some(raw) => serde_json::from_str::<Vec<String>>(&raw)
                        .map(|tags| tags.into_iter().map(Value::String).collect())
                        .map_err(|e| StoreError::invalid_row(BACKEND, format!("{}: {}", id, e)))?,
                },
            };
            out.insert(column.id.clone(), value);
        }
        Ok(out)
    }
}

fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q SqlParams) -> SqliteQuery<'q> {
    for value in &params.values {
        query = match value {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Real(n) => query.bind(*n),
            SqlValue::Integer(i) => query.bind(*i),
        };
    }
    query
}

#[async_trait]
impl RowStore for SqliteRowStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut params = SqlParams::default();
        let where_sql = predicate.to_sql(&mut params);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote_ident(&self.table),
            where_sql
        );

        let row = bind_params(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        predicate: &Predicate,
        order: &OrderKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Row>, StoreError> {
        let mut params = SqlParams::default();
        let where_sql = predicate.to_sql(&mut params);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            self.select_list,
            quote_ident(&self.table),
            where_sql,
            order.to_sql()
        );

        let offset = i64::try_from(offset)
            .map_err(|_| StoreError::malformed(BACKEND, "offset out of range"))?;
        let rows = bind_params(sqlx::query(&sql), &params)
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| self.decode_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::{CasePolicy, Comparison, Condition, SetMatch, TextMatch};
    use crate::data::sqlite::SqliteService;

    const SCHEMA: &str = r#"
        CREATE TABLE items (
            id TEXT PRIMARY KEY,
            name TEXT,
            kind TEXT,
            labels TEXT,
            amount REAL,
            created INTEGER NOT NULL,
            active INTEGER NOT NULL
        );
        INSERT INTO items VALUES ('a', 'Alpha', 'x', '["red","blue"]', 10, 1000, 1);
        INSERT INTO items VALUES ('b', 'beta', 'y', '["red"]', 20.5, 2000, 0);
        INSERT INTO items VALUES ('c', NULL, NULL, NULL, NULL, 2000, 1);
        INSERT INTO items VALUES ('d', 'Alphabet', 'x', '[]', 30, 3000, 1);
    "#;

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

    async fn setup_store() -> SqliteRowStore {
        let db = SqliteService::in_memory().await.unwrap();
        sqlx::raw_sql(SCHEMA).execute(db.pool()).await.unwrap();
        SqliteRowStore::new(db.pool().clone(), "items", columns())
    }

    fn order() -> OrderKey {
        OrderKey::new("created", "id")
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_count_all() {
        let store = setup_store().await;
        assert_eq!(store.count(&Predicate::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_find_orders_by_created_then_id_desc() {
        let store = setup_store().await;
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
    async fn test_rows_are_decoded_by_type() {
        let store = setup_store().await;
        let rows = store
            .find(&Predicate::default(), &order(), 3, 1)
            .await
            .unwrap();
        let row = &rows[0];

        assert_eq!(row["id"], "a");
        assert_eq!(row["amount"], 10.0);
        assert_eq!(row["active"], true);
        assert_eq!(row["created_at"], "1970-01-01T00:00:01.000Z");
        assert_eq!(row["labels"], serde_json::json!(["red", "blue"]));
        assert!(row.get("created").is_none());
    }

    #[tokio::test]
    async fn test_null_columns() {
        let store = setup_store().await;
        let rows = store
            .find(&Predicate::default(), &order(), 1, 1)
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], Value::Null);
        assert_eq!(rows[0]["amount"], Value::Null);
        assert_eq!(rows[0]["labels"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_text_case_policies() {
        let store = setup_store().await;
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
    async fn test_conditions_combine() {
        let store = setup_store().await;
        let predicate = Predicate::new(vec![
            Condition::Flag {
                field: "active".into(),
                value: true,
            },
            Condition::Compare {
                field: "amount".into(),
                op: Comparison::Gt,
                value: 15.0.into(),
            },
        ]);
        let rows = store.find(&predicate, &order(), 0, 10).await.unwrap();
        assert_eq!(ids(&rows), vec!["d"]);
    }

    #[tokio::test]
    async fn test_tags_modes() {
        let store = setup_store().await;
        let tags = |mode, values: &[&str]| {
            Predicate::new(vec![Condition::Tags {
                field: "labels".into(),
                mode,
                values: values.iter().map(|v| v.to_string()).collect(),
            }])
        };

        assert_eq!(store.count(&tags(SetMatch::Any, &["blue", "red"])).await.unwrap(), 2);
        assert_eq!(store.count(&tags(SetMatch::All, &["blue", "red"])).await.unwrap(), 1);
        // NULL and empty arrays contain nothing, so both are kept
        assert_eq!(store.count(&tags(SetMatch::None, &["red"])).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_negated_membership_keeps_nulls() {
        let store = setup_store().await;
        let predicate = Predicate::new(vec![Condition::Membership {
            field: "kind".into(),
            values: vec!["x".into()],
            negated: true,
        }]);
        let rows = store.find(&predicate, &order(), 0, 10).await.unwrap();
        assert_eq!(ids(&rows), vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_missing_table_is_fatal() {
        let store = setup_store().await;
        let missing = SqliteRowStore::new(store.pool.clone(), "no_such_table", columns());
        let err = missing.count(&Predicate::default()).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_closed_pool_is_transient() {
        let store = setup_store().await;
        store.pool.close().await;
        let err = store.count(&Predicate::default()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
