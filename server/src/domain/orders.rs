//! Demo `orders` table
//!
//! Declares the column registry for orders and seeds deterministic sample
//! rows into either backend.

use gridline::{ColumnDataType, ColumnDefinition, ColumnRegistry, RegistryError};
use serde_json::json;

use crate::data::error::StoreError;
use crate::data::filters::OrderKey;
use crate::data::memory::MemoryRowStore;
use crate::data::sqlite::SqlitePool;
use crate::data::store::Row;

pub const TABLE_NAME: &str = "orders";

pub const STATUSES: [&str; 3] = ["pending", "shipped", "cancelled"];
pub const TAGS: [&str; 4] = ["gift", "express", "fragile", "wholesale"];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    customer_name TEXT,
    status TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    price REAL,
    created_at INTEGER NOT NULL,
    paid INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
"#;

const CUSTOMERS: [&str; 10] = [
    "Acme Corp",
    "Globex",
    "Initech",
    "Umbrella",
    "Hooli",
    "Stark Industries",
    "Wayne Enterprises",
    "acme labs",
    "ÉCOLE Zürich",
    "école 100% bio_shop",
];

/// 2024-06-01T00:00:00Z
const SEED_EPOCH_MS: i64 = 1_717_200_000_000;
const HOUR_MS: i64 = 3_600_000;

pub fn registry() -> Result<ColumnRegistry, RegistryError> {
    ColumnRegistry::from_columns([
        ColumnDefinition::new("id", ColumnDataType::Text).with_label("Order"),
        ColumnDefinition::new("customer", ColumnDataType::Text)
            .with_accessor("customer_name")
            .with_label("Customer"),
        ColumnDefinition::new("status", ColumnDataType::Option)
            .with_label("Status")
            .with_options(STATUSES),
        ColumnDefinition::new("tags", ColumnDataType::MultiOption)
            .with_label("Tags")
            .with_options(TAGS),
        ColumnDefinition::new("price", ColumnDataType::Number).with_label("Price"),
        ColumnDefinition::new("created_at", ColumnDataType::Date).with_label("Created"),
        ColumnDefinition::new("paid", ColumnDataType::Boolean).with_label("Paid"),
    ])
}

pub fn order_key() -> OrderKey {
    OrderKey::new("created_at", "id")
}

/// One generated order in storage form
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOrder {
    pub id: String,
    pub customer_name: Option<String>,
    pub status: Option<&'static str>,
    pub tags: Vec<&'static str>,
    pub price: f64,
    pub created_at: i64,
    pub paid: bool,
}

impl SampleOrder {
    fn generate(i: u32) -> Self {
        let n = i as usize;
        let customer_name = (i % 23 != 7).then(|| CUSTOMERS[n % CUSTOMERS.len()].to_string());
        let tags = TAGS
            .iter()
            .enumerate()
            .filter(|(bit, _)| (n / 3) & (1 << bit) != 0)
            .map(|(_, tag)| *tag)
            .collect();

        Self {
            id: format!("ord_{:05}", i),
            customer_name,
            status: (i % 29 != 11).then(|| STATUSES[n % STATUSES.len()]),
            tags,
            price: ((i * 37) % 500) as f64 + if i % 2 == 0 { 0.0 } else { 0.99 },
            created_at: SEED_EPOCH_MS - i as i64 * HOUR_MS,
            paid: i % 3 != 0,
        }
    }

    /// Row keyed by accessor, as the in-memory store holds it
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("customer_name".into(), json!(self.customer_name));
        row.insert("status".into(), json!(self.status));
        row.insert("tags".into(), json!(self.tags));
        row.insert("price".into(), json!(self.price));
        row.insert("created_at".into(), json!(self.created_at));
        row.insert("paid".into(), json!(self.paid));
        row
    }
}

pub fn sample_orders(count: u32) -> Vec<SampleOrder> {
    (0..count).map(SampleOrder::generate).collect()
}

pub fn seed_memory(store: &MemoryRowStore, count: u32) {
    store.extend(sample_orders(count).iter().map(SampleOrder::to_row));
    tracing::debug!(rows = count, "Seeded in-memory orders");
}

/// Create the orders table and fill it when empty
pub async fn seed_sqlite(pool: &SqlitePool, count: u32) -> Result<u64, StoreError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;

    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::debug!(existing, "Orders table already populated");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for order in sample_orders(count) {
        let tags = serde_json::to_string(&order.tags)
            .map_err(|e| StoreError::invalid_row("sqlite", e.to_string()))?;
        sqlx::query(
            "INSERT INTO orders (id, customer_name, status, tags, price, created_at, paid) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(order.status)
        .bind(tags)
        .bind(order.price)
        .bind(order.created_at)
        .bind(order.paid)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(rows = count, "Seeded orders table");
    Ok(count as u64)
}
