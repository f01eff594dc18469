//! Row store abstraction
//!
//! A row store answers two questions for a [`Predicate`]: how many rows match,
//! and which rows fall inside a window of the stable default order. Both the
//! SQLite and the in-memory backend implement [`RowStore`].

use async_trait::async_trait;
use gridline::{ColumnDataType, ColumnRegistry};

use super::error::StoreError;
use super::filters::{OrderKey, Predicate};

/// One result row, keyed by column id
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Column as a store sees it: the id rows are keyed by, the accessor the
/// data is read from and the type used to decode it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreColumn {
    pub id: String,
    pub accessor: String,
    pub data_type: ColumnDataType,
}

impl StoreColumn {
    pub fn from_registry(registry: &ColumnRegistry) -> Vec<Self> {
        registry
            .iter()
            .map(|c| Self {
                id: c.id().to_string(),
                accessor: c.accessor().to_string(),
                data_type: c.data_type(),
            })
            .collect()
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Short backend name for logs and errors
    fn backend_name(&self) -> &'static str;

    /// Number of rows matching `predicate`
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError>;

    /// Rows matching `predicate` in `order`, skipping `offset` and returning
    /// at most `limit`
    async fn find(
        &self,
        predicate: &Predicate,
        order: &OrderKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Row>, StoreError>;
}
