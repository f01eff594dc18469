//! Queryable tables
//!
//! A [`Table`] pairs a column registry with the applier that serves it. The
//! [`TableCatalog`] holds every table the server exposes, in registration
//! order.

use std::sync::Arc;

use gridline::query::{PARAM_PAGE_SIZE, decode};
use gridline::{ColumnRegistry, Cursor, PaginatedEnvelope, QueryParams, TableColumns};
use indexmap::IndexMap;

use super::applier::{ApplyError, PredicateApplier};
use crate::data::store::Row;

pub struct Table {
    name: String,
    registry: Arc<ColumnRegistry>,
    applier: PredicateApplier,
    default_page_size: u32,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        registry: Arc<ColumnRegistry>,
        applier: PredicateApplier,
        default_page_size: u32,
    ) -> Self {
        Self {
            name: name.into(),
            registry,
            applier,
            default_page_size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<ColumnRegistry> {
        &self.registry
    }

    pub fn columns(&self) -> TableColumns {
        TableColumns {
            table: self.name.clone(),
            columns: self.registry.iter().map(|c| c.describe()).collect(),
        }
    }

    /// Decode transport parameters and run them against the store
    pub async fn query(&self, params: &QueryParams) -> Result<PaginatedEnvelope<Row>, ApplyError> {
        let (filters, mut cursor) = decode(&self.registry, params)?;

        let has_page_size = params.pairs().iter().any(|(name, _)| name == PARAM_PAGE_SIZE);
        if !has_page_size {
            // default_page_size is validated non-zero at config load
            if let Ok(c) = Cursor::new(cursor.page_index(), self.default_page_size) {
                cursor = c;
            }
        }

        tracing::debug!(
            table = %self.name,
            filters = filters.len(),
            page_index = cursor.page_index(),
            page_size = cursor.page_size(),
            "Querying table"
        );
        self.applier.apply(&self.registry, &filters, cursor).await
    }
}

#[derive(Default)]
pub struct TableCatalog {
    tables: IndexMap<String, Arc<Table>>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: Table) -> anyhow::Result<()> {
        if self.tables.contains_key(table.name()) {
            anyhow::bail!("Table '{}' is already registered", table.name());
        }
        self.tables.insert(table.name().to_string(), Arc::new(table));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
