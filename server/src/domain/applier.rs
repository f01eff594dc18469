//! Predicate applier
//!
//! Turns a decoded filter set into a store predicate, runs the count and the
//! windowed fetch concurrently and assembles the paginated envelope.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gridline::{
    ColumnRegistry, Cursor, FilterOperator, FilterSet, MalformedFilterError, PaginatedEnvelope,
    ValidationError,
};
use thiserror::Error;

use crate::core::constants::{DEFAULT_MAX_PAGE_SIZE, DEFAULT_QUERY_TIMEOUT_MS};
use crate::data::error::StoreError;
use crate::data::filters::{CasePolicy, OrderKey, Predicate, condition_for};
use crate::data::store::{Row, RowStore};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error(transparent)]
    Malformed(#[from] MalformedFilterError),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Operator '{operator}' is not supported for column '{column}'")]
    UnsupportedOperator {
        column: String,
        operator: FilterOperator,
    },

    #[error("Page size {requested} exceeds maximum of {max}")]
    PageSizeTooLarge { requested: u32, max: u32 },

    #[error("Store temporarily unavailable: {0}")]
    StoreTransient(StoreError),

    #[error("Store failure: {0}")]
    StoreFatal(StoreError),
}

impl From<ValidationError> for ApplyError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::UnknownColumn(column) => Self::UnknownColumn(column),
            ValidationError::UnsupportedOperator {
                column, operator, ..
            } => Self::UnsupportedOperator { column, operator },
            other => Self::Validation(other),
        }
    }
}

impl ApplyError {
    pub fn from_store(e: StoreError) -> Self {
        if e.is_transient() {
            Self::StoreTransient(e)
        } else {
            Self::StoreFatal(e)
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTransient(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::Malformed(e) => e.code(),
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::UnsupportedOperator { .. } => "UNSUPPORTED_OPERATOR",
            Self::PageSizeTooLarge { .. } => "PAGE_SIZE_TOO_LARGE",
            Self::StoreTransient(StoreError::Timeout { .. }) => "STORE_TIMEOUT",
            Self::StoreTransient(_) => "STORE_UNAVAILABLE",
            Self::StoreFatal(_) => "STORE_FAILURE",
        }
    }
}

/// Limits applied to every query
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    pub max_page_size: u32,
    pub timeout: Duration,
    pub case: CasePolicy,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            case: CasePolicy::default(),
        }
    }
}

pub struct PredicateApplier {
    store: Arc<dyn RowStore>,
    order: OrderKey,
    options: ApplyOptions,
}

impl PredicateApplier {
    pub fn new(store: Arc<dyn RowStore>, order: OrderKey, options: ApplyOptions) -> Self {
        Self {
            store,
            order,
            options,
        }
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Conjunction of one condition per filter, addressed by accessor
    pub fn build_predicate(
        &self,
        registry: &ColumnRegistry,
        filters: &FilterSet,
    ) -> Result<Predicate, ApplyError> {
        let conditions = filters
            .iter()
            .map(|detail| {
                let column = registry
                    .get(detail.column_id())
                    .map_err(|_| ApplyError::UnknownColumn(detail.column_id().to_string()))?;
                condition_for(column, detail, self.options.case).map_err(ApplyError::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Predicate::new(conditions))
    }

    pub async fn apply(
        &self,
        registry: &ColumnRegistry,
        filters: &FilterSet,
        cursor: Cursor,
    ) -> Result<PaginatedEnvelope<Row>, ApplyError> {
        if cursor.page_size() > self.options.max_page_size {
            return Err(ApplyError::PageSizeTooLarge {
                requested: cursor.page_size(),
                max: self.options.max_page_size,
            });
        }

        let predicate = self.build_predicate(registry, filters)?;

        let (total, data) = tokio::try_join!(
            self.bounded(self.store.count(&predicate)),
            self.bounded(self.store.find(
                &predicate,
                &self.order,
                cursor.offset(),
                cursor.page_size()
            )),
        )?;

        tracing::debug!(
            backend = self.store.backend_name(),
            filters = filters.len(),
            total,
            returned = data.len(),
            "Applied filters"
        );
        Ok(PaginatedEnvelope::new(data, cursor, total))
    }

    async fn bounded<T>(
        &self,
        query: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ApplyError> {
        match tokio::time::timeout(self.options.timeout, query).await {
            Ok(result) => result.map_err(ApplyError::from_store),
            Err(_) => {
                let timeout_ms = self.options.timeout.as_millis() as u64;
                tracing::warn!(
                    backend = self.store.backend_name(),
                    timeout_ms,
                    "Store query timed out"
                );
                Err(ApplyError::StoreTransient(StoreError::timeout(
                    self.store.backend_name(),
                    timeout_ms,
                )))
            }
        }
    }
}
