//! Response envelopes

use serde::{Deserialize, Serialize};

use crate::columns::ColumnInfo;
use crate::query::Cursor;

/// Pagination metadata in response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub limit: u32,
    pub offset: u64,
    pub has_more: bool,
    pub page_count: u64,
}

impl PaginationMeta {
    /// Derive metadata from the cursor, the filtered total and the number of
    /// rows actually returned
    pub fn compute(cursor: Cursor, total: u64, returned: usize) -> Self {
        let limit = cursor.page_size();
        let offset = cursor.offset();
        Self {
            limit,
            offset,
            has_more: offset.saturating_add(returned as u64) < total,
            page_count: total.div_ceil(limit as u64),
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedEnvelope<T> {
    pub success: bool,
    pub total: u64,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedEnvelope<T> {
    pub fn new(data: Vec<T>, cursor: Cursor, total: u64) -> Self {
        let pagination = PaginationMeta::compute(cursor, total, data.len());
        Self {
            success: true,
            total,
            data,
            pagination,
        }
    }
}

/// Column metadata of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumns {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorEnvelope {
    pub fn new(
        error: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_of_two_pages() {
        let cursor = Cursor::new(0, 20).unwrap();
        let envelope = PaginatedEnvelope::new(vec![0u8; 20], cursor, 25);
        assert_eq!(
            envelope.pagination,
            PaginationMeta {
                limit: 20,
                offset: 0,
                has_more: true,
                page_count: 2,
            }
        );
    }

    #[test]
    fn last_page_has_no_more() {
        let cursor = Cursor::new(1, 20).unwrap();
        let envelope = PaginatedEnvelope::new(vec![0u8; 5], cursor, 25);
        assert!(!envelope.pagination.has_more);
        assert_eq!(envelope.pagination.offset, 20);
    }

    #[test]
    fn empty_result() {
        let envelope = PaginatedEnvelope::<u8>::new(vec![], Cursor::new(3, 10).unwrap(), 0);
        assert_eq!(envelope.pagination.page_count, 0);
        assert!(!envelope.pagination.has_more);
        assert!(envelope.data.is_empty());
    }

    #[test]
    fn page_past_the_end_keeps_total() {
        let envelope = PaginatedEnvelope::<u8>::new(vec![], Cursor::new(9, 10).unwrap(), 42);
        assert_eq!(envelope.total, 42);
        assert_eq!(envelope.pagination.page_count, 5);
        assert!(!envelope.pagination.has_more);
    }

    #[test]
    fn serializes_camel_case() {
        let envelope = PaginatedEnvelope::new(vec!["a"], Cursor::new(0, 1).unwrap(), 3);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["pagination"]["hasMore"], true);
        assert_eq!(json["pagination"]["pageCount"], 3);

        let error = ErrorEnvelope::new("bad_request", "UNKNOWN_COLUMN", "Unknown column: x", false);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["retryable"], false);
    }
}
