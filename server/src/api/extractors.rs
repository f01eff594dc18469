//! Path extractors for API routes

use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::types::ApiError;

/// Maximum length of a table name
pub const MAX_TABLE_NAME_LENGTH: usize = 64;

/// Raw path extractor for table routes (internal use)
#[derive(Debug, Deserialize)]
struct TablePathRaw {
    table: String,
}

/// Validated table path extractor.
///
/// Extracts `table` from the URL and rejects names that could never be
/// registered with a 400 before any lookup happens.
#[derive(Debug)]
pub struct TablePath {
    pub table: String,
}

/// Validate table name: 1-64 chars, alphanumeric + dash/underscore
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_TABLE_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl<S> FromRequestParts<S> for TablePath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<TablePathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_table_name(&raw.table) {
            return Err(ValidationRejection::InvalidTableName);
        }

        Ok(Self { table: raw.table })
    }
}

/// Rejection type for path validation failures
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Invalid table name format
    InvalidTableName,
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Path(rejection) => ApiError::bad_request("PATH_PARSE_ERROR", rejection.body_text()),
            Self::InvalidTableName => ApiError::bad_request(
                "INVALID_TABLE_NAME",
                format!(
                    "Invalid table name: must be 1-{} alphanumeric chars, dashes, or underscores",
                    MAX_TABLE_NAME_LENGTH
                ),
            ),
        };
        err.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert!(is_valid_table_name("orders"));
        assert!(is_valid_table_name("order_items-2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("orders;drop"));
        assert!(!is_valid_table_name("ordérs"));
        assert!(!is_valid_table_name(&"a".repeat(65)));
    }
}
