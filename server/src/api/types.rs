//! Shared API types
//!
//! Error handling for every endpoint. Failures are rendered as the shared
//! error envelope so clients can branch on `code` and `retryable`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gridline::ErrorEnvelope;

use crate::domain::ApplyError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    ServiceUnavailable { code: String, message: String },
    Internal { code: String, message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn service_unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "INTERNAL".to_string(),
            message: message.into(),
        }
    }

    pub fn from_apply(e: ApplyError) -> Self {
        let code = e.code();
        match e {
            ApplyError::StoreTransient(ref inner) => {
                tracing::warn!(error = %inner, backend = inner.backend(), "Transient store error");
                Self::service_unavailable(code, e.to_string())
            }
            ApplyError::StoreFatal(ref inner) => {
                tracing::error!(error = %inner, backend = inner.backend(), "Store error");
                Self::Internal {
                    code: code.to_string(),
                    message: "Store operation failed".to_string(),
                }
            }
            _ => Self::bad_request(code, e.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApplyError> for ApiError {
    fn from(e: ApplyError) -> Self {
        Self::from_apply(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, code, message, retryable) = match self {
            Self::BadRequest { code, message } => ("bad_request", code, message, false),
            Self::NotFound { code, message } => ("not_found", code, message, false),
            Self::ServiceUnavailable { code, message } => {
                ("service_unavailable", code, message, true)
            }
            Self::Internal { code, message } => ("internal_error", code, message, false),
        };
        (
            status,
            Json(ErrorEnvelope::new(error_type, code, message, retryable)),
        )
            .into_response()
    }
}
