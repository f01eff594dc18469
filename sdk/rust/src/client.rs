//! HTTP client for a Gridline server.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::envelope::{ErrorEnvelope, PaginatedEnvelope, TableColumns};
use crate::model::FilterSet;
use crate::query::{Cursor, encode};
use crate::retry::{RetryPolicy, retry_with_backoff_async};

/// Path segments in front of the table name
const TABLES_PATH: [&str; 3] = ["api", "v1", "tables"];

/// Client-side failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Network error: {message}")]
    Network { message: String, retryable: bool },

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        retryable: bool,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Failed to encode query: {0}")]
    Encode(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { retryable, .. } | Self::Api { retryable, .. } => *retryable,
            Self::Decode(_) | Self::Encode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Decode(e.to_string());
        }
        Self::Network {
            retryable: e.is_timeout() || e.is_connect() || e.is_request(),
            message: e.to_string(),
        }
    }
}

/// Client for the table endpoints of a Gridline server
#[derive(Debug, Clone)]
pub struct GridlineClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GridlineClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:5390`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Column metadata for `table`
    pub async fn columns(&self, table: &str) -> Result<TableColumns, ClientError> {
        let url = self.table_url(table, "columns")?;
        self.get_with_retry(&url).await
    }

    /// Fetch one page of `table` rows matching `filters`
    ///
    /// Failures the server marks `retryable` are retried with exponential
    /// backoff; everything else is returned immediately.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &FilterSet,
        cursor: Cursor,
    ) -> Result<PaginatedEnvelope<T>, ClientError> {
        let query = encode(filters, cursor)
            .to_query_string()
            .map_err(|e| ClientError::Encode(e.to_string()))?;
        let mut url = self.table_url(table, "rows")?;
        url.set_query(Some(&query));
        self.get_with_retry(&url).await
    }

    /// `{base}/api/v1/tables/{table}/{endpoint}`, with `table` encoded as a
    /// single path segment
    fn table_url(&self, table: &str, endpoint: &str) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ClientError::Encode(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Encode(format!("base URL '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(TABLES_PATH)
            .push(table)
            .push(endpoint);
        Ok(url)
    }

    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        url: &reqwest::Url,
    ) -> Result<T, ClientError> {
        retry_with_backoff_async(self.retry, ClientError::is_retryable, || self.get(url))
            .await
            .map(|(body, _)| body)
            .map_err(|(e, attempts)| {
                tracing::debug!(error = %e, attempts, url = %url, "Request failed");
                e
            })
    }

    async fn get<T: DeserializeOwned>(&self, url: &reqwest::Url) -> Result<T, ClientError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status_code = status.as_u16();
        let fallback_retryable = status.is_server_error() || status_code == 429;
        let body = response.text().await.unwrap_or_default();
        Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ClientError::Api {
                status: status_code,
                code: envelope.code,
                message: envelope.message,
                retryable: envelope.retryable,
            },
            Err(_) => ClientError::Api {
                status: status_code,
                code: format!("HTTP_{}", status_code),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
                retryable: fallback_retryable,
            },
        })
    }
}
