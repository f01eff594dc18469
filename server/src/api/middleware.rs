//! HTTP middleware (CORS, 404 handler)

use axum::extract::Request;
use axum::http::{HeaderValue, Method, header};
use axum::response::IntoResponse;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::types::ApiError;
use crate::core::config::is_all_interfaces;

/// Allowed origins configuration
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Create allowed origins from host and port configuration
    pub fn new(host: &str, port: u16) -> Self {
        let dev_port = port.saturating_add(1);

        // Loopback and wildcard binds are reachable through either loopback name
        let base_hosts: Vec<&str> =
            if is_all_interfaces(host) || host == "127.0.0.1" || host == "localhost" {
                vec!["localhost", "127.0.0.1"]
            } else {
                vec![host]
            };

        let origins = base_hosts
            .iter()
            .flat_map(|h| {
                [
                    format!("http://{}:{}", h, port),
                    format!("http://{}:{}", h, dev_port),
                    format!("http://{}", h),
                ]
            })
            .collect();

        Self { origins }
    }

    /// Check if an origin is allowed
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create CORS layer; every table endpoint is read-only
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.as_header_values()))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
        ])
}

/// Handle unmatched routes with a JSON 404
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), uri = %req.uri(), "[404]");
    ApiError::not_found(
        "ROUTE_NOT_FOUND",
        format!("No route for {} {}", req.method(), req.uri().path()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_origins() {
        let allowed = AllowedOrigins::new("127.0.0.1", 5390);
        assert!(allowed.is_allowed("http://localhost:5390"));
        assert!(allowed.is_allowed("http://127.0.0.1:5391"));
        assert!(!allowed.is_allowed("http://example.com"));
    }

    #[test]
    fn test_specific_host_origins() {
        let allowed = AllowedOrigins::new("10.0.0.5", 8080);
        assert!(allowed.is_allowed("http://10.0.0.5:8080"));
        assert!(!allowed.is_allowed("http://localhost:8080"));
    }
}
