//! HTTP transport seam and the reqwest implementation

use crate::error::{Result, TelemetryNodeError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// One outgoing POST
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub timeout_ms: u64,
}

impl HttpRequest {
    /// Value of the first header named `name` (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response status and body
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Issues POST requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request and wait for the status line and body
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryNodeError::Transport`] if no HTTP status was
    /// received (DNS, connect, TLS, timeout)
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("thermora-node/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TelemetryNodeError::Transport(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .post(&request.url)
            .timeout(Duration::from_millis(request.timeout_ms))
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            warn!(
                url = %request.url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "HTTP request failed"
            );
            TelemetryNodeError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        debug!(url = %request.url, status, "HTTP response received");

        // Reading the body to the end hands the connection back to the pool
        let body = response.text().await.unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> HttpRequest {
        HttpRequest {
            url: "http://127.0.0.1:9/readings".to_string(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-API-Key".to_string(), "secret".to_string()),
            ],
            body: "{}".to_string(),
            timeout_ms: 500,
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = request();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-API-KEY"), Some("secret"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let transport = ReqwestTransport::new().unwrap();
        match transport.post(&request()).await {
            Err(TelemetryNodeError::Transport(_)) => {}
            other => panic!("Expected Transport error, got: {:?}", other),
        }
    }
}
