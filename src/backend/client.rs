//! HTTP client for communicating with the AIRM backend
//!
//! All endpoints are resolved against one configurable base origin.

use super::{BackendError, BackendTransport, MultipartBody};
use crate::config::ClientConfig;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// Client for communicating with the backend
pub struct BackendClient {
    /// The HTTP client
    http: Client,
    /// Base origin every relative endpoint is resolved against
    origin: String,
    /// Health endpoint used by `check_connection`
    health_endpoint: String,
}

impl BackendClient {
    /// Create a new backend client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            origin: config.backend_origin.clone(),
            health_endpoint: config.health_endpoint.clone(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Absolute URL for an endpoint
    pub fn url_for(&self, endpoint: &str) -> String {
        resolve_url(&self.origin, endpoint)
    }
}

/// Join an origin and an endpoint with exactly one slash.
/// Absolute endpoints are returned unchanged.
pub fn resolve_url(origin: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let origin = origin.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    if endpoint.is_empty() {
        origin.to_string()
    } else {
        format!("{origin}/{endpoint}")
    }
}

/// Read a reply body as JSON.
///
/// With `lenient_status`, a non-2xx reply that still carries JSON is
/// returned as a value.
async fn read_json(response: Response, lenient_status: bool) -> Result<Value, BackendError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() && !lenient_status {
        return Err(BackendError::from_status(status.as_u16(), &text));
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(BackendError::from_status(status.as_u16(), &text)),
        Err(e) => Err(BackendError::Malformed(e.to_string())),
    }
}

#[async_trait]
impl BackendTransport for BackendClient {
    async fn check_connection(&self) -> bool {
        let url = self.url_for(&self.health_endpoint);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Health check against {url} failed: {e}");
                false
            }
        }
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.url_for(endpoint);
        tracing::debug!("POST {url} (json)");

        let response = self.http.post(&url).json(body).send().await?;
        read_json(response, true).await
    }

    async fn post_multipart(
        &self,
        endpoint: &str,
        body: MultipartBody,
    ) -> Result<Value, BackendError> {
        let url = self.url_for(endpoint);
        tracing::debug!("POST {url} (multipart, {} parts)", body.parts().len());

        let form = body.into_form()?;
        let response = self.http.post(&url).multipart(form).send().await?;
        read_json(response, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url_joins_with_single_slash() {
        assert_eq!(
            resolve_url("http://localhost:8000", "/api/register"),
            "http://localhost:8000/api/register"
        );
        assert_eq!(
            resolve_url("http://localhost:8000/", "/api/register"),
            "http://localhost:8000/api/register"
        );
        assert_eq!(
            resolve_url("http://localhost:8000", "api/register"),
            "http://localhost:8000/api/register"
        );
    }

    #[test]
    fn test_resolve_url_keeps_absolute_endpoint() {
        assert_eq!(
            resolve_url("http://localhost:8000", "https://example.com/api/contact"),
            "https://example.com/api/contact"
        );
    }

    #[test]
    fn test_resolve_url_empty_endpoint() {
        assert_eq!(
            resolve_url("http://localhost:8000/", ""),
            "http://localhost:8000"
        );
    }

    #[test]
    fn test_resolve_url_keeps_origin_path_prefix() {
        assert_eq!(
            resolve_url("https://host.example/app", "/airm/preview"),
            "https://host.example/app/airm/preview"
        );
    }

    #[test]
    fn test_client_from_default_config() {
        let client = BackendClient::new(&ClientConfig::default()).unwrap();
        assert_eq!(client.origin(), "http://127.0.0.1:8000");
        assert_eq!(client.url_for("/healthz"), "http://127.0.0.1:8000/healthz");
    }

    #[test]
    fn test_client_with_timeout() {
        let config = ClientConfig {
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        assert!(BackendClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_check_connection_false_when_unreachable() {
        // Port 9 (discard) on localhost is almost never served over HTTP
        let config = ClientConfig {
            backend_origin: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: Some(2),
            ..Default::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert!(!client.check_connection().await);
    }

    #[tokio::test]
    async fn test_post_json_network_error_is_network_variant() {
        let config = ClientConfig {
            backend_origin: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: Some(2),
            ..Default::default()
        };
        let client = BackendClient::new(&config).unwrap();
        let result = client
            .post_json("/api/contact", &serde_json::json!({"name": "x"}))
            .await;
        assert!(matches!(result, Err(BackendError::Network(_))));
    }
}
