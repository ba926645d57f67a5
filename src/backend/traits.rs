//! Trait abstraction for the backend transport to enable mocking in tests

use super::{BackendError, MultipartBody};
use async_trait::async_trait;
use serde_json::Value;

/// Structured HTTP request capability used by forms and the analysis workflow
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Check if the backend health endpoint answers
    async fn check_connection(&self) -> bool;

    /// POST a JSON body and parse the JSON reply.
    ///
    /// A non-2xx reply whose body is still JSON is returned as `Ok` so the
    /// caller can read its `ok`/`message` fields.
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, BackendError>;

    /// POST a multipart body and parse the JSON reply. Non-2xx is an error.
    async fn post_multipart(
        &self,
        endpoint: &str,
        body: MultipartBody,
    ) -> Result<Value, BackendError>;
}
