//! Transport error taxonomy

use thiserror::Error;

/// Errors raised while talking to the backend.
///
/// The display text of each variant is what ends up in front of the user,
/// so it is kept short and free of internal detail.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, refused connection, reset...)
    #[error("{0}")]
    Network(String),

    /// The backend answered with a non-2xx status and no usable JSON body
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The body could not be parsed as JSON
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The request could not be built (bad URL, bad MIME type)
    #[error("Invalid request: {0}")]
    Request(String),
}

impl BackendError {
    /// Build a `Status` error, preferring the `detail` field of a JSON error body
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| match v.get("detail") {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(other) if !other.is_null() => Some(other.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| body.trim().to_string());

        BackendError::Status { status, detail }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            BackendError::Request(err.to_string())
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_fastapi_detail() {
        let err = BackendError::from_status(404, r#"{"detail": "Preview file not found"}"#);
        assert_eq!(err.to_string(), "HTTP 404: Preview file not found");
    }

    #[test]
    fn test_from_status_falls_back_to_raw_body() {
        let err = BackendError::from_status(502, "  Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_from_status_non_string_detail() {
        let err = BackendError::from_status(422, r#"{"detail": [{"loc": ["file"]}]}"#);
        match err {
            BackendError::Status { status, detail } => {
                assert_eq!(status, 422);
                assert!(detail.contains("loc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_network_error_display_is_message() {
        let err = BackendError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }
}
