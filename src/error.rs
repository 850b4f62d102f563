use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Crate-wide error type. One variant per §7 error kind plus the transport
/// wrapping every module eventually needs.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("queue is full")]
    QueueFull,

    #[error("supplied segment storage doesn't report errors")]
    IncompatibleSegmentStorage,

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("authentication required")]
    AuthRejected,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("queue closed")]
    Closed,

    #[error("initialization failed: {message}")]
    InitializationFailed { message: String, exit_code: i32 },

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        ProxyError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::UpstreamUnavailable(e.to_string())
    }
}

/// Maps each error kind to the HTTP status the §7 policy table assigns it.
/// `QueueFull` deliberately returns 500 (not 429) so SDKs back off the way
/// the spec requires, with an explicit "queue is full" message.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::QueueFull => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "queue is full, please retry later".to_string(),
            ),
            ProxyError::IncompatibleSegmentStorage => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ProxyError::UpstreamUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            ProxyError::Malformed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ProxyError::AuthRejected => (StatusCode::UNAUTHORIZED, String::new()),
            ProxyError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ProxyError::Closed => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ProxyError::InitializationFailed { message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            ProxyError::Io(_) | ProxyError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        if message.is_empty() {
            status.into_response()
        } else {
            (status, json!({ "error": message }).to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_full_maps_to_500() {
        let resp = ProxyError::QueueFull.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn auth_rejected_maps_to_401_with_empty_body() {
        let resp = ProxyError::AuthRejected.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
