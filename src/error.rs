use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Transaction source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Notification failed: {0}")]
    NotifyFailure(#[from] NotifyError),

    #[error("Store error: {0}")]
    StoreFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WatchError {
    /// True when the process should stop rather than log and continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatchError::NotifyFailure(NotifyError::InvalidDestination(_)) | WatchError::ConfigError(_)
        )
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        WatchError::SourceUnavailable(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl IntoResponse for WatchError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();

        let (status, error_code) = match &self {
            WatchError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD"),
            WatchError::SourceUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            WatchError::NotifyFailure(_) => (StatusCode::BAD_GATEWAY, "NOTIFY_FAILURE"),
            WatchError::StoreFailure(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_FAILURE"),
            WatchError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
        };

        if status.is_client_error() {
            tracing::warn!(error = %self, error_code = error_code, "Request rejected");
        } else {
            tracing::error!(error = ?self, error_code = error_code, "Request failed");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_destination_is_fatal() {
        let err = WatchError::from(NotifyError::InvalidDestination("chat not found".into()));
        assert!(err.is_fatal());

        let err = WatchError::from(NotifyError::TransientNetwork("timeout".into()));
        assert!(!err.is_fatal());
        assert!(!WatchError::SourceUnavailable("502".into()).is_fatal());
    }

    #[test]
    fn malformed_payload_maps_to_bad_request() {
        let response = WatchError::MalformedPayload("expected array".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = WatchError::StoreFailure("down".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = WatchError::ConfigError("PORT".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
