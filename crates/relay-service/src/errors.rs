//! Relay service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse`
//! impl. Malformed signals are rejected at the boundary and never stored.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use signal_protocol::ProtocolError;
use thiserror::Error;

/// Relay service error type.
///
/// Maps to appropriate HTTP status codes:
/// - InvalidMessage, BadRequest: 400 Bad Request
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl RelayError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::InvalidMessage(_) | RelayError::BadRequest(_) => 400,
            RelayError::Internal => 500,
        }
    }
}

impl From<ProtocolError> for RelayError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidMessage(reason) => RelayError::InvalidMessage(reason),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RelayError::InvalidMessage(reason) => (
                StatusCode::BAD_REQUEST,
                "INVALID_MESSAGE",
                reason.clone(),
            ),
            RelayError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            RelayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_invalid_message() {
        let error = RelayError::InvalidMessage("sender identity must be non-empty".to_string());
        assert_eq!(
            format!("{}", error),
            "Invalid message: sender identity must be non-empty"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::InvalidMessage("x".to_string()).status_code(), 400);
        assert_eq!(RelayError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(RelayError::Internal.status_code(), 500);
    }

    #[test]
    fn test_from_protocol_error() {
        let error: RelayError =
            ProtocolError::InvalidMessage("bad kind".to_string()).into();
        assert!(matches!(error, RelayError::InvalidMessage(msg) if msg == "bad kind"));
    }

    #[tokio::test]
    async fn test_into_response_invalid_message() {
        let error = RelayError::InvalidMessage("recipient identity must be non-empty".to_string());
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_MESSAGE");
        assert_eq!(
            body_json["error"]["message"],
            "recipient identity must be non-empty"
        );
    }

    #[tokio::test]
    async fn test_into_response_internal() {
        let error = RelayError::Internal;
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body_json["error"]["message"], "An internal error occurred");
    }
}
