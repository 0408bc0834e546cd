//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as `{ "error": <message>, "code": <code> }`
//! with a status derived from the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use medichat_chat::{BackendError, ChatError};
use medichat_core::MedichatError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code (e.g., "bad_request", "upstream_timeout").
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 - missing or invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// 404 - unknown or expired conversation.
    #[error("{0}")]
    NotFound(String),
    /// 413 - request body over the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// 409 - request does not fit the conversation's state.
    #[error("{0}")]
    Conflict(String),
    /// 502 - the RAG backend failed or answered nonsense.
    #[error("{0}")]
    BadGateway(String),
    /// 504 - the RAG backend did not answer in time. Safe to retry.
    #[error("{0}")]
    GatewayTimeout(String),
    /// 500 - never shown to the client verbatim.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Conflict(_) => "conflict",
            ApiError::BadGateway(_) => "upstream_error",
            ApiError::GatewayTimeout(_) => "upstream_timeout",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let error = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error, code })).into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            _ => ApiError::BadGateway(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) | ChatError::InvalidForm(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::ConversationNotFound(_) | ChatError::BookingNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ChatError::NoActiveBooking => ApiError::Conflict(err.to_string()),
            ChatError::Backend(e) => ApiError::from(e),
            ChatError::InvalidTransition(..)
            | ChatError::FieldAlreadySet(_)
            | ChatError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<MedichatError> for ApiError {
    fn from(err: MedichatError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_backend_error_mapping() {
        assert_eq!(
            ApiError::from(BackendError::Timeout(25)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        for err in [
            BackendError::Status {
                status: 500,
                message: "boom".to_string(),
            },
            BackendError::Transport("refused".to_string()),
            BackendError::Malformed("not json".to_string()),
            BackendError::StreamRead("reset".to_string()),
        ] {
            assert_eq!(ApiError::from(err).status(), StatusCode::BAD_GATEWAY);
        }
    }

    #[test]
    fn test_chat_error_mapping() {
        assert_eq!(
            ApiError::from(ChatError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::MessageTooLong(2000)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ChatError::ConversationNotFound(Uuid::new_v4())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ChatError::NoActiveBooking).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ChatError::Backend(BackendError::Timeout(5))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(ChatError::Internal("lock".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_of(ApiError::BadRequest("Missing required fields".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Missing required fields");
        assert_eq!(body.code, "bad_request");
    }

    #[tokio::test]
    async fn test_internal_detail_is_sanitized() {
        let (status, body) =
            body_of(ApiError::Internal("conversation map lock poisoned".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert_eq!(body.code, "internal_error");
    }
}
