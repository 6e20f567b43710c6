use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        code: &'static str,
        message: String,
    },
    #[error("unauthorized")]
    Unauthorized,
    #[error("upstream failure: {message}")]
    Upstream { code: &'static str, message: String },
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn upstream(code: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

/// Failures raised by the HTTP transport adapter before a message reaches
/// the MCP dispatcher.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("sessionId is required")]
    MissingSessionId,
    #[error("no transport registered for session {session_id}")]
    SessionNotFound { session_id: String, reconnect: bool },
    #[error("invalid message body")]
    InvalidMessage,
    #[error("transport failure: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct TransportErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
}

impl TransportErrorResponse {
    fn plain(error: &'static str) -> Self {
        Self {
            error,
            message: None,
            action: None,
        }
    }
}

impl IntoResponse for TransportError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::MissingSessionId => {
                tracing::warn!("message received without sessionId");
                (
                    StatusCode::BAD_REQUEST,
                    TransportErrorResponse::plain("sessionId is required"),
                )
            }
            Self::SessionNotFound {
                session_id,
                reconnect: true,
            } => {
                tracing::warn!(session_id = %session_id, "message for unknown session, asking client to reconnect");
                (
                    StatusCode::CONFLICT,
                    TransportErrorResponse {
                        error: "transport_not_found",
                        message: Some("Session expired or not found. Please reconnect."),
                        action: Some("reconnect"),
                    },
                )
            }
            Self::SessionNotFound {
                session_id,
                reconnect: false,
            } => {
                tracing::warn!(session_id = %session_id, "message for unknown session rejected");
                (
                    StatusCode::BAD_REQUEST,
                    TransportErrorResponse::plain("No transport found for sessionId"),
                )
            }
            Self::InvalidMessage => (
                StatusCode::BAD_REQUEST,
                TransportErrorResponse::plain("Invalid message"),
            ),
            Self::Internal(message) => {
                tracing::error!(error = %message, "error handling message");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    TransportErrorResponse::plain("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
