use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flowise_client::ClientError;

use crate::ErrorResponse;

/// Every handler failure ends up as one of these, rendered as `{"error": ...}`.
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not connect to Flowise: {0}")]
    Upstream(String),

    #[error("An internal error occurred: {0}")]
    Internal(String),
}

impl ProxyError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProxyError::Validation(message.into())
    }

    pub fn internal(error: impl std::fmt::Display) -> Self {
        ProxyError::Internal(error.to_string())
    }

    /// Upload failures past validation are all reported as internal errors,
    /// including an unreachable Flowise.
    pub fn into_internal(self) -> Self {
        match self {
            ProxyError::Upstream(details) => ProxyError::Internal(details),
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClientError> for ProxyError {
    fn from(e: ClientError) -> Self {
        if e.is_upstream() {
            ProxyError::Upstream(e.to_string())
        } else {
            ProxyError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ProxyError::Validation(_) => tracing::warn!("Rejected request: {}", self),
            _ => tracing::error!("Error: {}", self),
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
