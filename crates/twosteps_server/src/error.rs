//! Error types for the board server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use twosteps_store::StoreError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the board server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing or unknown session token.
    #[error("unauthorized")]
    Unauthorized,

    /// Requested resource is absent.
    #[error("{0}")]
    NotFound(String),

    /// Store-layer failure (corrupt data, I/O).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error (binding the listener, serving).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidInput(_) | ServerError::Unauthorized | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if self.is_server_error() {
            tracing::error!("internal error: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
