//! Transport error types.
//!
//! [`TransportError`] covers failures of the listener itself and ends the
//! process. [`ProtocolError`] is a client mistake answered with an HTTP error
//! status; it never affects other sessions.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::protocol::{JsonRpcResponse, error_codes};
use crate::core::session::SessionError;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while running the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error during transport.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP server error.
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl TransportError {
    /// Create a bind error.
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::BindError {
            address: address.into(),
            source,
        }
    }

    /// Create an HTTP error.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::HttpError(msg.into())
    }
}

/// Malformed or out-of-sequence client messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The body is JSON but not a valid JSON-RPC message or batch.
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    /// A non-initialize message arrived without a session id.
    #[error("Bad Request: Mcp-Session-Id header is required")]
    MissingSessionId,

    /// `initialize` arrived on an existing session.
    #[error("Invalid Request: Server already initialized")]
    AlreadyInitialized,

    /// The session id is unknown or its session has been closed.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session could not be created.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The HTTP method is not served on this endpoint.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ProtocolError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Parse(_)
            | Self::InvalidRequest(_)
            | Self::MissingSessionId
            | Self::AlreadyInitialized => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::Unavailable(_) => error_codes::INTERNAL_ERROR,
            _ => error_codes::INVALID_REQUEST,
        }
    }
}

impl From<SessionError> for ProtocolError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) | SessionError::Closed(id) => Self::SessionNotFound(id),
            SessionError::CapacityReached(_) => Self::Unavailable(err.to_string()),
            SessionError::DuplicateRequest(_) => Self::InvalidRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = JsonRpcResponse::error(None, self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}
