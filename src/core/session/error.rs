//! Session-specific error types.

use thiserror::Error;

/// Errors raised by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session with this id exists.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session exists but has been closed.
    #[error("Session closed: {0}")]
    Closed(String),

    /// The configured limit of active sessions has been reached.
    #[error("Maximum of {0} active sessions reached")]
    CapacityReached(usize),

    /// A request with the same id is already running on the session.
    #[error("Request id {0} is already in flight")]
    DuplicateRequest(String),
}

impl SessionError {
    /// Create a new "not found" error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a new "closed" error.
    pub fn closed(id: impl Into<String>) -> Self {
        Self::Closed(id.into())
    }
}
