//! Session tracking for the streamable HTTP transport.
//!
//! Sessions are created by `initialize`, looked up by the `Mcp-Session-Id`
//! header on every later request, and closed on `DELETE` or when a response
//! stream is dropped by the client.

mod error;
mod manager;

pub use error::SessionError;
pub use manager::{Session, SessionManager, SessionStatus};
