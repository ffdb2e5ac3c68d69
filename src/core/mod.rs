//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server:
//! configuration, error handling, the session table, request dispatch,
//! notification delivery and the HTTP transport.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod notification;
pub mod server;
pub mod session;
pub mod transport;

pub use config::Config;
pub use dispatcher::{Dispatcher, InvocationHandle, InvocationOutcome, ToolCall};
pub use error::{Error, Result};
pub use notification::{LogLevel, NotificationEvent, Notifier};
pub use server::McpServer;
pub use session::{Session, SessionManager};
pub use transport::{HttpConfig, HttpTransport, TransportError};
