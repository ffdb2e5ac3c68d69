//! Transport layer for the MCP server.
//!
//! The server speaks the streamable HTTP transport: JSON-RPC messages are
//! POSTed to one endpoint and tool calls are answered with a server-sent
//! event stream. Everything protocol-level lives in [`protocol`]; the axum
//! plumbing lives in [`http`].

mod config;
mod error;
pub mod http;
pub mod protocol;

pub use config::HttpConfig;
pub use error::{ProtocolError, TransportError, TransportResult};
pub use self::http::{HttpTransport, SESSION_ID_HEADER};
