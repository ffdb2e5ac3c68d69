//! Streamable HTTP MCP Tool Server
//!
//! This crate serves a small set of Model Context Protocol tools over the
//! streamable HTTP transport. Tool calls are answered with a server-sent
//! event stream that carries the tool's log notifications, in emission
//! order, followed by its result.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, sessions, request dispatch,
//!   notification delivery and the HTTP transport
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: the tool registry and the tool definitions
//!
//! # Example
//!
//! ```rust,no_run
//! use streamable_mcp_server::core::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     streamable_mcp_server::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

use std::sync::Arc;
use tracing::info;

// Re-export commonly used types for convenience
pub use crate::core::{Config, Error, McpServer, Result};

use crate::core::HttpTransport;
use crate::domains::tools::build_tool_registry;

/// Build the server from `config` and serve it until shutdown.
pub async fn serve(config: Config) -> Result<()> {
    config.validate()?;

    let registry = Arc::new(build_tool_registry(&config)?);
    info!("Registered {} tools", registry.len());

    let transport = HttpTransport::new(config.transport.clone());
    let server = Arc::new(McpServer::new(config, registry));
    info!("Server initialized");

    transport.run(server).await?;
    Ok(())
}
