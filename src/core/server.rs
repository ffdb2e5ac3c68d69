//! MCP server state and lifecycle management.
//!
//! [`McpServer`] ties together the configuration, the tool registry, the
//! session table and the dispatcher. It is built once at startup and handed
//! to the transport by reference, so tests can construct as many isolated
//! servers as they like.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use super::dispatcher::Dispatcher;
use super::session::{Session, SessionError, SessionManager};
use crate::domains::tools::ToolRegistry;

/// Protocol revisions this server speaks, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", "2024-11-05"];

const INSTRUCTIONS: &str = "Streamable HTTP MCP server. Tools: greet, multi-greet (streams \
    log notifications before its result), get_session, search-intent and search-trending.";

/// The main MCP server.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Registered tools, immutable after startup.
    registry: Arc<ToolRegistry>,

    /// Session table.
    sessions: Arc<SessionManager>,

    /// Routes tool calls to handlers.
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Create a new MCP server from a configuration and a populated registry.
    pub fn new(config: Config, registry: Arc<ToolRegistry>) -> Self {
        let config = Arc::new(config);
        let sessions = Arc::new(SessionManager::new(config.session.max_sessions));
        let dispatcher = Dispatcher::new(
            registry.clone(),
            sessions.clone(),
            config.session.tool_timeout(),
        );

        Self {
            config,
            registry,
            sessions,
            dispatcher,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle `initialize`: create a session and build the result.
    pub fn initialize(
        &self,
        requested_version: Option<&str>,
        client_info: Option<Value>,
    ) -> Result<(Session, Value), SessionError> {
        let version = negotiate_version(requested_version);
        let session = self.sessions.create_session(version, client_info)?;
        info!(
            "Initialized session {} (protocol {})",
            session.id, session.protocol_version
        );

        let result = self.initialize_result(version);
        Ok((session, result))
    }

    /// Result body of `initialize` for a negotiated protocol version.
    pub fn initialize_result(&self, protocol_version: &str) -> Value {
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false },
                "logging": {}
            },
            "serverInfo": {
                "name": self.name(),
                "version": self.version()
            },
            "instructions": INSTRUCTIONS
        })
    }

    /// Result body of `tools/list`.
    pub fn list_tools(&self) -> Value {
        json!({ "tools": self.registry.list_tools() })
    }
}

/// Echo the client's version if supported, else offer the latest.
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|v| SUPPORTED_PROTOCOL_VERSIONS.iter().copied().find(|s| *s == v))
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::build_tool_registry;

    fn server() -> McpServer {
        let config = Config::default();
        let registry = Arc::new(build_tool_registry(&config).unwrap());
        McpServer::new(config, registry)
    }

    #[test]
    fn test_negotiate_version() {
        assert_eq!(negotiate_version(Some("2024-11-05")), "2024-11-05");
        assert_eq!(negotiate_version(Some("1999-01-01")), "2025-03-26");
        assert_eq!(negotiate_version(None), "2025-03-26");
    }

    #[test]
    fn test_initialize_creates_session() {
        let server = server();
        let (session, result) = server
            .initialize(Some("2024-11-05"), Some(json!({"name": "test-client"})))
            .unwrap();

        assert!(server.sessions().is_active(&session.id));
        assert_eq!(session.protocol_version, "2024-11-05");
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], server.name());
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_list_tools() {
        let server = server();
        let tools = server.list_tools();
        let names: Vec<&str> = tools["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"multi-greet"));
        assert!(tools["tools"][0]["inputSchema"].is_object());
    }
}
