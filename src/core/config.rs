//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables, a `.env` file, or defaults.

use super::error::{Error, Result};
use super::transport::HttpConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for the MCP server.
///
/// This struct contains all configurable aspects of the server, organized
/// by concern for clarity and maintainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// HTTP transport configuration.
    pub transport: HttpConfig,

    /// Session and invocation limits.
    pub session: SessionConfig,

    /// Outbound search API endpoints.
    pub search: SearchConfig,

    /// External API credentials configuration.
    #[serde(default, skip_serializing)]
    pub credentials: CredentialsConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Bounds applied to sessions and the invocations running inside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum number of queued outbound messages per response stream.
    /// Emitters wait for capacity once the queue is full.
    pub stream_buffer: usize,

    /// Upper bound on a single tool invocation, in seconds. `0` disables it.
    pub tool_timeout_secs: u64,

    /// How long a closed session id is remembered before being purged.
    pub closed_retention_secs: u64,

    /// Maximum number of concurrently active sessions.
    pub max_sessions: usize,

    /// Pause between the greetings emitted by `multi-greet`, in milliseconds.
    pub multi_greet_pause_ms: u64,
}

/// Base URLs of the third-party search providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// ScraperAPI base URL (structured Google search).
    pub scraperapi_base_url: String,

    /// SerpApi base URL (Google Trends).
    pub serpapi_base_url: String,
}

/// Configuration for external API credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// ScraperAPI key used by `search-intent`.
    pub scraperapi_key: Option<String>,

    /// SerpApi key used by `search-trending`.
    pub serpapi_key: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field(
                "scraperapi_key",
                &self.scraperapi_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "serpapi_key",
                &self.serpapi_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SessionConfig {
    /// The invocation timeout, if one is configured.
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Retention window for closed sessions.
    pub fn closed_retention(&self) -> Duration {
        Duration::from_secs(self.closed_retention_secs)
    }

    /// Pause used by `multi-greet` between emissions.
    pub fn multi_greet_pause(&self) -> Duration {
        Duration::from_millis(self.multi_greet_pause_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stream_buffer: 64,
            tool_timeout_secs: 120,
            closed_retention_secs: 300,
            max_sessions: 1000,
            multi_greet_pause_ms: 1000,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scraperapi_base_url: "https://api.scraperapi.com".to_string(),
            serpapi_base_url: "https://serpapi.com".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "streamable-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: HttpConfig::default(),
            session: SessionConfig::default(),
            search: SearchConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`, with
    /// the exception of `PORT` which is honoured for the listening port.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = HttpConfig::from_env();

        if let Some(buffer) = env_parse::<usize>("MCP_STREAM_BUFFER") {
            // A zero-capacity channel cannot be constructed.
            config.session.stream_buffer = buffer.max(1);
        }
        if let Some(secs) = env_parse("MCP_TOOL_TIMEOUT_SECS") {
            config.session.tool_timeout_secs = secs;
        }
        if let Some(secs) = env_parse("MCP_CLOSED_SESSION_RETENTION_SECS") {
            config.session.closed_retention_secs = secs;
        }
        if let Some(max) = env_parse("MCP_MAX_SESSIONS") {
            config.session.max_sessions = max;
        }

        if let Ok(url) = std::env::var("MCP_SCRAPERAPI_BASE_URL") {
            config.search.scraperapi_base_url = url;
        }
        if let Ok(url) = std::env::var("MCP_SERPAPI_BASE_URL") {
            config.search.serpapi_base_url = url;
        }

        if let Ok(key) = std::env::var("MCP_SCRAPERAPI_KEY") {
            config.credentials.scraperapi_key = Some(key);
        }
        if let Ok(key) = std::env::var("MCP_SERPAPI_KEY") {
            config.credentials.serpapi_key = Some(key);
        }

        config
    }
}

impl Config {
    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.transport.rpc_path.starts_with('/') {
            return Err(Error::config(format!(
                "MCP_HTTP_PATH must start with '/', got '{}'",
                self.transport.rpc_path
            )));
        }
        if matches!(self.transport.rpc_path.as_str(), "/" | "/health") {
            return Err(Error::config(format!(
                "MCP_HTTP_PATH '{}' collides with a built-in route",
                self.transport.rpc_path
            )));
        }
        if self.session.max_sessions == 0 {
            return Err(Error::config("MCP_MAX_SESSIONS must be at least 1"));
        }
        if self.session.stream_buffer == 0 {
            return Err(Error::config("stream buffer must be at least 1"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_credentials_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_SERPAPI_KEY", "test_key_12345");
        }
        let config = Config::from_env();
        assert_eq!(
            config.credentials.serpapi_key.as_deref(),
            Some("test_key_12345")
        );
        unsafe {
            std::env::remove_var("MCP_SERPAPI_KEY");
        }
    }

    #[test]
    fn test_session_limits_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_STREAM_BUFFER", "0");
            std::env::set_var("MCP_TOOL_TIMEOUT_SECS", "0");
        }
        let config = Config::from_env();
        assert_eq!(config.session.stream_buffer, 1);
        assert_eq!(config.session.tool_timeout(), None);
        unsafe {
            std::env::remove_var("MCP_STREAM_BUFFER");
            std::env::remove_var("MCP_TOOL_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let creds = CredentialsConfig {
            scraperapi_key: Some("super_secret_key".to_string()),
            serpapi_key: None,
        };
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super_secret_key"));
    }

    #[test]
    fn test_default_session_config() {
        let config = Config::default();
        assert_eq!(config.session.stream_buffer, 64);
        assert_eq!(config.session.tool_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.transport.port, 3000);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.transport.rpc_path = "mcp".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.transport.rpc_path = "/health".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.session.max_sessions = 0;
        assert!(config.validate().is_err());
    }
}
