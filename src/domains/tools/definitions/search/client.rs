//! Shared HTTP client for the search providers.

use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::core::config::{CredentialsConfig, SearchConfig};
use crate::domains::tools::ToolError;

/// Text returned when a provider has nothing for the query.
pub const NO_DATA: &str = "no data found.";

/// Thin wrapper over `reqwest` holding endpoints and API keys.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoints: SearchConfig,
    credentials: CredentialsConfig,
}

impl SearchClient {
    /// Create a client for the configured providers.
    pub fn new(endpoints: SearchConfig, credentials: CredentialsConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::internal(format!("Failed to build HTTP client: {}", e)))?;

        if credentials.scraperapi_key.is_none() {
            warn!("MCP_SCRAPERAPI_KEY not set - search-intent will fail");
        }
        if credentials.serpapi_key.is_none() {
            warn!("MCP_SERPAPI_KEY not set - search-trending will fail");
        }

        Ok(Self {
            http,
            endpoints,
            credentials,
        })
    }

    pub fn endpoints(&self) -> &SearchConfig {
        &self.endpoints
    }

    /// ScraperAPI key, or an error naming the missing variable.
    pub fn scraperapi_key(&self) -> Result<&str, ToolError> {
        self.credentials
            .scraperapi_key
            .as_deref()
            .ok_or_else(|| ToolError::execution_failed("MCP_SCRAPERAPI_KEY is not configured"))
    }

    /// SerpApi key, or an error naming the missing variable.
    pub fn serpapi_key(&self) -> Result<&str, ToolError> {
        self.credentials
            .serpapi_key
            .as_deref()
            .ok_or_else(|| ToolError::execution_failed("MCP_SERPAPI_KEY is not configured"))
    }

    /// GET `{base}{path}?{query}` and decode the JSON body.
    ///
    /// Any non-2xx status is a hard failure.
    pub async fn get_json<Q: Serialize>(
        &self,
        base: &str,
        path: &str,
        query: &Q,
    ) -> Result<Value, ToolError> {
        let url = build_url(base, path, query)?;
        // The query string carries the API key; keep it out of the logs.
        debug!("GET {}{}", base.trim_end_matches('/'), path);

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Request to {} failed: {}", path, e);
                ToolError::execution_failed(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Upstream {} returned {}", path, status);
            return Err(ToolError::execution_failed(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                ToolError::execution_failed(format!("Invalid JSON response: {}", e.without_url()))
            })
    }
}

/// Join base URL, path and url-encoded query parameters.
pub fn build_url<Q: Serialize>(base: &str, path: &str, query: &Q) -> Result<String, ToolError> {
    let query = serde_urlencoded::to_string(query)
        .map_err(|e| ToolError::internal(format!("Failed to encode query: {}", e)))?;
    Ok(format!("{}{}?{}", base.trim_end_matches('/'), path, query))
}

/// Pretty-print a JSON value for a text content block.
pub fn pretty(value: &Value) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::search::testing::mock_upstream;
    use axum::{Json, Router, http::StatusCode, routing::get};
    use serde_json::json;

    fn client(base: &str) -> SearchClient {
        SearchClient::new(
            SearchConfig {
                scraperapi_base_url: base.to_string(),
                serpapi_base_url: base.to_string(),
            },
            CredentialsConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_url_encodes_query() {
        let url = build_url(
            "https://example.com/",
            "/search",
            &[("q", "rust lang"), ("hl", "en")],
        )
        .unwrap();
        assert_eq!(url, "https://example.com/search?q=rust+lang&hl=en");
    }

    #[test]
    fn test_missing_keys_are_reported() {
        let client = client("http://localhost");
        let err = client.serpapi_key().unwrap_err();
        assert!(err.to_string().contains("MCP_SERPAPI_KEY"));
        assert!(client.scraperapi_key().is_err());
    }

    #[tokio::test]
    async fn test_get_json_success() {
        let base = mock_upstream(Router::new().route(
            "/ok",
            get(|| async { Json(json!({"hello": "world"})) }),
        ))
        .await;

        let value = client(&base).get_json(&base, "/ok", &[("a", "b")]).await.unwrap();
        assert_eq!(value["hello"], "world");
    }

    #[tokio::test]
    async fn test_get_json_non_success_status() {
        let base = mock_upstream(Router::new().route(
            "/fail",
            get(|| async { StatusCode::BAD_GATEWAY }),
        ))
        .await;

        let err = client(&base)
            .get_json(&base, "/fail", &[("a", "b")])
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(ref msg) if msg.contains("502")));
    }
}
