//! Search intent tool (structured Google results via ScraperAPI).

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::{NO_DATA, SearchClient, pretty};
use crate::domains::tools::{ToolContext, ToolDefinition, ToolError};

/// Parameters for the search intent tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchIntentParams {
    /// Keyword to inspect.
    #[schemars(description = "Keyword for search intent")]
    pub keyword: String,
}

/// Query string sent to ScraperAPI.
#[derive(Debug, Serialize)]
struct IntentQuery<'a> {
    api_key: &'a str,
    query: &'a str,
    ultra_premium: bool,
}

/// Returns the organic results Google shows for a keyword.
#[derive(Debug, Clone)]
pub struct SearchIntentTool {
    client: SearchClient,
}

impl SearchIntentTool {
    pub const PATH: &'static str = "/structured/google/search";

    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolDefinition for SearchIntentTool {
    const NAME: &'static str = "search-intent";
    const DESCRIPTION: &'static str = "Get search intent for keyword";

    type Params = SearchIntentParams;

    async fn execute(
        &self,
        params: SearchIntentParams,
        _ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!("Tool called: search-intent (keyword={})", params.keyword);

        let query = IntentQuery {
            api_key: self.client.scraperapi_key()?,
            query: &params.keyword,
            ultra_premium: true,
        };
        let base = &self.client.endpoints().scraperapi_base_url;
        let data = self.client.get_json(base, Self::PATH, &query).await?;

        let text = match data.get("organic_results") {
            Some(results) if !results.is_null() => pretty(results)?,
            _ => NO_DATA.to_string(),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{CredentialsConfig, SearchConfig};
    use crate::domains::tools::context::testing::test_context;
    use crate::domains::tools::definitions::search::testing::mock_upstream;
    use axum::{Json, Router, extract::Query, routing::get};
    use rmcp::model::RawContent;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    fn tool(base: &str, key: Option<&str>) -> SearchIntentTool {
        let client = SearchClient::new(
            SearchConfig {
                scraperapi_base_url: base.to_string(),
                serpapi_base_url: base.to_string(),
            },
            CredentialsConfig {
                scraperapi_key: key.map(str::to_string),
                serpapi_key: None,
            },
        )
        .unwrap();
        SearchIntentTool::new(client)
    }

    fn text(result: &CallToolResult) -> String {
        let RawContent::Text(text) = &result.content[0].raw else {
            panic!("expected text content");
        };
        text.text.clone()
    }

    #[tokio::test]
    async fn test_returns_organic_results() {
        let router = Router::new().route(
            SearchIntentTool::PATH,
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("api_key").map(String::as_str), Some("k"));
                assert_eq!(q.get("ultra_premium").map(String::as_str), Some("true"));
                Json(json!({"organic_results": [{"title": q.get("query").cloned()}]}))
            }),
        );
        let base = mock_upstream(router).await;
        let (ctx, _rx) = test_context();

        let params = SearchIntentParams {
            keyword: "rust async".to_string(),
        };
        let result = tool(&base, Some("k")).execute(params, ctx).await.unwrap();

        let body: Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(body[0]["title"], "rust async");
    }

    #[tokio::test]
    async fn test_missing_results_yield_no_data() {
        let router = Router::new().route(SearchIntentTool::PATH, get(|| async { Json(json!({})) }));
        let base = mock_upstream(router).await;
        let (ctx, _rx) = test_context();

        let params = SearchIntentParams {
            keyword: "x".to_string(),
        };
        let result = tool(&base, Some("k")).execute(params, ctx).await.unwrap();
        assert_eq!(text(&result), NO_DATA);
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let (ctx, _rx) = test_context();
        let params = SearchIntentParams {
            keyword: "x".to_string(),
        };
        // Nothing listens on this port; a request would fail differently.
        let err = tool("http://127.0.0.1:9", None)
            .execute(params, ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("MCP_SCRAPERAPI_KEY"));
    }
}
