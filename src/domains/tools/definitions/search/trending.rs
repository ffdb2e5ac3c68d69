//! Search trending tool (Google Trends related queries via SerpApi).

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::client::{NO_DATA, SearchClient, pretty};
use crate::domains::tools::{ToolContext, ToolDefinition, ToolError};

const DEFAULT_DATE: &str = "now+1-d";
const DEFAULT_GEO: &str = "US";

/// Parameters for the search trending tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchTrendingParams {
    /// Keyword to look up.
    #[schemars(description = "Keyword for search trending")]
    pub q: String,

    /// Geographic location, e.g. "US" or "GB".
    #[schemars(description = "Location for the search")]
    #[serde(default)]
    pub location: Option<String>,

    /// Trends date range, e.g. "now+1-d" or "today+12-m".
    #[schemars(description = "Date range for the trends query (default: now+1-d)")]
    #[serde(default)]
    pub date: Option<String>,
}

/// Query string sent to SerpApi.
#[derive(Debug, Serialize)]
struct TrendsQuery<'a> {
    api_key: &'a str,
    engine: &'a str,
    data_type: &'a str,
    date: &'a str,
    hl: &'a str,
    q: &'a str,
    geo: &'a str,
}

/// One rising related query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RisingQuery {
    pub query: Value,
    pub value: Value,
    pub extracted_value: Value,
}

/// Returns the rising related queries for a keyword.
#[derive(Debug, Clone)]
pub struct SearchTrendingTool {
    client: SearchClient,
}

impl SearchTrendingTool {
    pub const PATH: &'static str = "/search";

    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }

    /// Extract `related_queries.rising`, filling gaps with placeholders.
    pub fn rising_queries(data: &Value) -> Option<Vec<RisingQuery>> {
        let rising = data.get("related_queries")?.get("rising")?.as_array()?;
        Some(
            rising
                .iter()
                .map(|entry| RisingQuery {
                    query: field_or(entry, "query", "No query"),
                    value: field_or(entry, "value", "No value"),
                    extracted_value: field_or(entry, "extracted_value", "No extracted_value"),
                })
                .collect(),
        )
    }
}

/// A field's value, or `fallback` when it is absent, null, empty or zero.
fn field_or(entry: &Value, key: &str, fallback: &str) -> Value {
    match entry.get(key) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => fallback.into(),
        Some(Value::String(s)) if s.is_empty() => fallback.into(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => fallback.into(),
        Some(other) => other.clone(),
    }
}

#[async_trait]
impl ToolDefinition for SearchTrendingTool {
    const NAME: &'static str = "search-trending";
    const DESCRIPTION: &'static str = "Get google search trending for a keyword";

    type Params = SearchTrendingParams;

    async fn execute(
        &self,
        params: SearchTrendingParams,
        _ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!("Tool called: search-trending (q={})", params.q);

        let query = TrendsQuery {
            api_key: self.client.serpapi_key()?,
            engine: "google_trends",
            data_type: "RELATED_QUERIES",
            date: params.date.as_deref().unwrap_or(DEFAULT_DATE),
            hl: "en",
            q: &params.q,
            geo: params.location.as_deref().unwrap_or(DEFAULT_GEO),
        };
        let base = &self.client.endpoints().serpapi_base_url;
        let data = self.client.get_json(base, Self::PATH, &query).await?;

        let text = match Self::rising_queries(&data) {
            Some(results) => {
                let value = serde_json::to_value(results)
                    .map_err(|e| ToolError::internal(e.to_string()))?;
                pretty(&value)?
            }
            None => NO_DATA.to_string(),
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
    use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
    use rmcp::model::RawContent;
    use serde_json::json;
    use std::collections::HashMap;

    fn tool(base: &str) -> SearchTrendingTool {
        let client = SearchClient::new(
            SearchConfig {
                scraperapi_base_url: base.to_string(),
                serpapi_base_url: base.to_string(),
            },
            CredentialsConfig {
                scraperapi_key: None,
                serpapi_key: Some("serp".to_string()),
            },
        )
        .unwrap();
        SearchTrendingTool::new(client)
    }

    fn params(q: &str, location: Option<&str>) -> SearchTrendingParams {
        SearchTrendingParams {
            q: q.to_string(),
            location: location.map(str::to_string),
            date: None,
        }
    }

    #[test]
    fn test_rising_queries_fill_defaults() {
        let data = json!({
            "related_queries": {
                "rising": [
                    {"query": "rust 2024", "value": "+300%", "extracted_value": 300},
                    {"query": "", "value": null}
                ]
            }
        });
        let rising = SearchTrendingTool::rising_queries(&data).unwrap();
        assert_eq!(rising[0].query, "rust 2024");
        assert_eq!(rising[0].extracted_value, 300);
        assert_eq!(rising[1].query, "No query");
        assert_eq!(rising[1].value, "No value");
        assert_eq!(rising[1].extracted_value, "No extracted_value");

        assert!(SearchTrendingTool::rising_queries(&json!({"related_queries": {}})).is_none());
    }

    #[tokio::test]
    async fn test_sends_trends_query() {
        let router = Router::new().route(
            SearchTrendingTool::PATH,
            get(|Query(q): Query<HashMap<String, String>>| async move {
                Json(json!({
                    "related_queries": {
                        "rising": [{
                            "query": format!("{}|{}|{}|{}", q["engine"], q["data_type"], q["geo"], q["date"]),
                            "value": "Breakout",
                            "extracted_value": 5000
                        }]
                    }
                }))
            }),
        );
        let base = mock_upstream(router).await;
        let (ctx, _rx) = test_context();

        let result = tool(&base).execute(params("rust", Some("GB")), ctx).await.unwrap();
        let RawContent::Text(text) = &result.content[0].raw else {
            panic!("expected text content");
        };
        let body: Value = serde_json::from_str(&text.text).unwrap();
        assert_eq!(body[0]["query"], "google_trends|RELATED_QUERIES|GB|now+1-d");
        assert_eq!(body[0]["value"], "Breakout");
    }

    #[tokio::test]
    async fn test_upstream_error_is_a_tool_failure() {
        let router = Router::new().route(
            SearchTrendingTool::PATH,
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = mock_upstream(router).await;
        let (ctx, _rx) = test_context();

        let err = tool(&base).execute(params("rust", None), ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(ref msg) if msg.contains("500")));
    }
}
