//! Simple greeting tool.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::domains::tools::{ToolContext, ToolDefinition, ToolError};

/// Parameters for the greeting tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GreetParams {
    /// Name to greet.
    #[schemars(description = "Name to greet")]
    pub name: String,
}

/// Replies with a single greeting and no notifications.
#[derive(Debug, Clone, Default)]
pub struct GreetTool;

#[async_trait]
impl ToolDefinition for GreetTool {
    const NAME: &'static str = "greet";
    const DESCRIPTION: &'static str = "A simple greeting tool";

    type Params = GreetParams;

    async fn execute(
        &self,
        params: GreetParams,
        _ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        info!("Tool called: greet (name={})", params.name);
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Hello, {}!",
            params.name
        ))]))
    }
}
