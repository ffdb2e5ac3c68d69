//! Reports the calling session back to the client.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use crate::domains::tools::{ToolContext, ToolDefinition, ToolError};

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SessionInfoParams {}

/// Returns the session and request ids of the invocation.
#[derive(Debug, Clone, Default)]
pub struct SessionInfoTool;

#[async_trait]
impl ToolDefinition for SessionInfoTool {
    const NAME: &'static str = "get_session";
    const DESCRIPTION: &'static str = "gets the session id and context";

    type Params = SessionInfoParams;

    async fn execute(
        &self,
        _params: SessionInfoParams,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let info = json!({
            "sessionId": ctx.session_id(),
            "requestId": ctx.request_id(),
        });
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| ToolError::internal(e.to_string()))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}
