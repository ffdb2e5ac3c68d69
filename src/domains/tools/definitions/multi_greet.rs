//! Greeting tool that reports its progress through notifications.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::core::notification::LogLevel;
use crate::domains::tools::{ToolContext, ToolDefinition, ToolError};

/// Parameters for the multi-greet tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MultiGreetParams {
    /// Name to greet.
    #[schemars(description = "Name to greet")]
    pub name: String,
}

/// Emits three log notifications, pausing between them, then greets.
#[derive(Debug, Clone)]
pub struct MultiGreetTool {
    pause: Duration,
}

impl MultiGreetTool {
    /// Create the tool with the pause used between greetings.
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }

    async fn pause(&self) {
        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
        }
    }
}

impl Default for MultiGreetTool {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl ToolDefinition for MultiGreetTool {
    const NAME: &'static str = "multi-greet";
    const DESCRIPTION: &'static str =
        "A tool that sends different greetings with delays between them";

    type Params = MultiGreetParams;

    async fn execute(
        &self,
        params: MultiGreetParams,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let name = params.name;
        info!("Tool called: multi-greet (name={})", name);

        ctx.send_notification(LogLevel::Debug, format!("Starting multi-greet for {}", name))
            .await;

        self.pause().await;
        ctx.send_notification(LogLevel::Info, format!("Sending first greeting to {}", name))
            .await;

        self.pause().await;
        ctx.send_notification(LogLevel::Info, format!("Sending second greeting to {}", name))
            .await;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Good morning, {}!",
            name
        ))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::protocol::OutboundMessage;
    use crate::domains::tools::context::testing::test_context;
    use rmcp::model::RawContent;

    #[tokio::test]
    async fn test_multi_greet_notifications_in_order() {
        let (ctx, mut rx) = test_context();
        let tool = MultiGreetTool::new(Duration::ZERO);
        let params = MultiGreetParams {
            name: "Bob".to_string(),
        };

        let result = tool.execute(params, ctx).await.unwrap();

        let mut seen = Vec::new();
        while let Some(OutboundMessage::Notification(note)) = rx.recv().await {
            let params = note.params.unwrap();
            seen.push((
                params["level"].as_str().unwrap().to_string(),
                params["data"].as_str().unwrap().to_string(),
            ));
        }
        assert_eq!(
            seen,
            vec![
                ("debug".to_string(), "Starting multi-greet for Bob".to_string()),
                ("info".to_string(), "Sending first greeting to Bob".to_string()),
                ("info".to_string(), "Sending second greeting to Bob".to_string()),
            ]
        );

        let RawContent::Text(text) = &result.content[0].raw else {
            panic!("expected text content");
        };
        assert_eq!(text.text, "Good morning, Bob!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_greet_suspends_between_greetings() {
        let (ctx, _rx) = test_context();
        let tool = MultiGreetTool::default();
        let started = tokio::time::Instant::now();

        tool.execute(
            MultiGreetParams {
                name: "Bob".to_string(),
            },
            ctx,
        )
        .await
        .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
