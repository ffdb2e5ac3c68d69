//! Tool handler traits.
//!
//! [`ToolHandler`] is the type-erased contract the dispatcher invokes.
//! Most tools implement [`ToolDefinition`] instead, which declares a typed
//! parameter struct whose JSON schema doubles as the tool's input shape.

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::context::ToolContext;
use super::error::ToolError;

/// Type-erased tool body.
///
/// `arguments` have already been validated against the tool's input schema.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool for one invocation.
    async fn call(
        &self,
        arguments: JsonObject,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError>;
}

/// Trait for typed tool definitions.
///
/// Each tool lives in its own file under `definitions/` and implements this
/// trait; the registry derives the input schema from `Params`.
#[async_trait]
pub trait ToolDefinition: Send + Sync + 'static {
    /// The unique name of the tool.
    const NAME: &'static str;

    /// A description of what the tool does.
    const DESCRIPTION: &'static str;

    /// The tool's arguments.
    type Params: DeserializeOwned + JsonSchema + Send + 'static;

    /// Execute the tool logic.
    async fn execute(
        &self,
        params: Self::Params,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError>;
}

/// Adapts a [`ToolDefinition`] to the erased [`ToolHandler`] contract.
pub(crate) struct TypedHandler<T>(pub(crate) T);

#[async_trait]
impl<T: ToolDefinition> ToolHandler for TypedHandler<T> {
    async fn call(
        &self,
        arguments: JsonObject,
        ctx: ToolContext,
    ) -> Result<CallToolResult, ToolError> {
        let params: T::Params = serde_json::from_value(serde_json::Value::Object(arguments))
            .map_err(|e| ToolError::invalid_arguments(e.to_string()))?;
        self.0.execute(params, ctx).await
    }
}
