//! Tool Registry - central registration and lookup for all tools.
//!
//! The registry is populated once at startup by [`build_tool_registry`] and
//! then shared read-only behind an `Arc`, so lookups need no locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{JsonObject, Tool};
use serde_json::Value;
use tracing::info;

use super::definitions::{
    GreetTool, MultiGreetTool, SearchClient, SearchIntentTool, SearchTrendingTool,
    SessionInfoTool,
};
use super::error::ToolError;
use super::handlers::{ToolDefinition, ToolHandler, TypedHandler};
use crate::core::config::Config;

/// A registered tool: metadata, compiled input shape and handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: Arc<JsonObject>,
    validator: Arc<jsonschema::Validator>,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// JSON schema of the tool's arguments.
    pub fn input_schema(&self) -> &Arc<JsonObject> {
        &self.input_schema
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Check arguments against the declared input shape.
    pub fn validate(&self, arguments: &JsonObject) -> Result<(), ToolError> {
        let instance = Value::Object(arguments.clone());
        let errors: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ToolError::invalid_arguments(errors.join("; ")))
        }
    }

    /// Tool metadata as advertised by `tools/list`.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone().into(),
            description: Some(self.description.clone().into()),
            input_schema: self.input_schema.clone(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }
}

/// Tool registry - manages all available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails if the name is taken or the schema does not compile.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Arc<JsonObject>,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        let name = name.into();
        if self.tools.contains_key(&name) {
            return Err(ToolError::AlreadyRegistered(name));
        }

        let validator = jsonschema::validator_for(&Value::Object((*input_schema).clone()))
            .map_err(|e| ToolError::InvalidSchema(name.clone(), e.to_string()))?;

        info!("Registering tool: {}", name);
        self.tools.insert(
            name.clone(),
            ToolDescriptor {
                name,
                description: description.into(),
                input_schema,
                validator: Arc::new(validator),
                handler,
            },
        );
        Ok(())
    }

    /// Register a typed tool definition.
    pub fn register_tool<T: ToolDefinition>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register(
            T::NAME,
            T::DESCRIPTION,
            cached_schema_for_type::<T::Params>(),
            Arc::new(TypedHandler(tool)),
        )
    }

    /// Look up a tool by name.
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Get all tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Get all tools as Tool models (metadata).
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().map(ToolDescriptor::to_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Build the registry with every tool this server exposes.
///
/// This is the central place where all tools are registered.
/// When adding a new tool, add it here.
pub fn build_tool_registry(config: &Config) -> Result<ToolRegistry, ToolError> {
    let search = SearchClient::new(config.search.clone(), config.credentials.clone())?;

    let mut registry = ToolRegistry::new();
    registry.register_tool(GreetTool)?;
    registry.register_tool(MultiGreetTool::new(config.session.multi_greet_pause()))?;
    registry.register_tool(SessionInfoTool)?;
    registry.register_tool(SearchIntentTool::new(search.clone()))?;
    registry.register_tool(SearchTrendingTool::new(search))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rmcp::model::{CallToolResult, Content};
    use serde_json::json;

    use crate::domains::tools::context::ToolContext;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(
            &self,
            arguments: JsonObject,
            _ctx: ToolContext,
        ) -> Result<CallToolResult, ToolError> {
            Ok(CallToolResult::success(vec![Content::text(
                Value::Object(arguments).to_string(),
            )]))
        }
    }

    fn schema(value: Value) -> Arc<JsonObject> {
        Arc::new(value.as_object().cloned().unwrap())
    }

    fn echo_schema() -> Arc<JsonObject> {
        schema(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "mode": { "type": "string", "enum": ["short", "long"] }
            },
            "required": ["name"]
        }))
    }

    #[test]
    fn test_build_registry() {
        let registry = build_tool_registry(&Config::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "get_session",
                "greet",
                "multi-greet",
                "search-intent",
                "search-trending"
            ]
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry
            .register("echo", "Echo", echo_schema(), Arc::new(Echo))
            .unwrap();
        let err = registry
            .register("echo", "Echo again", echo_schema(), Arc::new(Echo))
            .unwrap_err();
        assert!(matches!(err, ToolError::AlreadyRegistered(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry
            .register("bad", "Bad", schema(json!({"type": 12})), Arc::new(Echo))
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidSchema(..)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_is_stable() {
        let mut registry = ToolRegistry::new();
        registry
            .register("echo", "Echo", echo_schema(), Arc::new(Echo))
            .unwrap();

        let first = registry.lookup("echo").unwrap();
        let second = registry.lookup("echo").unwrap();
        assert!(Arc::ptr_eq(first.handler(), second.handler()));
        assert!(Arc::ptr_eq(first.input_schema(), second.input_schema()));
        assert_eq!(first.description(), "Echo");
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_validate_arguments() {
        let mut registry = ToolRegistry::new();
        registry
            .register("echo", "Echo", echo_schema(), Arc::new(Echo))
            .unwrap();
        let tool = registry.lookup("echo").unwrap();

        let ok = json!({"name": "Ada", "mode": "short"});
        assert!(tool.validate(ok.as_object().unwrap()).is_ok());

        for bad in [json!({}), json!({"name": 5}), json!({"name": "Ada", "mode": "medium"})] {
            assert!(matches!(
                tool.validate(bad.as_object().unwrap()),
                Err(ToolError::InvalidArguments(_))
            ));
        }
    }

    #[test]
    fn test_list_tools_metadata() {
        let registry = build_tool_registry(&Config::default()).unwrap();
        let tools = registry.list_tools();
        let greet = tools.iter().find(|t| t.name == "greet").unwrap();
        assert_eq!(greet.description.as_deref(), Some(GreetTool::DESCRIPTION));
        assert!(greet.input_schema.contains_key("properties"));
    }
}
