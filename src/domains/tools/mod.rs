//! Tools domain module.
//!
//! This module handles all tool-related functionality for the MCP server.
//! Tools are executable functions that can be called by MCP clients to perform
//! specific actions or computations.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `handlers.rs` - The `ToolHandler` / `ToolDefinition` traits
//! - `context.rs` - Per-invocation execution context
//! - `registry.rs` - Central tool registry and startup registration
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` (e.g., `my_tool.rs`)
//! 2. Define a params struct and implement `ToolDefinition`
//! 3. Export in `definitions/mod.rs`
//! 4. Register in `build_tool_registry()` in `registry.rs`

pub mod context;
pub mod definitions;
mod error;
mod handlers;
mod registry;

pub use context::ToolContext;
pub use error::ToolError;
pub use handlers::{ToolDefinition, ToolHandler};
pub use registry::{ToolDescriptor, ToolRegistry, build_tool_registry};
