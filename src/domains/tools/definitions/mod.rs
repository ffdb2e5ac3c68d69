//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod greet;
pub mod multi_greet;
pub mod search;
pub mod session_info;

pub use greet::{GreetParams, GreetTool};
pub use multi_greet::{MultiGreetParams, MultiGreetTool};
pub use search::{
    SearchClient, SearchIntentParams, SearchIntentTool, SearchTrendingParams, SearchTrendingTool,
};
pub use session_info::{SessionInfoParams, SessionInfoTool};
