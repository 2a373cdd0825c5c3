//! Core traits for the AI agent gateway.
//!
//! - `llm`: chat completion clients (LlmClient)
//! - `search`: web search backends (SearchBackend, GroundedSearch)
//! - `skills`: tool abstraction (Tool, ToolRegistry)

pub mod llm;
pub mod search;
pub mod skills;

pub use llm::*;
pub use search::*;
pub use skills::*;
