#![deny(unused)]
//! Core types, traits, and error definitions for the AI agent gateway.
//!
//! This crate provides the building blocks shared by the model gateway, the
//! skill adapters, and the HTTP layer.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use traits::{
    strip_code_fence, ChatMessage, GroundedSearch, LlmClient, LlmResponse, LlmUsage,
    SearchBackend, Tool, ToolRegistry,
};
pub use types::{
    ConversationHistory, ConversationTurn, GroundedAnswer, MathImage, MathResult, SearchEngine,
    SearchResult, ToolDefinition, ToolEnvelope, ToolOutput,
};
