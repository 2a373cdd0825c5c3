//! Tools the agent and `/tools` routes can invoke by name.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{ToolDefinition, ToolOutput};

/// One adapter operation exposed by name.
///
/// Invalid arguments are `Err(InvalidRequest)`; an adapter that ran but
/// produced no answer returns `Ok` with `success == false`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<ToolOutput>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }
}

#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Fails if a tool with the same name exists.
    async fn register(&self, tool: Arc<dyn Tool>) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<Arc<dyn Tool>>>;

    /// Definitions sorted by name.
    async fn list(&self) -> Result<Vec<ToolDefinition>>;

    /// `Err(ToolNotFound)` for an unknown name.
    async fn execute(&self, name: &str, args: Value) -> Result<ToolOutput>;
}
