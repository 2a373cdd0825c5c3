//! Name-keyed registry behind `GET /tools`, `POST /tools/{name}` and the agent.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

use ai_agent_core::{
    traits::{Tool, ToolRegistry},
    types::{ToolDefinition, ToolOutput},
    Error, Result,
};
use ai_agent_governance::track_tool_call;

/// Concurrent registry; every call is timed and counted per tool.
pub struct DefaultToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
}

impl DefaultToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for DefaultToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRegistry for DefaultToolRegistry {
    async fn register(&self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        tracing::info!(tool = %name, "Registering tool");

        if self.tools.contains_key(&name) {
            return Err(Error::Internal(format!("Tool '{}' is already registered", name)));
        }

        self.tools.insert(name, tool);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Arc<dyn Tool>>> {
        Ok(self.tools.get(name).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<ToolDefinition>> {
        let mut definitions: Vec<_> = self
            .tools
            .iter()
            .map(|entry| entry.value().definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn execute(&self, name: &str, args: serde_json::Value) -> Result<ToolOutput> {
        // Clone out of the map so no shard lock is held across the await.
        let tool = self
            .tools
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::tool_not_found(name))?;

        tracing::debug!(tool = %name, "Executing tool");

        let started = Instant::now();
        let result = tool.execute(args).await;
        let success = matches!(&result, Ok(output) if output.success);
        track_tool_call(name, success, started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            tracing::warn!(tool = %name, error = %e, "Tool execution failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Counts whitespace-separated words; fails on an empty text.
    struct WordCountTool;

    #[async_trait]
    impl Tool for WordCountTool {
        fn name(&self) -> &str {
            "word_count"
        }

        fn description(&self) -> &str {
            "Count the words in a text"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput> {
            let text = args["text"].as_str().unwrap_or_default();
            let words = text.split_whitespace().count();
            if words == 0 {
                return Ok(ToolOutput::error("Text is empty"));
            }
            Ok(ToolOutput::text(format!("{} words", words)).with_data(json!({ "words": words })))
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let registry = DefaultToolRegistry::new();
        registry.register(Arc::new(WordCountTool)).await.unwrap();

        let tools = registry.list().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "word_count");
        assert_eq!(tools[0].parameters["required"], json!(["text"]));
        assert!(registry.get("word_count").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = DefaultToolRegistry::new();
        registry.register(Arc::new(WordCountTool)).await.unwrap();
        assert!(registry.register(Arc::new(WordCountTool)).await.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute() {
        let registry = DefaultToolRegistry::new();
        registry.register(Arc::new(WordCountTool)).await.unwrap();

        let counted = registry
            .execute("word_count", json!({ "text": "plot sales by month" }))
            .await
            .unwrap();
        assert!(counted.success);
        assert_eq!(counted.content, "4 words");

        let empty = registry.execute("word_count", json!({ "text": "  " })).await.unwrap();
        assert!(!empty.success);
    }

    #[tokio::test]
    async fn test_execute_not_found() {
        let registry = DefaultToolRegistry::new();
        let result = registry.execute("teleport", json!({})).await;
        assert!(matches!(result, Err(Error::ToolNotFound(_))));
    }
}
