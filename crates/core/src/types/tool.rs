use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Registry Tools
// =============================================================================

/// Result of running a registry tool.
///
/// `content` is the text the agent splices into its reply; `data` carries the
/// adapter's structured result for `POST /tools/{name}` callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn new(success: bool, content: impl Into<String>) -> Self {
        Self {
            success,
            content: content.into(),
            data: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(true, content)
    }

    /// A completed call whose adapter reported failure (e.g. Wolfram could not
    /// parse the query).
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(false, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Entry returned by `GET /tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_omits_missing_data() {
        let value = serde_json::to_value(ToolOutput::error("no result")).unwrap();
        assert_eq!(value, json!({ "success": false, "content": "no result" }));

        let with_data = ToolOutput::text("ok").with_data(json!({ "rows": 3 }));
        assert!(with_data.success);
        assert_eq!(with_data.data.unwrap()["rows"], 3);
    }
}
