//! Error types for the AI agent gateway.

use thiserror::Error;

/// Result type alias using the gateway's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by every adapter and the HTTP layer.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No CSV file loaded")]
    NoDataLoaded,

    // =========================================================================
    // Adapter Errors
    // =========================================================================
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("{service} error: {message}")]
    Upstream { service: String, message: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Model provider error: {0}")]
    ModelProvider(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a not configured error for a named service.
    pub fn not_configured(service: impl Into<String>) -> Self {
        Self::NotConfigured(service.into())
    }

    /// Create an upstream service error.
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create a tool execution error.
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is caused by the caller rather than by a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::NotFound(_) | Error::NoDataLoaded | Error::ToolNotFound(_)
        )
    }

    /// Whether the error came from an adapter talking to an external service.
    ///
    /// These are reported inside a `success: false` envelope instead of an
    /// HTTP error status.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(
            self,
            Error::NotConfigured(_)
                | Error::Upstream { .. }
                | Error::ToolExecution(_)
                | Error::ModelProvider(_)
                | Error::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::NoDataLoaded.is_client_error());
        assert!(Error::invalid_request("x").is_client_error());
        assert!(!Error::upstream("Clipdrop", "500").is_client_error());

        assert!(Error::upstream("Clipdrop", "500").is_adapter_failure());
        assert!(Error::Timeout("video".into()).is_adapter_failure());
        assert!(!Error::internal("boom").is_adapter_failure());
    }

    #[test]
    fn test_upstream_display() {
        let err = Error::upstream("SerpAPI", "HTTP 429");
        assert_eq!(err.to_string(), "SerpAPI error: HTTP 429");
    }
}
