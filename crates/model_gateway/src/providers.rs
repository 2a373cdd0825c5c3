//! LLM provider construction from configuration.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;

use ai_agent_core::{
    config::LlmConfig,
    traits::{ChatMessage, LlmClient, LlmResponse},
    Error, Result,
};

use crate::rig_client::{RigConfig, RigLlmClient, RigProvider};

/// Client used when no provider key is available.
///
/// Every call fails with `NotConfigured`, which the HTTP layer reports as a
/// `success: false` envelope.
pub struct UnconfiguredLlmClient {
    key_var: String,
}

impl UnconfiguredLlmClient {
    pub fn new(key_var: impl Into<String>) -> Self {
        Self {
            key_var: key_var.into(),
        }
    }
}

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<LlmResponse> {
        Err(Error::not_configured(&self.key_var))
    }

    async fn chat(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        Err(Error::not_configured(&self.key_var))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

/// Build the LLM client for the configured provider.
///
/// A key present in configuration but missing from the process environment
/// is exported so Rig's `from_env` constructors can find it.
pub fn create_llm_client(config: &LlmConfig) -> Arc<dyn LlmClient> {
    let provider = RigProvider::from_name(&config.provider);
    let key_var = provider.key_var();

    let Some(key) = config.provider_key().filter(|k| !k.expose_secret().is_empty()) else {
        tracing::warn!(provider = %config.provider, "No LLM key configured, LLM features disabled");
        return Arc::new(UnconfiguredLlmClient::new(key_var));
    };

    if std::env::var(key_var).map(|v| v.is_empty()).unwrap_or(true) {
        std::env::set_var(key_var, key.expose_secret());
    }

    tracing::info!(provider = ?provider, model = %config.model, "LLM client ready");
    Arc::new(RigLlmClient::new(RigConfig::new(provider, &config.model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_reports_missing_key() {
        let client = UnconfiguredLlmClient::new("GEMINI_API_KEY");
        let err = client.complete("hi").await.unwrap_err();
        assert!(err.is_adapter_failure());
        assert_eq!(err.to_string(), "GEMINI_API_KEY is not configured");
    }

    #[test]
    fn test_create_without_key_is_unconfigured() {
        let config = LlmConfig {
            provider: "anthropic".into(),
            ..Default::default()
        };
        let client = create_llm_client(&config);
        assert_eq!(client.model_name(), "unconfigured");
    }
}
