//! `LlmClient` on top of Rig agents for Gemini, OpenAI and Anthropic.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};

use ai_agent_core::{
    traits::{ChatMessage, LlmClient, LlmResponse, LlmUsage},
    Error, Result,
};
use ai_agent_governance::track_tokens;

use rig::client::CompletionClient;
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    Gemini,
    OpenAI,
    Anthropic,
}

impl RigProvider {
    /// Parse a provider name. Unknown names select Gemini.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "openai" => Self::OpenAI,
            "anthropic" => Self::Anthropic,
            _ => Self::Gemini,
        }
    }

    /// Environment variable Rig reads the provider key from.
    pub fn key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Provider, model and sampling settings for [`RigLlmClient`].
#[derive(Debug, Clone)]
pub struct RigConfig {
    pub provider: RigProvider,
    pub model: String,
    /// Preamble used by `complete`; `chat` takes system messages instead.
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
    /// Key used instead of the provider's environment variable.
    pub api_key: Option<Secret<String>>,
}

impl RigConfig {
    pub fn new(provider: RigProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: None,
            temperature: Some(0.7),
            max_tokens: None,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: Secret<String>) -> Self {
        self.api_key = Some(key);
        self
    }
}

/// Rig-based LLM client.
///
/// Without an explicit `api_key` the provider key is read from the
/// environment on every call.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    /// Split system messages into the preamble and render the rest as a prompt.
    fn build_prompt(&self, messages: &[ChatMessage]) -> (Option<String>, String) {
        let mut preamble: Vec<&str> = self.config.system_prompt.iter().map(|s| s.as_str()).collect();
        let mut prompt = String::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => preamble.push(&msg.content),
                "user" => {
                    prompt.push_str(&format!("User: {}\n\n", msg.content));
                }
                "assistant" => {
                    prompt.push_str(&format!("Assistant: {}\n\n", msg.content));
                }
                _ => {
                    prompt.push_str(&format!("{}: {}\n\n", msg.role, msg.content));
                }
            }
        }

        let preamble = if preamble.is_empty() {
            None
        } else {
            Some(preamble.join("\n\n"))
        };
        (preamble, prompt)
    }

    /// The key to pass to Rig: the configured one, else the environment's.
    fn api_key(&self) -> Result<String> {
        if let Some(key) = &self.config.api_key {
            let key = key.expose_secret().trim();
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        let var = self.config.provider.key_var();
        match std::env::var(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(Error::not_configured(var)),
        }
    }

    async fn call(&self, preamble: Option<&str>, prompt: &str) -> Result<String> {
        let key = self.api_key()?;

        macro_rules! run_agent {
            ($provider:ident, $label:literal) => {{
                let client: rig::providers::$provider::Client =
                    rig::providers::$provider::Client::new(key.as_str())
                        .map_err(|e| Error::ModelProvider(format!("{} client error: {}", $label, e)))?;
                let mut builder = client.agent(&self.config.model);
                if let Some(system) = preamble {
                    builder = builder.preamble(system);
                }
                if let Some(temp) = self.config.temperature {
                    builder = builder.temperature(temp);
                }
                if let Some(max_tokens) = self.config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                let agent = builder.build();
                agent
                    .prompt(prompt)
                    .await
                    .map_err(|e| Error::ModelProvider(format!("{} error: {}", $label, e)))
            }};
        }

        match self.config.provider {
            RigProvider::Gemini => run_agent!(gemini, "Gemini"),
            RigProvider::OpenAI => run_agent!(openai, "OpenAI"),
            RigProvider::Anthropic => run_agent!(anthropic, "Anthropic"),
        }
    }

    async fn respond(&self, preamble: Option<&str>, prompt: &str) -> Result<LlmResponse> {
        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling LLM"
        );

        let response = self.call(preamble, prompt).await?;

        // Rough estimate: Rig's prompt API does not report usage.
        let prompt_tokens = (prompt.len() / 4) as u64;
        let completion_tokens = (response.len() / 4) as u64;
        track_tokens(&self.config.model, prompt_tokens, completion_tokens);

        Ok(LlmResponse {
            usage: LlmUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            content: response,
            finish_reason: "stop".to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.respond(self.config.system_prompt.as_deref(), prompt)
            .await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let (preamble, prompt) = self.build_prompt(messages);
        self.respond(preamble.as_deref(), &prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config() {
        let config = RigConfig::new(RigProvider::from_name("OpenAI"), "gpt-4o-mini");
        assert_eq!(config.provider, RigProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.system_prompt.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_explicit_key_wins_over_environment() {
        let config = RigConfig::new(RigProvider::Gemini, "gemini-2.5-flash")
            .with_api_key(Secret::new("request-key".into()));
        let client = RigLlmClient::new(config);
        assert_eq!(client.api_key().unwrap(), "request-key");
    }

    #[test]
    fn test_provider_from_name() {
        assert_eq!(RigProvider::from_name("Anthropic"), RigProvider::Anthropic);
        assert_eq!(RigProvider::from_name("gemini"), RigProvider::Gemini);
        assert_eq!(RigProvider::from_name("unknown"), RigProvider::Gemini);
        assert_eq!(RigProvider::OpenAI.key_var(), "OPENAI_API_KEY");
    }

    #[test]
    fn test_build_prompt() {
        let mut config = RigConfig::new(RigProvider::Gemini, "gemini-2.5-flash");
        config.system_prompt = Some("Answer briefly".into());
        let client = RigLlmClient::new(config);

        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Hi"),
        ];

        let (preamble, prompt) = client.build_prompt(&messages);
        assert_eq!(preamble.as_deref(), Some("Answer briefly\n\nYou are helpful"));
        assert!(prompt.contains("User: Hello"));
        assert!(prompt.contains("Assistant: Hi"));
        assert!(!prompt.contains("You are helpful"));
    }
}
