//! Model playground routes.
//!
//! `use_api` selects a Gemini model per request, keyed by the caller's API
//! key or the configured one; otherwise the server's configured model
//! answers. Sampling settings only apply to the Gemini path.

use axum::extract::State;
use axum::Json;
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ai_agent_core::{traits::LlmClient, types::ToolEnvelope, Error, Result};
use ai_agent_model_gateway::{RigConfig, RigLlmClient, RigProvider};
use ai_agent_skills::slides::TopicDeck;

use crate::error::{envelope, ApiError, ApiResult};
use crate::state::AppState;

type Envelope<T> = ApiResult<Json<ToolEnvelope<T>>>;

pub const DEFAULT_API_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Deserialize)]
pub struct LocalLlmRequest {
    pub message: String,
    #[serde(default = "default_max_length")]
    pub max_length: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub use_api: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

fn default_max_length() -> u64 {
    2048
}

fn default_temperature() -> f64 {
    0.7
}

#[derive(Debug, Serialize)]
pub struct LocalLlmReply {
    pub response: String,
    pub model: String,
    /// `cloud` for the Gemini path, `server` for the configured model.
    pub device: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TopicSlidesRequest {
    pub topic: String,
    #[serde(default = "default_topic_slides")]
    pub num_slides: usize,
    #[serde(default)]
    pub use_api: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
}

fn default_topic_slides() -> usize {
    5
}

/// Gemini client for one request. A non-blank request key wins over the
/// configured key.
fn gemini_client(
    state: &AppState,
    api_key: Option<&str>,
    model_name: Option<&str>,
    temperature: f64,
    max_tokens: Option<u64>,
) -> Result<RigLlmClient> {
    let key = match api_key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => Secret::new(key.to_string()),
        None => state
            .config
            .llm
            .gemini_api_key
            .clone()
            .ok_or_else(|| Error::not_configured("Gemini API key"))?,
    };
    let model = model_name
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_API_MODEL);

    let mut config = RigConfig::new(RigProvider::Gemini, model).with_api_key(key);
    config.temperature = Some(temperature);
    config.max_tokens = max_tokens;
    Ok(RigLlmClient::new(config))
}

pub async fn local_llm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocalLlmRequest>,
) -> Envelope<LocalLlmReply> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }
    if payload.max_length == 0 {
        return Err(ApiError::bad_request("max_length must be at least 1"));
    }
    if !(0.0..=2.0).contains(&payload.temperature) {
        return Err(ApiError::bad_request("temperature must be between 0 and 2"));
    }

    let result = if payload.use_api {
        match gemini_client(
            &state,
            payload.api_key.as_deref(),
            payload.model_name.as_deref(),
            payload.temperature,
            Some(payload.max_length),
        ) {
            Ok(client) => complete(&client, &payload.message, "cloud").await,
            Err(e) => Err(e),
        }
    } else {
        complete(state.llm.as_ref(), &payload.message, "server").await
    };
    envelope(result)
}

async fn complete(
    llm: &dyn LlmClient,
    message: &str,
    device: &'static str,
) -> Result<LocalLlmReply> {
    let response = llm.complete(message).await?;
    Ok(LocalLlmReply {
        response: response.content,
        model: llm.model_name().to_string(),
        device,
    })
}

pub async fn create_topic_slides(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TopicSlidesRequest>,
) -> Envelope<TopicDeck> {
    tracing::info!(topic = %payload.topic, num_slides = payload.num_slides, use_api = payload.use_api, "Creating topic slides");
    let result = if payload.use_api {
        match gemini_client(
            &state,
            payload.api_key.as_deref(),
            payload.model_name.as_deref(),
            default_temperature(),
            None,
        ) {
            Ok(client) => {
                state
                    .slides
                    .create_presentation_slides(&client, &payload.topic, payload.num_slides)
                    .await
            }
            Err(e) => Err(e),
        }
    } else {
        state
            .slides
            .create_presentation_slides(state.llm.as_ref(), &payload.topic, payload.num_slides)
            .await
    };
    envelope(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: LocalLlmRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(request.max_length, 2048);
        assert_eq!(request.temperature, 0.7);
        assert!(!request.use_api);

        let slides: TopicSlidesRequest = serde_json::from_str(r#"{"topic": "Rust"}"#).unwrap();
        assert_eq!(slides.num_slides, 5);
        assert!(slides.model_name.is_none());
    }
}
