//! Direct Gemini REST client for features Rig does not expose:
//! Google Search grounding and image output.

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use std::time::Duration;

use ai_agent_core::{traits::GroundedSearch, types::GroundedAnswer, Error, Result};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiRestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    text_model: String,
    image_model: String,
}

impl GeminiRestClient {
    pub fn new(api_key: Secret<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key,
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
        }
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Raw `models/{model}:generateContent` call.
    pub async fn generate_content(&self, model: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream("Gemini", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::upstream("Gemini", format!("HTTP {}: {}", status, text)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::upstream("Gemini", e.to_string()))
    }

    /// Generate a single image from a text prompt. Returns PNG/JPEG bytes.
    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });
        let response = self.generate_content(&self.image_model, &body).await?;
        let encoded = extract_inline_image(&response)
            .ok_or_else(|| Error::upstream("Gemini", "No image data in response"))?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::upstream("Gemini", format!("Invalid image data: {}", e)))
    }
}

#[async_trait]
impl GroundedSearch for GeminiRestClient {
    async fn grounded_answer(&self, query: &str) -> Result<GroundedAnswer> {
        let body = json!({
            "contents": [{ "parts": [{ "text": query }] }],
            "tools": [{ "google_search": {} }]
        });
        let response = self.generate_content(&self.text_model, &body).await?;
        let answer = GroundedAnswer {
            text: extract_text(&response),
            sources: extract_sources(&response),
        };
        tracing::debug!(sources = answer.sources.len(), "Grounded answer received");
        Ok(answer)
    }
}

fn first_candidate_parts(response: &Value) -> impl Iterator<Item = &Value> {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &Value) -> String {
    first_candidate_parts(response)
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// Base64 payload of the first inline image part.
pub fn extract_inline_image(response: &Value) -> Option<&str> {
    first_candidate_parts(response).find_map(|p| {
        p.get("inlineData")
            .or_else(|| p.get("inline_data"))
            .and_then(|d| d.get("data"))
            .and_then(Value::as_str)
    })
}

/// Web source URIs from grounding metadata.
pub fn extract_sources(response: &Value) -> Vec<String> {
    response
        .pointer("/candidates/0/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|c| c.pointer("/web/uri").and_then(Value::as_str))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_and_sources() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Gold is " }, { "text": "up today." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "A" } },
                        { "web": { "uri": "https://b.example", "title": "B" } }
                    ]
                }
            }]
        });
        assert_eq!(extract_text(&response), "Gold is up today.");
        assert_eq!(
            extract_sources(&response),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_extract_inline_image() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here you go" },
                    { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                ] }
            }]
        });
        assert_eq!(extract_inline_image(&response), Some("aGVsbG8="));
        assert_eq!(extract_inline_image(&json!({})), None);
        assert!(extract_sources(&json!({})).is_empty());
    }
}
