//! Hugging Face Inference API client shared by the summarization, vision and
//! ASR adapters.

use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::time::Duration;

use ai_agent_core::{config::HuggingFaceConfig, Error, Result};

use crate::http::{build_client, ensure_success, transport_error};

const SERVICE: &str = "Hugging Face";

#[derive(Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    api_token: Option<Secret<String>>,
    base_url: String,
}

impl HuggingFaceClient {
    pub fn new(config: &HuggingFaceConfig, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_token: config.api_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_token.is_some()
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    fn token(&self) -> Result<&str> {
        self.api_token
            .as_ref()
            .map(|t| t.expose_secret().as_str())
            .ok_or_else(|| Error::not_configured("HF_API_TOKEN"))
    }

    /// POST a JSON payload to a model endpoint.
    pub async fn post_json(&self, model: &str, body: &Value) -> Result<Value> {
        let token = self.token()?;
        tracing::debug!(model = %model, "Calling Hugging Face inference");

        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid response: {}", e)))
    }

    /// POST raw bytes (audio or image) to a model endpoint.
    pub async fn post_bytes(&self, model: &str, data: Vec<u8>, content_type: &str) -> Result<Value> {
        let token = self.token()?;
        tracing::debug!(model = %model, size = data.len(), "Calling Hugging Face inference with binary payload");

        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let response = ensure_success(SERVICE, response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::upstream(SERVICE, format!("Invalid response: {}", e)))
    }
}

/// Pull a string field out of either an object or the first element of an array.
///
/// Inference endpoints answer with `{"text": ..}` or `[{"answer": ..}]`
/// depending on the task.
pub fn first_field(value: &Value, field: &str) -> Option<String> {
    let target = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    target.get(field)?.as_str().map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_field() {
        assert_eq!(
            first_field(&json!([{ "summary_text": " short " }]), "summary_text").as_deref(),
            Some("short")
        );
        assert_eq!(first_field(&json!({ "text": "hi" }), "text").as_deref(), Some("hi"));
        assert_eq!(first_field(&json!([]), "text"), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let client = HuggingFaceClient::new(&HuggingFaceConfig::default(), Duration::from_secs(1));
        assert!(!client.is_configured());
        let err = client.post_json("m", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }
}
