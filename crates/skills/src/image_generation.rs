//! Clipdrop text-to-image.

use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

use ai_agent_core::{config::ImageGenerationConfig, Error, Result};

use crate::http::{build_client, ensure_success, transport_error, unix_timestamp};
use crate::storage::FileStore;

const SERVICE: &str = "Clipdrop";

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub image_path: String,
    pub file_name: String,
    pub message: String,
}

pub struct ImageGenerationTool {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    base_url: String,
    store: FileStore,
}

impl ImageGenerationTool {
    pub fn new(config: &ImageGenerationConfig, store: FileStore, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_key: config.clipdrop_api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn text_to_image(&self, prompt: &str) -> Result<GeneratedImage> {
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request("Prompt must not be empty"));
        }
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::not_configured("CLIPDROP_API_KEY"))?;

        let part = reqwest::multipart::Part::text(prompt.to_string())
            .mime_str("text/plain")
            .map_err(|e| Error::internal(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("prompt", part);

        let response = self
            .client
            .post(format!("{}/text-to-image/v1", self.base_url))
            .header("x-api-key", api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        let image = ensure_success(SERVICE, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let file_name = format!("text_to_image_{}.png", unix_timestamp());
        let path = self.store.save_output(&file_name, &image).await?;
        tracing::info!(file = %file_name, bytes = image.len(), "Image generated");

        Ok(GeneratedImage {
            image_path: path.display().to_string(),
            file_name,
            message: format!("Image generated successfully from prompt: {}", prompt),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_prompt_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ImageGenerationTool::new(
            &ImageGenerationConfig::default(),
            FileStore::under(dir.path()),
            Duration::from_secs(1),
        );
        assert!(!tool.is_configured());
        assert!(tool.text_to_image("  ").await.unwrap_err().is_client_error());
        assert!(matches!(
            tool.text_to_image("a red fox").await.unwrap_err(),
            Error::NotConfigured(_)
        ));
    }
}
