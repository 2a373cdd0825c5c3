//! Image to LaTeX through a pix2tex HTTP API.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use ai_agent_core::{config::LatexOcrConfig, Error, Result};

use crate::http::{build_client, ensure_success};

const SERVICE: &str = "pix2tex";

#[derive(Debug, Clone, Serialize)]
pub struct LatexResult {
    pub latex_code: String,
    pub message: String,
}

pub struct LatexOcrTool {
    client: reqwest::Client,
    api_url: String,
}

impl LatexOcrTool {
    pub fn new(config: &LatexOcrConfig, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            api_url: config.api_url.clone(),
        }
    }

    pub async fn image_to_latex(&self, image: Vec<u8>, file_name: &str) -> Result<LatexResult> {
        if image.is_empty() {
            return Err(Error::invalid_request("Image file is empty"));
        }
        let part = reqwest::multipart::Part::bytes(image).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::upstream(SERVICE, "Cannot connect to pix2tex API. Is the service running?")
                } else if e.is_timeout() {
                    Error::Timeout("Request timeout. Image may be too large or complex.".into())
                } else {
                    Error::upstream(SERVICE, e.to_string())
                }
            })?;
        let body = ensure_success(SERVICE, response)
            .await?
            .text()
            .await
            .map_err(|e| Error::upstream(SERVICE, e.to_string()))?;

        let latex_code = parse_latex_body(&body);
        tracing::info!(chars = latex_code.len(), "LaTeX extracted");
        Ok(LatexResult {
            latex_code,
            message: "LaTeX code extracted successfully".into(),
        })
    }
}

/// The API answers with a JSON string; fall back to the raw text, unquoted.
pub fn parse_latex_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => body.trim().trim_matches('"').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latex_body() {
        assert_eq!(parse_latex_body(r#""\\frac{a}{b}""#), r"\frac{a}{b}");
        assert_eq!(parse_latex_body("  \"x^2\n"), "x^2");
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let tool = LatexOcrTool::new(&LatexOcrConfig::default(), Duration::from_secs(1));
        assert!(tool.image_to_latex(Vec::new(), "a.png").await.unwrap_err().is_client_error());
    }
}
