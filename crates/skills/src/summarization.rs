//! Abstractive summarization via the Hugging Face Inference API.

use serde::Serialize;
use serde_json::json;

use ai_agent_core::{Error, Result};

use crate::huggingface::{first_field, HuggingFaceClient};

pub const MIN_INPUT_CHARS: usize = 50;
pub const MAX_INPUT_CHARS: usize = 3000;

#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub max_length: u32,
    pub min_length: u32,
    pub do_sample: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            max_length: 130,
            min_length: 30,
            do_sample: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
    pub compression_ratio: f64,
    pub truncated: bool,
    pub model: String,
}

pub struct SummarizationTool {
    client: HuggingFaceClient,
    model: String,
}

impl SummarizationTool {
    pub fn new(client: HuggingFaceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn summarize(&self, text: &str, options: SummaryOptions) -> Result<Summary> {
        let (input, truncated) = prepare_input(text)?;

        tracing::info!(chars = input.chars().count(), truncated, model = %self.model, "Summarizing text");

        let body = json!({
            "inputs": input,
            "parameters": {
                "max_length": options.max_length,
                "min_length": options.min_length,
                "do_sample": options.do_sample,
                "truncation": true
            }
        });
        let response = self.client.post_json(&self.model, &body).await?;
        let summary = first_field(&response, "summary_text")
            .ok_or_else(|| Error::upstream("Hugging Face", "Response contained no summary_text"))?;

        let original_length = input.chars().count();
        let summary_length = summary.chars().count();
        Ok(Summary {
            compression_ratio: compression_ratio(summary_length, original_length),
            summary,
            original_length,
            summary_length,
            truncated,
            model: self.model.clone(),
        })
    }
}

/// Validate and truncate input, returning the text to send and whether it was cut.
pub fn prepare_input(text: &str) -> Result<(&str, bool)> {
    if text.trim().chars().count() < MIN_INPUT_CHARS {
        return Err(Error::invalid_request(format!(
            "Text is too short to summarize. Please provide at least {} characters.",
            MIN_INPUT_CHARS
        )));
    }
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((cut, _)) => Ok((&text[..cut], true)),
        None => Ok((text, false)),
    }
}

/// Summary length as a percentage of the input, rounded to two decimals.
pub fn compression_ratio(summary_len: usize, original_len: usize) -> f64 {
    if original_len == 0 {
        return 0.0;
    }
    let ratio = summary_len as f64 / original_len as f64 * 100.0;
    (ratio * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_text() {
        let err = prepare_input("   too short   ").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let text = "é".repeat(MAX_INPUT_CHARS + 10);
        let (input, truncated) = prepare_input(&text).unwrap();
        assert!(truncated);
        assert_eq!(input.chars().count(), MAX_INPUT_CHARS);

        let text = "a".repeat(100);
        let (input, truncated) = prepare_input(&text).unwrap();
        assert!(!truncated);
        assert_eq!(input.len(), 100);
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1, 3), 33.33);
        assert_eq!(compression_ratio(50, 200), 25.0);
        assert_eq!(compression_ratio(5, 0), 0.0);
    }
}
