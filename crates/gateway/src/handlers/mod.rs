//! Route handlers, grouped by feature area.

pub mod chat;
pub mod data;
pub mod language;
pub mod local_llm;
pub mod media;
pub mod tools;

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use ai_agent_core::types::SearchEngine;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const FEATURES: &[&str] = &[
    "search",
    "math",
    "data_analysis",
    "translation",
    "summarization",
    "speech",
    "vision",
    "latex_ocr",
    "image_generation",
    "video_generation",
    "slides",
    "local_llm",
    "agent",
];

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "AI Agent API",
        "version": env!("CARGO_PKG_VERSION"),
        "features": FEATURES,
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "gemini_configured": state.config.llm.gemini_api_key.is_some(),
        "wolfram_configured": state.wolfram.is_configured(),
        "serpapi_configured": state.search.is_available(SearchEngine::SerpApi),
        "llm_model": state.llm.model_name(),
    }))
}

// =============================================================================
// Multipart
// =============================================================================

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub data: Bytes,
}

/// A fully buffered multipart body: file parts plus plain text fields.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(String::from) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(malformed)?;
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        data,
                    });
                }
                None => {
                    let text = field.text().await.map_err(malformed)?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// First file uploaded under any of `names`.
    pub fn take_file(&mut self, names: &[&str]) -> ApiResult<UploadedFile> {
        let idx = self
            .files
            .iter()
            .position(|f| names.contains(&f.field.as_str()))
            .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
        Ok(self.files.remove(idx))
    }

    /// Non-empty text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(self.field(name), Some("true" | "1" | "yes" | "on"))
    }
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed multipart body: {}", err))
}
