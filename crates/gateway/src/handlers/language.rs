//! Translation and summarization routes.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use ai_agent_core::types::ToolEnvelope;
use ai_agent_skills::summarization::{Summary, SummaryOptions};
use ai_agent_skills::translation::{DetectedLanguage, SupportedLanguages, Translation};

use crate::error::{envelope, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_source")]
    pub source_lang: String,
    #[serde(default = "default_target")]
    pub target_lang: String,
}

fn default_source() -> String {
    "auto".into()
}

fn default_target() -> String {
    "en".into()
}

pub async fn translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslateRequest>,
) -> ApiResult<Json<ToolEnvelope<Translation>>> {
    envelope(
        state
            .translation
            .translate(&payload.text, &payload.source_lang, &payload.target_lang)
            .await,
    )
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

pub async fn detect_language(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DetectRequest>,
) -> ApiResult<Json<ToolEnvelope<DetectedLanguage>>> {
    envelope(state.translation.detect_language(&payload.text).await)
}

pub async fn languages(State(state): State<Arc<AppState>>) -> Json<ToolEnvelope<SupportedLanguages>> {
    Json(ToolEnvelope::ok(state.translation.supported_languages()))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub do_sample: Option<bool>,
}

impl SummarizeRequest {
    fn options(&self) -> SummaryOptions {
        let defaults = SummaryOptions::default();
        SummaryOptions {
            max_length: self.max_length.unwrap_or(defaults.max_length),
            min_length: self.min_length.unwrap_or(defaults.min_length),
            do_sample: self.do_sample.unwrap_or(defaults.do_sample),
        }
    }
}

pub async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SummarizeRequest>,
) -> ApiResult<Json<ToolEnvelope<Summary>>> {
    envelope(state.summarization.summarize(&payload.text, payload.options()).await)
}
