//! Chat routes: feature chat, search-aware chat, and the tool-using agent.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use ai_agent_core::{traits::strip_code_fence, Error};
use ai_agent_skills::web_search::DEFAULT_MAX_RESULTS;
use ai_agent_skills::AgentReply;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Words that suggest live data is needed when the LLM decision is unusable.
pub const SEARCH_KEYWORDS: &[&str] = &["news", "today", "current", "price", "latest", "weather", "update"];

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub feature: String,
    #[serde(default)]
    pub search_engine: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub status: &'static str,
}

/// `search` returns formatted results, `math` the JSON-encoded computation,
/// anything else a plain LLM completion.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let response = match payload.feature.as_str() {
        "search" => {
            state
                .search
                .search_formatted(
                    &payload.message,
                    payload.search_engine.as_deref(),
                    DEFAULT_MAX_RESULTS,
                )
                .await
        }
        "math" => {
            let result = state.wolfram.compute(&payload.message).await;
            serde_json::to_string(&result).map_err(Error::from)?
        }
        _ => state.llm.complete(&payload.message).await?.content,
    };

    Ok(Json(ChatResponse {
        response,
        status: "success",
    }))
}

// =============================================================================
// Smart chat
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SmartChatRequest {
    pub message: String,
    /// `google` (grounded), `duckduckgo` or `serpapi`.
    #[serde(default = "default_smart_engine")]
    pub search_engine: String,
}

fn default_smart_engine() -> String {
    "google".to_string()
}

#[derive(Debug, Serialize)]
pub struct SmartChatResponse {
    pub response: String,
    pub status: &'static str,
    pub search_performed: bool,
    pub search_engine: Option<String>,
}

fn decision_prompt(message: &str) -> String {
    format!(
        r#"Analyze the following question and decide whether a web search is needed to answer it.

Question: {message}

Answer EXACTLY in this JSON format with no other text:
{{"need_search": true/false, "reason": "short reason"}}

Search is needed (need_search: true) for:
- News, current events, market prices
- Frequently updated data (weather, gold or bitcoin prices, stocks)
- Recent events and trends
- Specific facts about products, places or public figures

Search is NOT needed (need_search: false) for:
- General knowledge and definitions
- Math calculations
- Philosophical questions or opinions
- General advice that needs no specific data"#
    )
}

fn direct_answer_prompt(message: &str) -> String {
    format!(
        "Answer the following question in a detailed and helpful way:\n\n{}\n\n\
         Use your own knowledge and format the answer in Markdown.\n\nAnswer:",
        message
    )
}

fn search_answer_prompt(message: &str, results: &str) -> String {
    format!(
        "Using the search results below, answer the question in a detailed and helpful way.\n\n\
         Question: {}\n\nSearch results:\n{}\n\n\
         Summarize the relevant information, answer the question directly, \
         add analysis or advice when asked, and format the answer in Markdown.\n\nAnswer:",
        message, results
    )
}

/// Read `need_search` from an LLM decision. `None` when the reply is not JSON.
pub fn parse_search_decision(reply: &str) -> Option<bool> {
    let decision: Value = serde_json::from_str(strip_code_fence(reply)).ok()?;
    Some(decision.get("need_search").and_then(Value::as_bool).unwrap_or(false))
}

pub fn needs_search_by_keywords(message: &str) -> bool {
    let lower = message.to_lowercase();
    SEARCH_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub async fn smart_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SmartChatRequest>,
) -> ApiResult<Json<SmartChatResponse>> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let need_search = match state.llm.complete(&decision_prompt(message)).await {
        Ok(reply) => parse_search_decision(&reply.content).unwrap_or_else(|| {
            tracing::debug!("Search decision was not JSON, using keyword fallback");
            needs_search_by_keywords(message)
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Search decision failed, using keyword fallback");
            needs_search_by_keywords(message)
        }
    };

    if !need_search {
        let answer = state.llm.complete(&direct_answer_prompt(message)).await?;
        return Ok(Json(SmartChatResponse {
            response: answer.content,
            status: "success",
            search_performed: false,
            search_engine: None,
        }));
    }

    let engine = payload.search_engine.trim().to_lowercase();
    if engine == "google" {
        match &state.grounded {
            Some(grounded) => {
                let answer = grounded.grounded_answer(message).await?;
                tracing::info!(sources = answer.sources.len(), "Grounded answer produced");
                return Ok(Json(SmartChatResponse {
                    response: answer.text,
                    status: "success",
                    search_performed: true,
                    search_engine: Some("google".into()),
                }));
            }
            None => tracing::warn!("Grounded search is not configured, using web search"),
        }
    }

    let requested = (engine != "google").then_some(engine.as_str());
    let outcome = state.search.search(message, requested, DEFAULT_MAX_RESULTS).await;
    let answer = state
        .llm
        .complete(&search_answer_prompt(message, &outcome.formatted()))
        .await?;

    Ok(Json(SmartChatResponse {
        response: answer.content,
        status: "success",
        search_performed: true,
        search_engine: Some(outcome.engine.as_str().to_string()),
    }))
}

// =============================================================================
// Agent
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AgentChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub async fn agent_chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AgentChatRequest>,
) -> ApiResult<Json<AgentReply>> {
    let reply = state
        .agent
        .chat(&payload.message, payload.session_id.as_deref())
        .await?;
    Ok(Json(reply))
}

pub async fn clear_agent_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Json<Value> {
    let cleared = state.agent.clear_history(&session_id);
    Json(json!({
        "session_id": session_id,
        "cleared": cleared,
        "status": "success",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_decision() {
        assert_eq!(
            parse_search_decision("```json\n{\"need_search\": true, \"reason\": \"news\"}\n```"),
            Some(true)
        );
        assert_eq!(parse_search_decision("{\"reason\": \"none\"}"), Some(false));
        assert_eq!(parse_search_decision("I think yes"), None);
    }

    #[test]
    fn test_keyword_fallback() {
        assert!(needs_search_by_keywords("What is the gold PRICE today?"));
        assert!(!needs_search_by_keywords("Define entropy"));
    }
}
