//! Mock implementations of core traits for testing.
//!
//! Used by unit tests across the workspace and by the gateway integration
//! tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{
    traits::{ChatMessage, GroundedSearch, LlmClient, LlmResponse, LlmUsage, SearchBackend},
    types::{GroundedAnswer, SearchEngine, SearchResult},
    Error, Result,
};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses in order, cycling
/// through them when exhausted.
pub struct MockLlm {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
    fail: bool,
}

impl MockLlm {
    /// Create a new mock LLM with a queue of responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            prompts: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose every call fails with a provider error.
    pub fn failing() -> Self {
        Self {
            responses: Vec::new(),
            prompts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far; chat calls are flattened to `role: content` lines.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn respond(&self, prompt: String) -> Result<LlmResponse> {
        let idx = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt);
            prompts.len() - 1
        };
        if self.fail {
            return Err(Error::ModelProvider("mock failure".into()));
        }
        let content = self
            .responses
            .get(idx % self.responses.len().max(1))
            .cloned()
            .unwrap_or_default();
        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.respond(prompt.to_string())
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let flattened = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        self.respond(flattened)
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

// =============================================================================
// Mock Search Backend
// =============================================================================

/// Search backend that replays a script of outcomes, one per call.
///
/// Once the script is exhausted every further call returns no results.
pub struct ScriptedSearchBackend {
    engine: SearchEngine,
    script: Mutex<VecDeque<Result<Vec<SearchResult>>>>,
    calls: Mutex<usize>,
}

impl ScriptedSearchBackend {
    pub fn new(engine: SearchEngine, script: Vec<Result<Vec<SearchResult>>>) -> Self {
        Self {
            engine,
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    /// Backend that always returns the same results.
    pub fn always(results: Vec<SearchResult>) -> Self {
        Self::new(SearchEngine::DuckDuckGo, vec![Ok(results)])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearchBackend {
    fn engine(&self) -> SearchEngine {
        self.engine
    }

    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        *self.calls.lock().unwrap() += 1;
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().map(|r| match r {
                Ok(results) => Ok(results.clone()),
                Err(e) => Err(Error::upstream("mock", e.to_string())),
            })
        };
        match next {
            Some(Ok(mut results)) => {
                results.truncate(max_results);
                Ok(results)
            }
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

// =============================================================================
// Mock Grounded Search
// =============================================================================

/// Grounded search that echoes the query.
#[derive(Default)]
pub struct MockGroundedSearch;

#[async_trait]
impl GroundedSearch for MockGroundedSearch {
    async fn grounded_answer(&self, query: &str) -> Result<GroundedAnswer> {
        Ok(GroundedAnswer {
            text: format!("Grounded answer for: {}", query),
            sources: vec!["https://example.com".into()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_cycles_responses() {
        let llm = MockLlm::new(vec!["a".into(), "b".into()]);
        assert_eq!(llm.complete("1").await.unwrap().content, "a");
        assert_eq!(llm.complete("2").await.unwrap().content, "b");
        assert_eq!(llm.complete("3").await.unwrap().content, "a");
        assert_eq!(llm.prompts(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_scripted_backend_replays_then_repeats_last() {
        let hit = SearchResult::new("t", "l", "s");
        let backend = ScriptedSearchBackend::new(
            SearchEngine::DuckDuckGo,
            vec![Ok(vec![]), Ok(vec![hit.clone()])],
        );
        assert!(backend.search("q", 5).await.unwrap().is_empty());
        assert_eq!(backend.search("q", 5).await.unwrap(), vec![hit.clone()]);
        assert_eq!(backend.search("q", 5).await.unwrap(), vec![hit]);
        assert_eq!(backend.call_count(), 3);
    }
}
