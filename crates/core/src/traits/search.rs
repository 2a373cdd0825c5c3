//! Web search traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GroundedAnswer, SearchEngine, SearchResult};

/// A single web search provider.
///
/// Backends return results in provider order. Retrying and formatting are
/// the caller's job.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Engine served by this backend.
    fn engine(&self) -> SearchEngine;

    /// Run one search call.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

/// LLM answer grounded on live web search (Gemini `google_search` tool).
#[async_trait]
pub trait GroundedSearch: Send + Sync {
    async fn grounded_answer(&self, query: &str) -> Result<GroundedAnswer>;
}
