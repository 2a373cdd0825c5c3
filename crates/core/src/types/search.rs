use serde::{Deserialize, Serialize};
use std::fmt;

/// Web search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
    #[serde(rename = "serpapi")]
    SerpApi,
}

impl SearchEngine {
    /// Parse an engine name. Unknown names select DuckDuckGo.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "serpapi" => Self::SerpApi,
            _ => Self::DuckDuckGo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "duckduckgo",
            Self::SerpApi => "serpapi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::SerpApi => "SerpAPI",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One web search hit, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
        }
    }
}

/// Answer produced by an LLM with live web grounding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub text: String,
    /// Source page URLs reported by the grounding metadata.
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_name() {
        assert_eq!(SearchEngine::from_name("serpapi"), SearchEngine::SerpApi);
        assert_eq!(SearchEngine::from_name(" SerpAPI "), SearchEngine::SerpApi);
        assert_eq!(SearchEngine::from_name("bing"), SearchEngine::DuckDuckGo);
        assert_eq!(SearchEngine::DuckDuckGo.display_name(), "DuckDuckGo");
    }
}
