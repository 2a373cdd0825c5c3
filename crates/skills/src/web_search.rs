//! Web search over DuckDuckGo and SerpAPI with fixed-delay retries.
//!
//! Exactly one backend serves each request. Results keep backend order and
//! are only truncated to the requested count.

use async_trait::async_trait;
use regex::Regex;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use ai_agent_core::{
    config::{RetryConfig, SearchConfig},
    traits::SearchBackend,
    types::{SearchEngine, SearchResult},
    Error, Result,
};

use crate::http::{ensure_success, transport_error};

pub const DEFAULT_MAX_RESULTS: usize = 5;

// =============================================================================
// Retry Policy
// =============================================================================

/// Fixed-count, fixed-delay retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait after an attempt that returned no results.
    pub empty_delay: Duration,
    /// Wait after an attempt that failed.
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            empty_delay: Duration::from_millis(cfg.empty_delay_ms),
            error_delay: Duration::from_millis(cfg.error_delay_ms),
        }
    }
}

/// Call `backend` until it returns a non-empty result set or the attempts
/// run out. Errors are logged and swallowed; exhaustion yields an empty list.
pub async fn search_with_retry(
    backend: &dyn SearchBackend,
    policy: &RetryPolicy,
    query: &str,
    max_results: usize,
) -> Vec<SearchResult> {
    let engine = backend.engine();
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let last = attempt == attempts;
        match backend.search(query, max_results).await {
            Ok(mut results) if !results.is_empty() => {
                results.truncate(max_results);
                tracing::info!(%engine, attempt, count = results.len(), "Search succeeded");
                return results;
            }
            Ok(_) => {
                tracing::warn!(%engine, attempt, attempts, "Search returned no results");
                if !last {
                    tokio::time::sleep(policy.empty_delay).await;
                }
            }
            Err(e) => {
                tracing::warn!(%engine, attempt, attempts, error = %e, "Search attempt failed");
                if !last {
                    tokio::time::sleep(policy.error_delay).await;
                }
            }
        }
    }

    tracing::warn!(%engine, query = %query, "Search exhausted all attempts");
    Vec::new()
}

// =============================================================================
// Formatting
// =============================================================================

/// Numbered text rendering of a result list, or the no-results message.
pub fn format_results(engine: SearchEngine, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!(
            "No results found from {}.\n\n\
             Possible causes:\n\
             - The query is too specific or complex\n\
             - Temporary rate limiting\n\
             - Network connectivity issues\n\n\
             Tip: rephrase the question or use SerpAPI (if configured).",
            engine.display_name()
        );
    }

    let mut out = format!("Search results (using {}):\n\n", engine.display_name());
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("**{}. {}**\n", i + 1, result.title));
        out.push_str(&format!("Link: {}\n", result.link));
        out.push_str(&format!("Snippet: {}\n\n", result.snippet));
    }
    out
}

// =============================================================================
// Search Service
// =============================================================================

/// Outcome of one search request.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Engine that actually served the request.
    pub engine: SearchEngine,
    pub results: Vec<SearchResult>,
}

impl SearchOutcome {
    pub fn formatted(&self) -> String {
        format_results(self.engine, &self.results)
    }
}

/// Engine selection plus retry over the configured backends.
pub struct WebSearchTool {
    backends: HashMap<SearchEngine, Arc<dyn SearchBackend>>,
    default_engine: SearchEngine,
    policy: RetryPolicy,
}

impl WebSearchTool {
    pub fn new(default_engine: SearchEngine, policy: RetryPolicy) -> Self {
        Self {
            backends: HashMap::new(),
            default_engine,
            policy,
        }
    }

    /// DuckDuckGo always; SerpAPI when a key is configured.
    pub fn from_config(config: &SearchConfig, client: reqwest::Client) -> Self {
        let mut tool = Self::new(
            SearchEngine::from_name(&config.default_engine),
            RetryPolicy::from(&config.retry),
        );
        tool = tool.with_backend(Arc::new(DuckDuckGoBackend::new(client.clone(), config)));
        if let Some(key) = &config.serpapi_key {
            tool = tool.with_backend(Arc::new(SerpApiBackend::new(client, key.clone(), config)));
        }
        tool
    }

    pub fn with_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backends.insert(backend.engine(), backend);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn is_available(&self, engine: SearchEngine) -> bool {
        self.backends.contains_key(&engine)
    }

    /// Resolve a requested engine name to a registered backend.
    fn select(&self, engine: Option<&str>) -> Result<&Arc<dyn SearchBackend>> {
        let wanted = engine
            .map(SearchEngine::from_name)
            .unwrap_or(self.default_engine);

        if let Some(backend) = self.backends.get(&wanted) {
            return Ok(backend);
        }
        tracing::warn!(requested = %wanted, "Search engine not configured, falling back to DuckDuckGo");
        self.backends
            .get(&SearchEngine::DuckDuckGo)
            .ok_or_else(|| Error::not_configured("Web search"))
    }

    /// Search with retries. Never fails: exhaustion is an empty result list.
    pub async fn search(&self, query: &str, engine: Option<&str>, max_results: usize) -> SearchOutcome {
        let backend = match self.select(engine) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(error = %e, "No search backend available");
                return SearchOutcome {
                    engine: SearchEngine::DuckDuckGo,
                    results: Vec::new(),
                };
            }
        };
        let results = search_with_retry(backend.as_ref(), &self.policy, query, max_results).await;
        SearchOutcome {
            engine: backend.engine(),
            results,
        }
    }

    /// Search and render as text.
    pub async fn search_formatted(&self, query: &str, engine: Option<&str>, max_results: usize) -> String {
        self.search(query, engine, max_results).await.formatted()
    }
}

// =============================================================================
// DuckDuckGo Backend
// =============================================================================

/// Scrapes the DuckDuckGo HTML endpoint.
pub struct DuckDuckGoBackend {
    client: reqwest::Client,
    url: String,
    region: String,
    safesearch: String,
    time_limit: Option<String>,
}

impl DuckDuckGoBackend {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            url: config.duckduckgo_url.clone(),
            region: config.region.clone(),
            safesearch: config.safesearch.clone(),
            time_limit: config.time_limit.clone(),
        }
    }

    fn safesearch_param(&self) -> &'static str {
        match self.safesearch.as_str() {
            "on" | "strict" => "1",
            "off" => "-2",
            _ => "-1",
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoBackend {
    fn engine(&self) -> SearchEngine {
        SearchEngine::DuckDuckGo
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let mut params = vec![
            ("q", query.to_string()),
            ("kl", self.region.clone()),
            ("kp", self.safesearch_param().to_string()),
        ];
        if let Some(df) = &self.time_limit {
            params.push(("df", df.clone()));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| transport_error("DuckDuckGo", e))?;
        let html = ensure_success("DuckDuckGo", response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error("DuckDuckGo", e))?;

        let mut results = parse_duckduckgo_html(&html);
        results.truncate(max_results);
        Ok(results)
    }
}

fn result_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a\s[^>]*class="[^"]*result__a[^"]*"[^>]*>(.*?)</a>"#).expect("static regex")
    })
}

fn href_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"href="([^"]*)""#).expect("static regex"))
}

fn snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<(?:a|div|td)\s[^>]*class="[^"]*result__snippet[^"]*"[^>]*>(.*?)</(?:a|div|td)>"#)
            .expect("static regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

/// Extract `(title, link, snippet)` triples from the HTML result page.
///
/// Snippets are paired with titles by position. Sponsored links are skipped.
pub fn parse_duckduckgo_html(html: &str) -> Vec<SearchResult> {
    let snippets: Vec<String> = snippet_re()
        .captures_iter(html)
        .map(|c| clean_html_text(&c[1]))
        .collect();

    result_link_re()
        .captures_iter(html)
        .enumerate()
        .filter_map(|(i, caps)| {
            let tag = caps.get(0)?.as_str();
            let href = href_re().captures(tag)?.get(1)?.as_str();
            let link = decode_result_link(&decode_entities(href))?;
            let title = clean_html_text(&caps[1]);
            if title.is_empty() {
                return None;
            }
            let snippet = snippets.get(i).cloned().unwrap_or_default();
            Some(SearchResult::new(title, link, snippet))
        })
        .collect()
}

/// Resolve DuckDuckGo redirect links (`/l/?uddg=...`) to the target URL.
fn decode_result_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };
    let parsed = url::Url::parse(&absolute).ok()?;

    let is_ddg = parsed
        .host_str()
        .map(|h| h.ends_with("duckduckgo.com"))
        .unwrap_or(false);
    if !is_ddg {
        return Some(absolute);
    }
    if parsed.path().starts_with("/y.js") {
        return None;
    }
    parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
}

fn clean_html_text(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, "");
    decode_entities(stripped.trim())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

// =============================================================================
// SerpAPI Backend
// =============================================================================

/// Google results through SerpAPI.
pub struct SerpApiBackend {
    client: reqwest::Client,
    api_key: Secret<String>,
    url: String,
    timeout: Duration,
}

impl SerpApiBackend {
    pub fn new(client: reqwest::Client, api_key: Secret<String>, config: &SearchConfig) -> Self {
        Self {
            client,
            api_key,
            url: config.serpapi_url.clone(),
            timeout: Duration::from_secs(config.serpapi_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiOrganic>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchBackend for SerpApiBackend {
    fn engine(&self) -> SearchEngine {
        SearchEngine::SerpApi
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let num = max_results.to_string();
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .query(&[
                ("q", query),
                ("api_key", self.api_key.expose_secret().as_str()),
                ("num", num.as_str()),
                ("engine", "google"),
            ])
            .send()
            .await
            .map_err(|e| transport_error("SerpAPI", e))?;

        let body: SerpApiResponse = ensure_success("SerpAPI", response)
            .await?
            .json()
            .await
            .map_err(|e| transport_error("SerpAPI", e))?;

        if let Some(error) = body.error {
            // "Google hasn't returned any results" is an empty page, not a failure.
            if body.organic_results.is_empty() && error.contains("hasn't returned any results") {
                return Ok(Vec::new());
            }
            return Err(Error::upstream("SerpAPI", error));
        }

        Ok(body
            .organic_results
            .into_iter()
            .take(max_results)
            .map(|r| SearchResult::new(r.title, r.link, r.snippet))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_agent_core::mocks::ScriptedSearchBackend;
    use tokio::time::Instant;

    fn hit(n: usize) -> SearchResult {
        SearchResult::new(format!("Title {}", n), format!("https://site{}.example", n), "snippet")
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_results() {
        let backend = ScriptedSearchBackend::new(
            SearchEngine::DuckDuckGo,
            vec![Ok(vec![]), Ok(vec![]), Ok(vec![hit(1)])],
        );
        let start = Instant::now();

        let results = search_with_retry(&backend, &policy(), "rust", 5).await;

        assert_eq!(results, vec![hit(1)]);
        assert_eq!(backend.call_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_errors_exhaust_attempts_without_trailing_sleep() {
        let backend = ScriptedSearchBackend::new(
            SearchEngine::SerpApi,
            vec![Err(Error::upstream("SerpAPI", "HTTP 500"))],
        );
        let start = Instant::now();

        let results = search_with_retry(&backend, &policy(), "rust", 5).await;

        assert!(results.is_empty());
        assert_eq!(backend.call_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_truncated_in_order() {
        let backend = ScriptedSearchBackend::new(
            SearchEngine::DuckDuckGo,
            vec![Ok((1..=8).map(hit).collect())],
        );
        let results = search_with_retry(&backend, &policy(), "q", 3).await;
        assert_eq!(results, vec![hit(1), hit(2), hit(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tool_falls_back_to_duckduckgo() {
        let ddg = Arc::new(ScriptedSearchBackend::always(vec![hit(1)]));
        let tool = WebSearchTool::new(SearchEngine::DuckDuckGo, policy()).with_backend(ddg.clone());

        let outcome = tool.search("q", Some("serpapi"), 5).await;
        assert_eq!(outcome.engine, SearchEngine::DuckDuckGo);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(ddg.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_results_message_names_engine() {
        let tool = WebSearchTool::new(SearchEngine::DuckDuckGo, policy())
            .with_backend(Arc::new(ScriptedSearchBackend::always(vec![])));
        let text = tool.search_formatted("q", None, 5).await;
        assert!(text.starts_with("No results found from DuckDuckGo."));
    }

    #[test]
    fn test_format_results() {
        let text = format_results(SearchEngine::SerpApi, &[hit(1), hit(2)]);
        assert!(text.starts_with("Search results (using SerpAPI):"));
        assert!(text.contains("**1. Title 1**\nLink: https://site1.example\nSnippet: snippet"));
        assert!(text.contains("**2. Title 2**"));
    }

    #[test]
    fn test_parse_duckduckgo_html() {
        let html = r#"
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust <b>Programming</b> Language</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A language empowering everyone &amp; more.</a>
</div>
<div class="result results_links web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
  </h2>
  <a class="result__snippet" href="https://doc.rust-lang.org/book/">Learn Rust.</a>
</div>
"#;
        let results = parse_duckduckgo_html(html);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].link, "https://www.rust-lang.org/");
        assert_eq!(results[0].snippet, "A language empowering everyone & more.");
        assert_eq!(results[1].link, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let cfg = RetryConfig {
            max_attempts: 0,
            empty_delay_ms: 10,
            error_delay_ms: 20,
        };
        let policy = RetryPolicy::from(&cfg);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.error_delay, Duration::from_millis(20));
    }
}
