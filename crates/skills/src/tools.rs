//! Registry tools wrapping the adapters.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use ai_agent_core::{
    traits::{Tool, ToolRegistry},
    types::ToolOutput,
    Error, Result,
};

use crate::data_analysis::DataAnalysisTool;
use crate::storage::FileStore;
use crate::summarization::{SummarizationTool, SummaryOptions};
use crate::translation::TranslationTool;
use crate::web_search::{WebSearchTool, DEFAULT_MAX_RESULTS};
use crate::wolfram::WolframTool;

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::invalid_request(format!("'{}' is required", key)))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

// =============================================================================
// Web Search
// =============================================================================

pub struct WebSearch {
    search: Arc<WebSearchTool>,
}

impl WebSearch {
    pub fn new(search: Arc<WebSearchTool>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" },
                "search_engine": { "type": "string", "enum": ["duckduckgo", "serpapi"] },
                "max_results": { "type": "integer", "minimum": 1, "default": DEFAULT_MAX_RESULTS }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let query = required_str(&args, "query")?;
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let outcome = self
            .search
            .search(query, optional_str(&args, "search_engine"), max_results)
            .await;
        Ok(ToolOutput::text(outcome.formatted()).with_data(json!({
            "engine": outcome.engine.as_str(),
            "results": outcome.results,
        })))
    }
}

// =============================================================================
// Wolfram|Alpha
// =============================================================================

pub struct WolframAlpha {
    wolfram: Arc<WolframTool>,
}

impl WolframAlpha {
    pub fn new(wolfram: Arc<WolframTool>) -> Self {
        Self { wolfram }
    }
}

#[async_trait]
impl Tool for WolframAlpha {
    fn name(&self) -> &str {
        "wolfram_alpha"
    }

    fn description(&self) -> &str {
        "Compute math, science and unit questions with Wolfram|Alpha"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Expression or question" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let query = required_str(&args, "query")?;
        let result = self.wolfram.compute(query).await;
        Ok(ToolOutput::new(result.success, result.summary_text())
            .with_data(serde_json::to_value(&result)?))
    }
}

// =============================================================================
// CSV
// =============================================================================

pub struct CsvLoad {
    data: Arc<DataAnalysisTool>,
    store: FileStore,
}

impl CsvLoad {
    pub fn new(data: Arc<DataAnalysisTool>, store: FileStore) -> Self {
        Self { data, store }
    }
}

#[async_trait]
impl Tool for CsvLoad {
    fn name(&self) -> &str {
        "csv_load"
    }

    fn description(&self) -> &str {
        "Load an uploaded CSV file for analysis"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Uploaded file name or path" }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let path = self.store.resolve_upload(required_str(&args, "path")?).await?;
        let summary = self.data.load_csv(&path).await?;
        Ok(ToolOutput::text(format!("CSV loaded successfully.\n\n{}", summary)))
    }
}

pub struct CsvInfo {
    data: Arc<DataAnalysisTool>,
}

impl CsvInfo {
    pub fn new(data: Arc<DataAnalysisTool>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for CsvInfo {
    fn name(&self) -> &str {
        "csv_info"
    }

    fn description(&self) -> &str {
        "Describe the columns of the loaded CSV"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput> {
        Ok(ToolOutput::text(self.data.info().await?))
    }
}

pub struct CsvAnalyze {
    data: Arc<DataAnalysisTool>,
}

impl CsvAnalyze {
    pub fn new(data: Arc<DataAnalysisTool>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for CsvAnalyze {
    fn name(&self) -> &str {
        "csv_analyze"
    }

    fn description(&self) -> &str {
        "Analyze one column of the loaded CSV, or ask a question about the data"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "column": { "type": "string", "description": "Column to analyze" },
                "prompt": { "type": "string", "description": "Question about the data" }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let text = if let Some(column) = optional_str(&args, "column") {
            self.data.analyze_column(column).await?
        } else if let Some(prompt) = optional_str(&args, "prompt") {
            self.data.analyze_with_ai(prompt).await?
        } else {
            self.data.summary().await?
        };
        Ok(ToolOutput::text(text))
    }
}

pub struct CreateChart {
    data: Arc<DataAnalysisTool>,
}

impl CreateChart {
    pub fn new(data: Arc<DataAnalysisTool>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for CreateChart {
    fn name(&self) -> &str {
        "create_chart"
    }

    fn description(&self) -> &str {
        "Render a chart of the loaded CSV as a PNG"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "chart_type": {
                    "type": "string",
                    "enum": ["bar", "line", "scatter", "histogram", "pie", "box", "heatmap"]
                },
                "x_col": { "type": "string" },
                "y_col": { "type": "string" },
                "title": { "type": "string" }
            },
            "required": ["chart_type"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let chart = self
            .data
            .create_chart(
                required_str(&args, "chart_type")?,
                optional_str(&args, "x_col"),
                optional_str(&args, "y_col"),
                optional_str(&args, "title"),
            )
            .await?;
        Ok(ToolOutput::text(chart.message.clone()).with_data(serde_json::to_value(&chart)?))
    }
}

// =============================================================================
// Language
// =============================================================================

pub struct Translate {
    translation: Arc<TranslationTool>,
}

impl Translate {
    pub fn new(translation: Arc<TranslationTool>) -> Self {
        Self { translation }
    }
}

#[async_trait]
impl Tool for Translate {
    fn name(&self) -> &str {
        "translate"
    }

    fn description(&self) -> &str {
        "Translate text between languages"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" },
                "source_lang": { "type": "string", "default": "auto" },
                "target_lang": { "type": "string", "default": "en" }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let translation = self
            .translation
            .translate(
                required_str(&args, "text")?,
                optional_str(&args, "source_lang").unwrap_or("auto"),
                optional_str(&args, "target_lang").unwrap_or("en"),
            )
            .await?;
        Ok(ToolOutput::text(translation.translated_text.clone())
            .with_data(serde_json::to_value(&translation)?))
    }
}

pub struct Summarize {
    summarization: Arc<SummarizationTool>,
}

impl Summarize {
    pub fn new(summarization: Arc<SummarizationTool>) -> Self {
        Self { summarization }
    }
}

#[async_trait]
impl Tool for Summarize {
    fn name(&self) -> &str {
        "summarize"
    }

    fn description(&self) -> &str {
        "Summarize a passage of text"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "minLength": 50 },
                "max_length": { "type": "integer", "default": 130 },
                "min_length": { "type": "integer", "default": 30 }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let mut options = SummaryOptions::default();
        if let Some(max) = args.get("max_length").and_then(Value::as_u64) {
            options.max_length = max as u32;
        }
        if let Some(min) = args.get("min_length").and_then(Value::as_u64) {
            options.min_length = min as u32;
        }
        let summary = self
            .summarization
            .summarize(required_str(&args, "text")?, options)
            .await?;
        Ok(ToolOutput::text(summary.summary.clone()).with_data(serde_json::to_value(&summary)?))
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Adapters exposed through the registry.
pub struct ToolSet {
    pub search: Arc<WebSearchTool>,
    pub wolfram: Arc<WolframTool>,
    pub data: Arc<DataAnalysisTool>,
    pub translation: Arc<TranslationTool>,
    pub summarization: Arc<SummarizationTool>,
    pub store: FileStore,
}

/// Register every tool.
pub async fn register_tools(registry: &dyn ToolRegistry, set: ToolSet) -> Result<()> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(WebSearch::new(set.search)),
        Arc::new(WolframAlpha::new(set.wolfram)),
        Arc::new(CsvLoad::new(set.data.clone(), set.store)),
        Arc::new(CsvInfo::new(set.data.clone())),
        Arc::new(CsvAnalyze::new(set.data.clone())),
        Arc::new(CreateChart::new(set.data)),
        Arc::new(Translate::new(set.translation)),
        Arc::new(Summarize::new(set.summarization)),
    ];
    for tool in tools {
        registry.register(tool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DefaultToolRegistry;
    use crate::web_search::RetryPolicy;
    use ai_agent_core::config::{DataAnalysisConfig, HuggingFaceConfig, TranslationConfig, WolframConfig};
    use ai_agent_core::mocks::{MockLlm, ScriptedSearchBackend};
    use ai_agent_core::types::{SearchEngine, SearchResult};
    use std::time::Duration;

    async fn registry(dir: &std::path::Path) -> DefaultToolRegistry {
        let store = FileStore::under(dir);
        let search = WebSearchTool::new(SearchEngine::DuckDuckGo, RetryPolicy::default()).with_backend(Arc::new(
            ScriptedSearchBackend::always(vec![SearchResult::new(
                "Rust",
                "https://rust-lang.org",
                "A language",
            )]),
        ));
        let hf = crate::huggingface::HuggingFaceClient::new(&HuggingFaceConfig::default(), Duration::from_secs(1));
        let registry = DefaultToolRegistry::new();
        register_tools(
            &registry,
            ToolSet {
                search: Arc::new(search),
                wolfram: Arc::new(WolframTool::new(&WolframConfig::default())),
                data: Arc::new(DataAnalysisTool::new(
                    &DataAnalysisConfig::default(),
                    store.charts_dir.clone(),
                    Arc::new(MockLlm::constant("ok")),
                )),
                translation: Arc::new(TranslationTool::google(&TranslationConfig::default(), Duration::from_secs(1))),
                summarization: Arc::new(SummarizationTool::new(hf, "facebook/bart-large-cnn")),
                store,
            },
        )
        .await
        .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_all_tools_registered() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = registry(dir.path())
            .await
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "create_chart",
                "csv_analyze",
                "csv_info",
                "csv_load",
                "summarize",
                "translate",
                "web_search",
                "wolfram_alpha"
            ]
        );
    }

    #[tokio::test]
    async fn test_web_search_tool_formats_results() {
        let dir = tempfile::tempdir().unwrap();
        let output = registry(dir.path())
            .await
            .execute("web_search", json!({ "query": "rust" }))
            .await
            .unwrap();
        assert!(output.success);
        assert!(output.content.contains("**1. Rust**"));
        assert_eq!(output.data.unwrap()["engine"], "duckduckgo");
    }

    #[tokio::test]
    async fn test_csv_tools_round_trip_through_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path()).await;
        FileStore::under(dir.path())
            .save_upload("sales.csv", b"month,sales\njan,1\nfeb,2\n")
            .await
            .unwrap();

        assert!(matches!(
            registry.execute("csv_info", json!({})).await,
            Err(Error::NoDataLoaded)
        ));

        let loaded = registry
            .execute("csv_load", json!({ "path": "sales.csv" }))
            .await
            .unwrap();
        assert!(loaded.content.contains("- Rows: 2"));

        let column = registry
            .execute("csv_analyze", json!({ "column": "sales" }))
            .await
            .unwrap();
        assert!(column.content.contains("Analysis of column 'sales'"));
    }

    #[tokio::test]
    async fn test_missing_arguments_are_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = registry(dir.path())
            .await
            .execute("wolfram_alpha", json!({}))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
