//! CSV analysis and charting over a single loaded table.
//!
//! The table lives behind an async `RwLock`: loads and clears take the write
//! lock, every report takes the read lock.

pub mod chart;
pub mod table;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use ai_agent_core::{config::DataAnalysisConfig, traits::LlmClient, Error, Result};

use crate::http::unix_timestamp;
pub use chart::{ChartKind, ChartRequest};
pub use table::{render_grid, ColumnKind, ColumnStats, DataTable};

/// The currently loaded CSV.
#[derive(Debug)]
pub struct LoadedTable {
    pub table: Arc<DataTable>,
    pub file_path: PathBuf,
}

/// A chart written to the charts directory.
#[derive(Debug, Clone, Serialize)]
pub struct ChartOutput {
    pub file_name: String,
    pub path: String,
    pub title: String,
    pub message: String,
}

pub struct DataAnalysisTool {
    state: RwLock<Option<LoadedTable>>,
    charts_dir: PathBuf,
    max_size_mb: u64,
    llm: Arc<dyn LlmClient>,
}

impl DataAnalysisTool {
    pub fn new(config: &DataAnalysisConfig, charts_dir: impl Into<PathBuf>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            state: RwLock::new(None),
            charts_dir: charts_dir.into(),
            max_size_mb: config.max_csv_size_mb,
            llm,
        }
    }

    /// Load a CSV file, replacing any previous table, and return its summary.
    pub async fn load_csv(&self, path: &Path) -> Result<String> {
        let size = tokio::fs::metadata(path).await?.len();
        let size_mb = size as f64 / (1024.0 * 1024.0);
        if size_mb > self.max_size_mb as f64 {
            return Err(Error::invalid_request(format!(
                "File too large ({:.2} MB). Maximum {} MB.",
                size_mb, self.max_size_mb
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let table = tokio::task::spawn_blocking(move || DataTable::from_reader(bytes.as_slice()))
            .await
            .map_err(|e| Error::internal(format!("CSV parse task failed: {}", e)))??;

        tracing::info!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "CSV loaded"
        );

        let summary = summary_text(&table);
        *self.state.write().await = Some(LoadedTable {
            table: Arc::new(table),
            file_path: path.to_path_buf(),
        });
        Ok(summary)
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Drop the loaded table.
    pub async fn clear(&self) {
        *self.state.write().await = None;
        tracing::info!("CSV data cleared");
    }

    pub async fn columns(&self) -> Result<Vec<String>> {
        self.with_table(|t| Ok(t.column_names())).await
    }

    async fn with_table<T>(&self, f: impl FnOnce(&DataTable) -> Result<T>) -> Result<T> {
        let guard = self.state.read().await;
        let loaded = guard.as_ref().ok_or(Error::NoDataLoaded)?;
        f(&loaded.table)
    }

    pub async fn summary(&self) -> Result<String> {
        self.with_table(|t| Ok(summary_text(t))).await
    }

    /// Per-column dtype, null and unique counts, and numeric min/max/mean.
    pub async fn info(&self) -> Result<String> {
        self.with_table(|t| {
            let headers: Vec<String> = ["Column", "Dtype", "Null", "Unique", "Min", "Max", "Mean"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            let rows: Vec<Vec<String>> = t
                .columns()
                .iter()
                .map(|c| {
                    let (min, max, mean) = match c.stats() {
                        Some(s) => (
                            format!("{:.2}", s.min),
                            format!("{:.2}", s.max),
                            format!("{:.2}", s.mean),
                        ),
                        None if c.kind.is_numeric() => ("N/A".into(), "N/A".into(), "N/A".into()),
                        None => ("-".into(), "-".into(), "-".into()),
                    };
                    vec![
                        c.name.clone(),
                        c.kind.dtype().to_string(),
                        c.null_count().to_string(),
                        c.unique_count().to_string(),
                        min,
                        max,
                        mean,
                    ]
                })
                .collect();
            Ok(format!("Column details:\n\n{}", render_grid(&headers, &rows)))
        })
        .await
    }

    pub async fn analyze_column(&self, name: &str) -> Result<String> {
        self.with_table(|t| {
            let Some(col) = t.column(name) else {
                return Ok(format!("Column '{}' does not exist.", name));
            };

            let total = col.len();
            let nulls = col.null_count();
            let null_pct = if total == 0 {
                0.0
            } else {
                nulls as f64 / total as f64 * 100.0
            };

            let mut out = format!("Analysis of column '{}':\n\n", name);
            out.push_str(&format!("Dtype: {}\n", col.kind.dtype()));
            out.push_str(&format!("Count: {}\n", total));
            out.push_str(&format!("Null values: {} ({:.2}%)\n", nulls, null_pct));
            out.push_str(&format!("Unique values: {}\n\n", col.unique_count()));

            if col.kind.is_numeric() {
                out.push_str("Statistics:\n");
                match col.stats() {
                    Some(s) => {
                        out.push_str(&format!("  Min: {}\n", table::format_number(s.min)));
                        out.push_str(&format!("  Max: {}\n", table::format_number(s.max)));
                        out.push_str(&format!("  Mean: {:.2}\n", s.mean));
                        out.push_str(&format!("  Median: {:.2}\n", s.median));
                        out.push_str(&format!("  Std: {:.2}\n", s.std));
                    }
                    None => out.push_str("  No numeric values\n"),
                }
            } else {
                out.push_str("Top 10 most frequent values:\n");
                for (value, count) in col.value_counts().into_iter().take(10) {
                    out.push_str(&format!("  {}: {}\n", value, count));
                }
            }
            Ok(out)
        })
        .await
    }

    /// Ask the LLM a question about the loaded data.
    pub async fn analyze_with_ai(&self, prompt: &str) -> Result<String> {
        let context = self.with_table(|t| Ok(data_context(t))).await?;
        let full_prompt = format!(
            "You are a professional data analyst. Analyze the following data and answer the user's question.\n\n\
             {}\n\
             User question: {}\n\n\
             Answer in detail and clearly. When statistics or calculations are needed, give concrete numbers.",
            context, prompt
        );
        let response = self.llm.complete(&full_prompt).await?;
        Ok(response.content)
    }

    /// Render a chart into the charts directory as `chart_{kind}_{unix_ts}.png`.
    pub async fn create_chart(
        &self,
        kind: &str,
        x_col: Option<&str>,
        y_col: Option<&str>,
        title: Option<&str>,
    ) -> Result<ChartOutput> {
        let kind = ChartKind::parse(kind)?;
        let title = title
            .filter(|t| !t.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{} chart", kind.as_str().to_uppercase()));

        let table = {
            let guard = self.state.read().await;
            let loaded = guard.as_ref().ok_or(Error::NoDataLoaded)?;
            Arc::clone(&loaded.table)
        };
        // Rendering is CPU-bound and runs without holding the table lock.
        let (x_col, y_col) = (x_col.map(String::from), y_col.map(String::from));
        let chart_title = title.clone();
        let png = tokio::task::spawn_blocking(move || {
            let request = ChartRequest::resolve(&table, kind, x_col.as_deref(), y_col.as_deref())?;
            chart::render_png(&table, &request, &chart_title)
        })
        .await
        .map_err(|e| Error::internal(format!("Chart task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.charts_dir).await?;
        let file_name = format!("chart_{}_{}.png", kind.as_str(), unix_timestamp());
        let path = self.charts_dir.join(&file_name);
        tokio::fs::write(&path, &png).await?;

        tracing::info!(kind = kind.as_str(), file = %file_name, bytes = png.len(), "Chart created");

        Ok(ChartOutput {
            message: format!("Chart created: {}", path.display()),
            path: path.display().to_string(),
            file_name,
            title,
        })
    }
}

fn summary_text(table: &DataTable) -> String {
    format!(
        "Dataset information:\n\
         - Rows: {}\n\
         - Columns: {}\n\
         - Column names: {}\n\n\
         First 5 rows:\n{}\n\n\
         Descriptive statistics:\n{}",
        table.row_count(),
        table.column_count(),
        table.column_names().join(", "),
        table.head_grid(5),
        table.describe_grid()
    )
}

fn data_context(table: &DataTable) -> String {
    let dtypes = table
        .columns()
        .iter()
        .map(|c| format!("{}: {}", c.name, c.kind.dtype()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Dataset Information:\n\
         - Rows: {}\n\
         - Columns: {}\n\n\
         First 10 rows:\n{}\n\n\
         Statistical Summary:\n{}\n\n\
         Data Types:\n{}\n",
        table.row_count(),
        table.column_names().join(", "),
        table.head_text(10),
        table.describe_grid(),
        dtypes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_agent_core::mocks::MockLlm;

    async fn loaded_tool(dir: &Path, csv: &str) -> DataAnalysisTool {
        let path = dir.join("data.csv");
        tokio::fs::write(&path, csv).await.unwrap();
        let tool = DataAnalysisTool::new(
            &DataAnalysisConfig::default(),
            dir.join("charts"),
            Arc::new(MockLlm::constant("Sales grow steadily.")),
        );
        tool.load_csv(&path).await.unwrap();
        tool
    }

    #[tokio::test]
    async fn test_summary_reports_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let tool = loaded_tool(dir.path(), "month,sales\njan,10\nfeb,12\nmar,15\n").await;

        let summary = tool.summary().await.unwrap();
        assert!(summary.contains("- Rows: 3"));
        assert!(summary.contains("- Columns: 2"));
        assert!(summary.contains("- Column names: month, sales"));
        assert!(summary.contains("| mean  |"));
    }

    #[tokio::test]
    async fn test_operations_require_loaded_data() {
        let tool = DataAnalysisTool::new(
            &DataAnalysisConfig::default(),
            "charts",
            Arc::new(MockLlm::constant("")),
        );
        assert!(matches!(tool.summary().await, Err(Error::NoDataLoaded)));
        assert!(matches!(tool.info().await, Err(Error::NoDataLoaded)));
        assert!(matches!(
            tool.create_chart("bar", Some("a"), Some("b"), None).await,
            Err(Error::NoDataLoaded)
        ));
    }

    #[tokio::test]
    async fn test_analyze_column() {
        let dir = tempfile::tempdir().unwrap();
        let tool = loaded_tool(dir.path(), "city,temp\nHanoi,30\nHue,\nHanoi,28\n").await;

        let numeric = tool.analyze_column("temp").await.unwrap();
        assert!(numeric.contains("Null values: 1 (33.33%)"));
        assert!(numeric.contains("Mean: 29.00"));

        let text = tool.analyze_column("city").await.unwrap();
        assert!(text.contains("Hanoi: 2"));

        let missing = tool.analyze_column("nope").await.unwrap();
        assert_eq!(missing, "Column 'nope' does not exist.");
    }

    #[tokio::test]
    async fn test_create_chart_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let tool = loaded_tool(dir.path(), "x,y\n1,2\n2,4\n3,5\n").await;

        let chart = tool.create_chart("line", Some("x"), Some("y"), None).await.unwrap();
        assert!(chart.file_name.starts_with("chart_line_"));
        assert!(chart.file_name.ends_with(".png"));
        assert_eq!(chart.title, "LINE chart");
        assert!(dir.path().join("charts").join(&chart.file_name).exists());

        tool.clear().await;
        assert!(!tool.is_loaded().await);
    }

    #[tokio::test]
    async fn test_create_chart_with_infinite_cell() {
        let dir = tempfile::tempdir().unwrap();
        let tool = loaded_tool(dir.path(), "x,y\n1,2\n2,inf\n3,5\n").await;

        let info = tool.info().await.unwrap();
        assert!(info.contains("float64"));

        for kind in ["bar", "line", "scatter", "box"] {
            let chart = tool
                .create_chart(kind, Some("x"), Some("y"), Some("Growth"))
                .await
                .unwrap();
            assert_eq!(chart.title, "Growth");
            let png = tokio::fs::read(dir.path().join("charts").join(&chart.file_name))
                .await
                .unwrap();
            assert_eq!(&png[..4], b"\x89PNG");
        }

        let err = tool.create_chart("line", Some("x"), Some("nope"), None).await.unwrap_err();
        assert!(err.to_string().contains("Column 'nope' does not exist"));
    }

    #[tokio::test]
    async fn test_analyze_with_ai_sends_context() {
        let dir = tempfile::tempdir().unwrap();
        let llm = Arc::new(MockLlm::constant("Sales grow steadily."));
        let path = dir.path().join("d.csv");
        tokio::fs::write(&path, "month,sales\njan,10\n").await.unwrap();
        let tool = DataAnalysisTool::new(&DataAnalysisConfig::default(), dir.path(), llm.clone());
        tool.load_csv(&path).await.unwrap();

        let answer = tool.analyze_with_ai("What is the trend?").await.unwrap();
        assert_eq!(answer, "Sales grow steadily.");
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("- Rows: 1"));
        assert!(prompt.contains("sales: int64"));
        assert!(prompt.contains("User question: What is the trend?"));
    }

    #[tokio::test]
    async fn test_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        tokio::fs::write(&path, "a\n1\n").await.unwrap();
        let tool = DataAnalysisTool::new(
            &DataAnalysisConfig { max_csv_size_mb: 0 },
            dir.path(),
            Arc::new(MockLlm::constant("")),
        );
        let err = tool.load_csv(&path).await.unwrap_err();
        assert!(err.to_string().contains("File too large"));
    }
}
