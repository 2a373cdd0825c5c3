//! Wolfram|Alpha Full Results API adapter.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use ai_agent_core::{
    config::WolframConfig,
    types::{MathImage, MathResult},
};

use crate::http::build_client;

const PLOT_KEYWORDS: [&str; 5] = ["plot", "graph", "chart", "curve", "function"];

pub const NOT_UNDERSTOOD_MESSAGE: &str = "Wolfram|Alpha could not understand this query.";

#[derive(Debug, Deserialize)]
struct WolframEnvelope {
    queryresult: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    pods: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subpods: Vec<SubPod>,
}

#[derive(Debug, Deserialize)]
struct SubPod {
    #[serde(default)]
    plaintext: Option<String>,
    #[serde(default)]
    img: Option<PodImage>,
}

#[derive(Debug, Deserialize)]
struct PodImage {
    #[serde(default)]
    src: String,
    #[serde(default)]
    alt: Option<String>,
}

/// Symbolic computation client. Never returns an error; failures are
/// `MathResult { success: false }` with the reason as the only text result.
pub struct WolframTool {
    client: reqwest::Client,
    app_id: Option<Secret<String>>,
    base_url: String,
}

impl WolframTool {
    pub fn new(config: &WolframConfig) -> Self {
        Self {
            client: build_client(Duration::from_secs(config.timeout_secs)),
            app_id: config.app_id.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.is_some()
    }

    pub async fn compute(&self, query: &str) -> MathResult {
        let Some(app_id) = &self.app_id else {
            return MathResult::failure(
                "Wolfram|Alpha is not available: WOLFRAM_APP_ID is not configured",
            );
        };

        tracing::debug!(query = %query, "Querying Wolfram|Alpha");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("input", query),
                ("appid", app_id.expose_secret().as_str()),
                ("format", "plaintext,image"),
                ("output", "json"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Wolfram|Alpha request failed");
                return MathResult::failure(format!("Error computing with Wolfram|Alpha: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Wolfram|Alpha returned an error status");
            return MathResult::failure(format!(
                "Wolfram|Alpha connection error: {}",
                status.as_u16()
            ));
        }

        match response.text().await {
            Ok(body) => parse_query_result(&body),
            Err(e) => MathResult::failure(format!("Error computing with Wolfram|Alpha: {}", e)),
        }
    }
}

/// Map a JSON `queryresult` body to a `MathResult`.
pub fn parse_query_result(body: &str) -> MathResult {
    let envelope: WolframEnvelope = match serde_json::from_str(body) {
        Ok(e) => e,
        Err(e) => {
            return MathResult::failure(format!("Error computing with Wolfram|Alpha: {}", e));
        }
    };
    let result = envelope.queryresult;
    if !result.success {
        return MathResult::failure(NOT_UNDERSTOOD_MESSAGE);
    }

    let mut out = MathResult {
        success: true,
        ..Default::default()
    };

    for pod in result.pods {
        let lowered = pod.title.to_lowercase();
        let is_plot = PLOT_KEYWORDS.iter().any(|k| lowered.contains(k));

        for subpod in pod.subpods {
            if let Some(text) = subpod.plaintext.filter(|t| !t.is_empty()) {
                out.text_results.push(format!("{}: {}", pod.title, text));
            }
            if let Some(img) = subpod.img.filter(|i| !i.src.is_empty()) {
                let image = MathImage {
                    url: img.src,
                    alt: img.alt.unwrap_or_else(|| pod.title.clone()),
                    title: pod.title.clone(),
                };
                if is_plot {
                    out.plots.push(image);
                } else {
                    out.images.push(image);
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_success_with_plot() {
        let body = json!({
            "queryresult": {
                "success": true,
                "error": false,
                "pods": [
                    {
                        "title": "Input",
                        "subpods": [{ "plaintext": "x^2", "img": { "src": "http://img/1", "alt": "x^2" } }]
                    },
                    {
                        "title": "Plot",
                        "subpods": [{ "plaintext": "", "img": { "src": "http://img/2" } }]
                    }
                ]
            }
        })
        .to_string();

        let result = parse_query_result(&body);
        assert!(result.success);
        assert_eq!(result.text_results, vec!["Input: x^2"]);
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.plots.len(), 1);
        assert_eq!(result.plots[0].alt, "Plot");
    }

    #[test]
    fn test_parse_not_understood() {
        let body = json!({ "queryresult": { "success": false, "error": false } }).to_string();
        let result = parse_query_result(&body);
        assert!(!result.success);
        assert_eq!(result.text_results, vec![NOT_UNDERSTOOD_MESSAGE]);
    }

    #[tokio::test]
    async fn test_missing_app_id_is_reported() {
        let tool = WolframTool::new(&WolframConfig::default());
        let result = tool.compute("2+2").await;
        assert!(!result.success);
        assert!(result.text_results[0].contains("not available"));
    }
}
