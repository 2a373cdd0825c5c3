//! Prometheus metrics for routes, tools and LLM usage.

use ai_agent_core::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global recorder. The handle renders `GET /metrics`.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Count and time one HTTP request. `path` is the matched route, not the raw URI.
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "ai_agent_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "ai_agent_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Count and time one registry tool call.
pub fn track_tool_call(tool: &str, success: bool, latency_sec: f64) {
    metrics::counter!(
        "ai_agent_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);

    metrics::histogram!("ai_agent_tool_call_duration_seconds", "tool" => tool.to_string())
        .record(latency_sec);
}

/// Estimated prompt and completion tokens per model.
pub fn track_tokens(model: &str, prompt: u64, completion: u64) {
    metrics::counter!("ai_agent_llm_tokens_total", "model" => model.to_string(), "kind" => "prompt")
        .increment(prompt);
    metrics::counter!("ai_agent_llm_tokens_total", "model" => model.to_string(), "kind" => "completion")
        .increment(completion);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        track_request("GET", "/health", 200, 0.01);
        track_tool_call("web_search", true, 0.2);
        track_tokens("mock-llm", 10, 20);
    }
}
