//! Shared outbound HTTP helpers.

use std::time::Duration;

use ai_agent_core::{Error, Result};

/// Browser-like user agent for endpoints that reject default clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Build a client with a fixed per-request timeout.
pub fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a transport error to an upstream error, flagging timeouts.
pub fn transport_error(service: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{} request timed out", service))
    } else {
        Error::upstream(service, err.to_string())
    }
}

/// Fail on a non-2xx status, keeping the response body in the message.
pub async fn ensure_success(service: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(500).collect();
    Err(Error::upstream(service, format!("HTTP {}: {}", status.as_u16(), body)))
}

/// Seconds since the Unix epoch, used in generated file names.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
