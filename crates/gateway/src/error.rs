//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use ai_agent_core::{types::ToolEnvelope, Error, Result};

/// Error returned by a handler, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest(msg) => Self::bad_request(msg),
            Error::NotFound(msg) => Self::not_found(msg),
            e @ Error::NoDataLoaded => Self::bad_request(e.to_string()),
            e @ Error::ToolNotFound(_) => Self::not_found(e.to_string()),
            e => {
                tracing::error!(error = %e, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Wrap an adapter result in the uniform envelope.
///
/// Adapter failures become `success: false` with HTTP 200; request problems
/// and internal errors keep their HTTP status.
pub fn envelope<T: Serialize>(result: Result<T>) -> ApiResult<Json<ToolEnvelope<T>>> {
    match result {
        Ok(data) => Ok(Json(ToolEnvelope::ok(data))),
        Err(e) if e.is_adapter_failure() => {
            tracing::warn!(error = %e, "Adapter call failed");
            Ok(Json(ToolEnvelope::from(e)))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(Error::NoDataLoaded).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(Error::not_found("x")).detail, "x");
        assert_eq!(
            ApiError::from(Error::tool_not_found("nope")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::internal("boom")).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_swallows_adapter_failures() {
        let Json(body) = envelope::<()>(Err(Error::not_configured("Clipdrop API key"))).unwrap();
        assert!(!body.is_success());

        let err = envelope::<()>(Err(Error::invalid_request("empty"))).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
