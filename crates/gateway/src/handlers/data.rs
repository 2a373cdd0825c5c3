//! Search, math and CSV analysis routes.

use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use ai_agent_core::Error;
use ai_agent_skills::web_search::DEFAULT_MAX_RESULTS;

use super::MultipartForm;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub search_engine: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> ApiResult<Json<Value>> {
    if payload.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query must not be empty"));
    }
    let outcome = state
        .search
        .search(&payload.query, payload.search_engine.as_deref(), payload.max_results.max(1))
        .await;
    Ok(Json(json!({
        "results": outcome.formatted(),
        "engine": outcome.engine,
        "count": outcome.results.len(),
        "status": "success",
    })))
}

#[derive(Debug, Deserialize)]
pub struct MathRequest {
    pub query: String,
}

pub async fn math(State(state): State<Arc<AppState>>, Json(payload): Json<MathRequest>) -> Json<Value> {
    let result = state.wolfram.compute(&payload.query).await;
    Json(json!({
        "result": &result,
        "status": "success",
        "text_results": result.text_results,
        "images": result.images,
        "plots": result.plots,
        "success": result.success,
    }))
}

// =============================================================================
// CSV analysis
// =============================================================================

pub async fn upload_csv(State(state): State<Arc<AppState>>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file(&["file"])?;
    if !file.file_name.to_lowercase().ends_with(".csv") {
        return Err(ApiError::bad_request("Only .csv files are supported"));
    }

    let path = state.store.save_upload(&file.file_name, &file.data).await?;
    let summary = state.data.load_csv(&path).await?;
    let columns = state.data.columns().await?;

    Ok(Json(json!({
        "message": "File uploaded successfully",
        "filename": file.file_name,
        "summary": summary,
        "columns": columns,
        "status": "success",
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// `summary`, `info`, `analyze_column`, `ai_analyze` or `create_chart`.
    pub action: String,
    pub column: Option<String>,
    pub chart_type: Option<String>,
    pub x_col: Option<String>,
    pub y_col: Option<String>,
    pub title: Option<String>,
    pub prompt: Option<String>,
}

fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(message))
}

pub async fn analyze_data(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeRequest>,
) -> ApiResult<Json<Value>> {
    if !state.data.is_loaded().await {
        return Err(Error::NoDataLoaded.into());
    }

    let data = &state.data;
    let mut body = match payload.action.as_str() {
        "summary" => json!({ "result": data.summary().await? }),
        "info" => json!({ "result": data.info().await? }),
        "analyze_column" => {
            let column = required(&payload.column, "Column name required")?;
            json!({ "result": data.analyze_column(column).await? })
        }
        "ai_analyze" => {
            let prompt = required(&payload.prompt, "Prompt required for AI analysis")?;
            json!({ "result": data.analyze_with_ai(prompt).await? })
        }
        "create_chart" => {
            let chart = data
                .create_chart(
                    payload.chart_type.as_deref().unwrap_or("bar"),
                    payload.x_col.as_deref(),
                    payload.y_col.as_deref(),
                    payload.title.as_deref(),
                )
                .await?;
            json!({ "result": &chart.message, "chart": &chart })
        }
        _ => return Err(ApiError::bad_request("Invalid action")),
    };

    body["status"] = json!("success");
    Ok(Json(body))
}

pub async fn list_charts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let charts = state.store.list_charts().await?;
    Ok(Json(json!({ "charts": charts, "status": "success" })))
}

pub async fn get_chart(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let path = state
        .store
        .chart_path(&filename)
        .await
        .ok_or_else(|| ApiError::not_found("Chart not found"))?;
    let png = tokio::fs::read(&path).await.map_err(Error::from)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

pub async fn clear_data(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.data.clear().await;
    Json(json!({ "message": "Data cleared", "status": "success" }))
}
