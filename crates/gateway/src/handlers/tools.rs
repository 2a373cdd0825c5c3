//! Tool registry routes.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use ai_agent_core::types::{ToolEnvelope, ToolOutput};

use crate::error::{envelope, ApiResult};
use crate::state::AppState;

pub async fn list_tools(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let tools = state.registry.list().await?;
    Ok(Json(json!({ "count": tools.len(), "tools": tools })))
}

pub async fn execute_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    args: Option<Json<Value>>,
) -> ApiResult<Json<ToolEnvelope<ToolOutput>>> {
    let args = args.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    envelope(state.registry.execute(&name, args).await)
}
