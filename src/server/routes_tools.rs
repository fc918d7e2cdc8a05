//! Tool availability report endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::error::ApiError;
use super::AppContext;
use crate::error::Error;
use crate::tools::ToolInfo;

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub ok: bool,
    pub tools: Vec<ToolInfo>,
}

/// Create the tool report routes.
pub fn tool_routes() -> Router<AppContext> {
    Router::new().route("/tools", get(report))
}

/// List every known tool with its resolved path and version.
///
/// Version detection shells out, so the whole check runs off the async
/// runtime.
async fn report(State(ctx): State<AppContext>) -> Result<Json<ToolsResponse>, ApiError> {
    let registry = ctx.tools.clone();
    let tools = tokio::task::spawn_blocking(move || registry.check_all())
        .await
        .map_err(|e| Error::Internal(format!("tool check failed: {e}")))?;

    Ok(Json(ToolsResponse { ok: true, tools }))
}
