//! Path autocomplete endpoint for the web UI's file picker.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::AppContext;
use crate::paths;

/// JSON envelope for path suggestions.
#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub prefix: String,
}

/// Create the path suggestion routes.
pub fn path_routes() -> Router<AppContext> {
    Router::new().route("/path", get(suggest))
}

/// Complete a partial path under the configured media root.
async fn suggest(
    State(ctx): State<AppContext>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<PathResponse>, ApiError> {
    let prefix = query.prefix.trim().trim_matches('"');
    let root = &ctx.config.media.root;

    let items = paths::suggest_paths(root, prefix, ctx.config.media.max_suggestions)?;

    Ok(Json(PathResponse {
        ok: true,
        root: Some(root.to_string_lossy().into_owned()),
        items,
        error: None,
    }))
}
