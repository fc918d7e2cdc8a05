//! mediainfo and bdinfo report endpoints.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;

use super::error::ApiError;
use super::input;
use super::AppContext;
use crate::report;

/// JSON envelope for the report endpoints.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InfoResponse {
    fn success(output: String) -> Self {
        Self {
            ok: true,
            output: if output.is_empty() { None } else { Some(output) },
            error: None,
        }
    }
}

/// Create the report routes.
pub fn info_routes() -> Router<AppContext> {
    Router::new()
        .route("/mediainfo", post(mediainfo))
        .route("/bdinfo", post(bdinfo))
}

/// Run mediainfo against the best candidate derived from the input.
async fn mediainfo(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<InfoResponse>, ApiError> {
    let staged = input::staged_input(multipart).await?;
    let result = report::mediainfo_report(
        &ctx.tools,
        staged.path(),
        ctx.config.limits.candidate_limit,
        ctx.config.limits.request_timeout(),
    )
    .await;
    staged.release().await;
    Ok(Json(InfoResponse::success(result?)))
}

/// Run bdinfo against the disc root derived from the input.
async fn bdinfo(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<InfoResponse>, ApiError> {
    let staged = input::staged_input(multipart).await?;
    let result = report::bdinfo_report(
        &ctx.tools,
        staged.path(),
        ctx.config.limits.request_timeout(),
    )
    .await;
    staged.release().await;
    Ok(Json(InfoResponse::success(result?)))
}
