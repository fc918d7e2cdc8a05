//! Screenshot sheet endpoint: capture eight frames and return them zipped.

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use super::error::ApiError;
use super::input;
use super::AppContext;
use crate::report;

/// Create the screenshot routes.
pub fn shot_routes() -> Router<AppContext> {
    Router::new().route("/screenshots", post(screenshots))
}

/// Capture a screenshot set from the input and send it back as a zip.
async fn screenshots(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let staged = input::staged_input(multipart).await?;
    let result = report::screenshot_archive(
        &ctx.tools,
        staged.path(),
        ctx.config.limits.request_timeout(),
    )
    .await;
    staged.release().await;
    let bytes = result?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"screenshots.zip\"",
        ),
    ];
    Ok((headers, bytes).into_response())
}
