//! HTTP basic authentication for the API surface.
//!
//! A single shared password from `server.password` guards the API routes;
//! the username half of the credentials is ignored. When no password is
//! configured the middleware is never installed and every request passes.

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::typed_header::TypedHeader;
use serde_json::json;

use super::AppContext;

/// Middleware rejecting requests that do not carry the configured password.
pub async fn require_password(
    State(ctx): State<AppContext>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = match ctx.config.server.password.as_deref() {
        Some(password) => password,
        None => return next.run(request).await,
    };

    match credentials {
        Some(TypedHeader(auth)) if auth.password() == expected => next.run(request).await,
        _ => unauthorized(),
    }
}

fn unauthorized() -> Response {
    let body = Json(json!({ "ok": false, "error": "unauthorized" }));
    let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"discprobe\""),
    );
    response
}
