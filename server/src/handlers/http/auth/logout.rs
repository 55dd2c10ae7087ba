use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use tracing::info;

use crate::AppState;
use crate::handlers::http::utils::{delete_cookie, full};

/// Clears the admin token cookie.  Tokens are not tracked server-side, so
/// logout is purely a cookie deletion — an already-issued token stays
/// decodable until its expiry.
pub async fn handle_logout(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing admin logout request");

    let expired_cookie = delete_cookie(&state.config.auth.admin_cookie)
        .context("Failed to create logout cookie")?;

    let body = serde_json::to_string(&json!({
        "success": true,
        "message": "Logged out successfully",
    }))
    .context("Failed to serialize logout response")?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .header("set-cookie", expired_cookie)
        .body(full(Bytes::from(body)))
        .context("Failed to build logout response")?;

    Ok(response)
}
