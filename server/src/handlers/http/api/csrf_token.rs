use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use tracing::debug;

use crate::AppState;
use crate::handlers::http::utils::{
    SESSION_COOKIE, create_persistent_cookie, derive_session_id, full, get_cookie,
};

/// Issues a fresh CSRF token bound to the caller's session.
///
/// Callers without a `session_id` cookie get the IP/user-agent fallback
/// identity AND a freshly-set cookie, so the token they receive stays
/// valid once the cookie round-trips.  Reissuing replaces any previous
/// token for the session.
pub async fn handle_issue(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let headers = req.headers();
    let had_cookie = get_cookie(headers, SESSION_COOKIE).is_some();
    let session_id = derive_session_id(headers);

    let token = state.csrf.issue(&session_id).await;
    debug!("Issued CSRF token for session");

    let body = serde_json::to_string(&json!({ "csrfToken": token }))
        .context("Failed to serialize CSRF token response")?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json");

    if !had_cookie {
        let session_cookie = create_persistent_cookie(
            SESSION_COOKIE,
            &session_id,
            state.config.security.session_cookie_max_age(),
            state.config.auth.secure_cookies,
        )
        .context("Failed to create session cookie")?;
        builder = builder.header("set-cookie", session_cookie);
    }

    builder
        .body(full(Bytes::from(body)))
        .context("Failed to build CSRF token response")
}
