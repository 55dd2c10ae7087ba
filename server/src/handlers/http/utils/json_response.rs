use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{Response, StatusCode, header};
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, error};

use shared::types::json_error::ErrorBody;

/// Serialize any `Serialize` type and deliver it as a JSON response.
/// This is the primary helper all handlers should use instead of
/// writing their own one-off serialization + response-building blocks.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!(
        "Delivering serialized JSON response, size: {} bytes",
        json.len()
    );

    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)).boxed())
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))?;

    Ok(response)
}

/// Delivers the pipeline's uniform `{error, code?}` body with the given
/// status.
pub fn deliver_error_json(
    message: &str,
    code: Option<&str>,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    error!(
        "Delivering error JSON: {} - {} ({})",
        status.as_u16(),
        code.unwrap_or("-"),
        message
    );

    let body = match code {
        Some(code) => ErrorBody::with_code(message, code),
        None => ErrorBody::new(message),
    };

    deliver_serialized_json(&body, status)
}

/// 307 redirect for browser-navigation gates.
pub fn deliver_redirect(location: &str) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    debug!("Redirecting to {}", location);

    let response = Response::builder()
        .status(StatusCode::TEMPORARY_REDIRECT)
        .header(header::LOCATION, location)
        .body(Empty::<Bytes>::new().boxed())
        .map_err(|e| anyhow!("Failed to build redirect response: {}", e))?;

    Ok(response)
}

/// Box a byte chunk into the uniform response body type.
pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

/// Empty body for redirects and 204-style responses.
pub fn empty() -> BoxBody<Bytes, Infallible> {
    Empty::<Bytes>::new().boxed()
}

/// Minimal HTML response for the server-rendered admin placeholder pages.
pub fn deliver_html(
    markup: String,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let response = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(markup)).boxed())
        .map_err(|e| anyhow!("Failed to build HTML response: {}", e))?;

    Ok(response)
}
