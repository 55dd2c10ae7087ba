use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::{error, info};
use uuid::Uuid;

use shared::types::log_entry::ApiLogEntry;

use crate::handlers::http::utils::headers::{client_ip, user_agent};
use crate::security::request_log::RequestLog;

/// Tower layer recording one [`ApiLogEntry`] per request.
///
/// Sits outside the router, so entries are written no matter which gate
/// (auth, CSRF, 404, handler) terminated the request.
#[derive(Clone)]
pub struct RequestLoggerLayer {
    log: RequestLog,
}

impl RequestLoggerLayer {
    pub fn new(log: RequestLog) -> Self {
        Self { log }
    }
}

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggerService {
            inner,
            log: self.log.clone(),
        }
    }
}

/// The actual service.  Its own error type is `Infallible`: inner failures
/// are absorbed into a generic 500 response and recorded, never propagated.
#[derive(Clone)]
pub struct RequestLoggerService<S> {
    inner: S,
    log: RequestLog,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RequestLoggerService<S>
where
    S: Service<Request<ReqBody>, Response = Response<BoxBody<Bytes, Infallible>>>
        + Clone
        + Send
        + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        // The router service is always ready.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let log = self.log.clone();
        let mut inner = self.inner.clone();

        // Capture request facts before the body moves into the handler.
        let timestamp = epoch_millis();
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = parse_query(req.uri().query());
        let ip = client_ip(req.headers());
        let agent = user_agent(req.headers());

        Box::pin(async move {
            let result = inner.call(req).await;
            let response_time = start.elapsed().as_millis() as u64;

            let (mut response, status_code, err) = match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    (response, status, None)
                }
                Err(failure) => {
                    let message = failure.to_string();
                    error!("Handler failed on {} {}: {}", method, path, message);
                    (internal_error_response(), 500, Some(message))
                }
            };

            let request_id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert("x-request-id", value);
            }

            info!(
                "{} {} -> {} in {}ms [{}]",
                method, path, status_code, response_time, request_id
            );

            log.record(ApiLogEntry {
                timestamp,
                method,
                path,
                query,
                ip,
                user_agent: agent,
                response_time,
                status_code,
                error: err,
            })
            .await;

            Ok(response)
        })
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    match query {
        Some(raw) => form_urlencoded::parse(raw.as_bytes()).into_owned().collect(),
        None => HashMap::new(),
    }
}

/// Generic 500 body returned when a wrapped handler fails.  The raw error
/// goes to the log entry, not to the client.
fn internal_error_response() -> Response<BoxBody<Bytes, Infallible>> {
    let body = Full::new(Bytes::from_static(br#"{"error":"Internal Server Error"}"#)).boxed();
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
