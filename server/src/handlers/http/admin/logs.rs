use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::info;

use crate::AppState;
use crate::handlers::http::utils::deliver_serialized_json;
use crate::security::request_log::LogFilter;

use shared::types::claims::Claims;

/// Super-admin log inspection.  Query parameters: `page`, `limit`,
/// `method` (exact), `path` (substring).  Out-of-range values fall back
/// to the filter defaults rather than erroring.
pub async fn handle_get_logs(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let filter = parse_filter(req.uri().query().unwrap_or(""));

    info!(
        "Log query by {}: page={} limit={} method={:?} path={:?}",
        claims.sub, filter.page, filter.limit, filter.method, filter.path
    );

    let page = state.logs.query(&filter).await;
    deliver_serialized_json(&page, StatusCode::OK)
}

fn parse_filter(query: &str) -> LogFilter {
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    let defaults = LogFilter::default();

    LogFilter {
        method: params
            .get("method")
            .filter(|v| !v.is_empty())
            .map(|v| v.to_uppercase()),
        path: params.get("path").filter(|v| !v.is_empty()).cloned(),
        page: params
            .get("page")
            .and_then(|v| v.parse().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(defaults.page),
        limit: params
            .get("limit")
            .and_then(|v| v.parse().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(defaults.limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_uses_defaults() {
        let filter = parse_filter("");
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 100);
        assert!(filter.method.is_none());
        assert!(filter.path.is_none());
    }

    #[test]
    fn filters_parse_from_query_string() {
        let filter = parse_filter("page=3&limit=25&method=post&path=/api/products");
        assert_eq!(filter.page, 3);
        assert_eq!(filter.limit, 25);
        assert_eq!(filter.method.as_deref(), Some("POST"));
        assert_eq!(filter.path.as_deref(), Some("/api/products"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let filter = parse_filter("page=0&limit=abc");
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 100);
    }
}
