use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hyper::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the session cookie backing CSRF verification.
pub const SESSION_COOKIE: &str = "session_id";

/// Extract a header value as a string
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract cookie value by name
pub fn get_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                let name = parts.next()?.trim();
                let value = parts.next()?.trim();
                if name == cookie_name {
                    debug!("Cookie found: {}", cookie_name);
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}

/// Set a cookie with options
pub fn set_cookie(
    name: &str,
    value: &str,
    max_age: Option<Duration>,
    path: Option<&str>,
    http_only: bool,
    secure: bool,
) -> Result<HeaderValue> {
    let mut cookie = format!("{}={}", name, value);

    if let Some(age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", age.as_secs()));
    }

    if let Some(p) = path {
        cookie.push_str(&format!("; Path={}", p));
    }

    if http_only {
        cookie.push_str("; HttpOnly");
    }

    if secure {
        cookie.push_str("; Secure");
    }

    cookie.push_str("; SameSite=Strict");

    debug!("Setting cookie: {}", name);

    HeaderValue::from_str(&cookie).map_err(|e| {
        warn!("Failed to create cookie header for {}: {}", name, e);
        anyhow!("Invalid cookie value: {}", e)
    })
}

/// Create a persistent cookie with expiration
pub fn create_persistent_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    secure: bool,
) -> Result<HeaderValue> {
    debug!(
        "Creating persistent cookie: {} with max_age: {:?}",
        name, max_age
    );
    set_cookie(name, value, Some(max_age), Some("/"), true, secure)
}

/// Delete a cookie by setting it to expire
pub fn delete_cookie(name: &str) -> Result<HeaderValue> {
    debug!("Deleting cookie: {}", name);
    set_cookie(
        name,
        "",
        Some(Duration::from_secs(0)),
        Some("/"),
        true,
        false,
    )
}

/// Extract the client IP address from proxy headers (best effort)
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    // Check X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = get_header_value(headers, "x-forwarded-for") {
        return forwarded.split(',').next().map(|s| s.trim().to_string());
    }

    // Check X-Real-IP header
    if let Some(real_ip) = get_header_value(headers, "x-real-ip") {
        return Some(real_ip);
    }

    None
}

/// Extract the user agent string
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    get_header_value(headers, "user-agent")
}

/// Extract bearer token from Authorization header
/// Format: "Authorization: Bearer <token>"
pub fn get_bearer_token(headers: &HeaderMap) -> Option<String> {
    get_header_value(headers, "authorization").and_then(|auth| {
        auth.strip_prefix("Bearer ").map(|token| {
            debug!("Bearer token extracted");
            token.to_string()
        })
    })
}

/// Extract the admin token from either the Bearer header or the admin
/// cookie.  The header wins so API clients can override a stale cookie.
pub fn extract_admin_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(token) = get_bearer_token(headers) {
        return Some(token);
    }

    if let Some(token) = get_cookie(headers, cookie_name) {
        debug!("Using admin token from {} cookie", cookie_name);
        return Some(token);
    }

    None
}

/// Session identity for CSRF binding: the `session_id` cookie when present,
/// otherwise a deterministic fallback derived from client IP + user agent.
///
/// The fallback is collision-prone behind NAT or shared proxies — several
/// clients can map to one session.  Tolerable for this demo deployment;
/// a real one needs server-issued opaque session ids everywhere.
pub fn derive_session_id(headers: &HeaderMap) -> String {
    if let Some(session) = get_cookie(headers, SESSION_COOKIE) {
        return session;
    }

    let ip = client_ip(headers).unwrap_or_else(|| "unknown".to_string());
    let agent = user_agent(headers).unwrap_or_else(|| "unknown".to_string());
    STANDARD.encode(format!("{}-{}", ip, agent))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(
                hyper::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn cookie_is_found_among_several() {
        let headers = headers_with(&[("cookie", "a=1; session_id=abc; b=2")]);
        assert_eq!(get_cookie(&headers, "session_id").as_deref(), Some("abc"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn bearer_token_requires_scheme_prefix() {
        let headers = headers_with(&[("authorization", "Bearer tok123")]);
        assert_eq!(get_bearer_token(&headers).as_deref(), Some("tok123"));

        let headers = headers_with(&[("authorization", "Basic dXNlcg==")]);
        assert_eq!(get_bearer_token(&headers), None);
    }

    #[test]
    fn admin_token_prefers_header_over_cookie() {
        let headers = headers_with(&[
            ("authorization", "Bearer header-token"),
            ("cookie", "admin_token=cookie-token"),
        ]);
        assert_eq!(
            extract_admin_token(&headers, "admin_token").as_deref(),
            Some("header-token")
        );

        let headers = headers_with(&[("cookie", "admin_token=cookie-token")]);
        assert_eq!(
            extract_admin_token(&headers, "admin_token").as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let headers = headers_with(&[("x-forwarded-for", "203.0.113.9, 10.0.0.1")]);
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn session_cookie_wins_over_fallback() {
        let headers = headers_with(&[
            ("cookie", "session_id=sess-1"),
            ("x-forwarded-for", "203.0.113.9"),
            ("user-agent", "agent"),
        ]);
        assert_eq!(derive_session_id(&headers), "sess-1");
    }

    #[test]
    fn fallback_session_id_is_deterministic() {
        let headers = headers_with(&[
            ("x-forwarded-for", "203.0.113.9"),
            ("user-agent", "agent"),
        ]);
        let a = derive_session_id(&headers);
        let b = derive_session_id(&headers);
        assert_eq!(a, b);
        assert_eq!(a, STANDARD.encode("203.0.113.9-agent"));
    }

    #[test]
    fn persistent_cookie_has_expected_attributes() {
        let value = create_persistent_cookie("admin_token", "tok", Duration::from_secs(604800), true)
            .unwrap();
        let cookie = value.to_str().unwrap();
        assert!(cookie.starts_with("admin_token=tok"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn deleted_cookie_expires_immediately() {
        let value = delete_cookie("admin_token").unwrap();
        assert!(value.to_str().unwrap().contains("Max-Age=0"));
    }
}
