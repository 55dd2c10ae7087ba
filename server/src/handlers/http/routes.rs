use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode};
use tower::Service;
use tracing::warn;

use crate::AppState;
use crate::handlers::http::utils::headers::{
    derive_session_id, extract_admin_token, get_header_value,
};
use crate::handlers::http::utils::json_response::{deliver_error_json, deliver_redirect};
use crate::handlers::http::{admin, api, auth};
use crate::security::error::AuthError;
use crate::security::token;

use shared::types::claims::{Claims, Role};

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Four security tiers:
//
//   RouteHandler   — no auth.  Receives (req, state).
//                    Use for: /health, /api/csrf-token, login, public reads.
//
//   AuthedHandler  — token verified, role checked by the router.
//                    Receives (req, state, claims).
//
//   Page tier      — AuthedHandler behind the browser-navigation gate:
//                    failures redirect to the login/unauthorized pages.
//
//   Guarded tier   — AuthedHandler behind the API gate: failures are JSON
//                    401/403, and mutating methods also pass the CSRF gate.
//
//   Csrf tier      — RouteHandler behind the CSRF gate only, for public
//                    mutations like product submissions.

type RouteHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

type AuthedHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
            Claims,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

enum RouteKind {
    /// No authentication check.
    Open(RouteHandler),

    /// Browser navigation: token + role required, failures redirect.
    Page {
        allowed: Vec<Role>,
        handler: AuthedHandler,
    },

    /// API route: token + role required, failures are JSON; mutating
    /// methods additionally pass the CSRF gate before the handler runs.
    Guarded {
        allowed: Vec<Role>,
        handler: AuthedHandler,
    },

    /// CSRF gate only.
    Csrf(RouteHandler),
}

struct Route {
    method: Method,
    path: String,
    kind: RouteKind,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    /// GET with no authentication — health checks and public reads.
    pub fn get<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    /// POST with no authentication — use only for login / logout.
    pub fn post<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    // ── Page tier (redirect on failure) ──────────────────────────────────────

    /// GET behind the browser-navigation gate.  No/invalid/expired token
    /// redirects to `/auth/login?from=<path>`; an insufficient role
    /// redirects to `/unauthorized`.
    pub fn page<F, Fut>(mut self, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            kind: RouteKind::Page {
                allowed: allowed.to_vec(),
                handler: Box::new(move |req, state, claims| {
                    Box::pin(handler(req, state, claims))
                }),
            },
        });
        self
    }

    // ── Guarded tier (JSON on failure, CSRF on mutations) ────────────────────

    /// GET behind the API gate.
    pub fn get_guarded<F, Fut>(self, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.guarded(Method::GET, path, allowed, handler)
    }

    /// POST behind the API gate + CSRF gate.
    pub fn post_guarded<F, Fut>(self, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.guarded(Method::POST, path, allowed, handler)
    }

    /// PUT behind the API gate + CSRF gate.
    pub fn put_guarded<F, Fut>(self, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.guarded(Method::PUT, path, allowed, handler)
    }

    /// DELETE behind the API gate + CSRF gate.
    pub fn delete_guarded<F, Fut>(self, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.guarded(Method::DELETE, path, allowed, handler)
    }

    fn guarded<F, Fut>(mut self, method: Method, path: &str, allowed: &[Role], handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState, Claims) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Guarded {
                allowed: allowed.to_vec(),
                handler: Box::new(move |req, state, claims| {
                    Box::pin(handler(req, state, claims))
                }),
            },
        });
        self
    }

    // ── Csrf tier ────────────────────────────────────────────────────────────

    /// POST behind the CSRF gate only — public mutations.
    pub fn post_csrf<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::POST,
            path: path.to_string(),
            kind: RouteKind::Csrf(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let cookie_name = state.config.auth.admin_cookie.clone();

        for route in &self.routes {
            if route.method != method || !Self::path_matches(&route.path, &path) {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(handler) => handler(req, state).await,

                RouteKind::Page { allowed, handler } => {
                    match authenticate(req.headers(), &cookie_name, allowed) {
                        Ok(claims) => handler(req, state, claims).await,
                        Err(rejection) => {
                            warn!("Page gate rejected {} {}: {:?}", method, path, rejection);
                            page_rejection_response(&rejection, &path)
                        }
                    }
                }

                RouteKind::Guarded { allowed, handler } => {
                    let claims = match authenticate(req.headers(), &cookie_name, allowed) {
                        Ok(claims) => claims,
                        Err(rejection) => {
                            warn!("API gate rejected {} {}: {:?}", method, path, rejection);
                            return api_rejection_response(&rejection);
                        }
                    };

                    if is_mutating(&method) && !csrf_check(req.headers(), &state).await {
                        warn!("CSRF gate rejected {} {}", method, path);
                        return csrf_rejected();
                    }

                    handler(req, state, claims).await
                }

                RouteKind::Csrf(handler) => {
                    if is_mutating(&method) && !csrf_check(req.headers(), &state).await {
                        warn!("CSRF gate rejected {} {}", method, path);
                        return csrf_rejected();
                    }
                    handler(req, state).await
                }
            };
        }

        deliver_error_json("Endpoint not found", Some("NOT_FOUND"), StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    // ── Path matching ─────────────────────────────────────────────────────────

    pub fn path_matches(route_path: &str, request_path: &str) -> bool {
        // Strip query string from incoming request path before comparing.
        let clean = request_path.split('?').next().unwrap_or(request_path);

        // Exact match.
        if route_path == clean {
            return true;
        }

        // Segment-by-segment matching for `:param` wildcards.
        // e.g.  "/api/products/:id"  matches  "/api/products/42"
        let route_segs: Vec<&str> = route_path.split('/').collect();
        let path_segs: Vec<&str> = clean.split('/').collect();

        if route_segs.len() != path_segs.len() {
            return false;
        }

        route_segs
            .iter()
            .zip(path_segs.iter())
            .all(|(r, p)| r.starts_with(':') || r == p)
    }
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum GateRejection {
    /// No token in the Bearer header or the admin cookie.
    Unauthenticated,
    /// Token present but malformed or expired.
    InvalidToken(AuthError),
    /// Valid token, role not in the allowed set.
    Forbidden,
}

pub(crate) fn authenticate(
    headers: &HeaderMap,
    cookie_name: &str,
    allowed: &[Role],
) -> Result<Claims, GateRejection> {
    let raw = extract_admin_token(headers, cookie_name).ok_or(GateRejection::Unauthenticated)?;
    let claims = token::verify(&raw).map_err(GateRejection::InvalidToken)?;
    token::require_role(&claims, allowed).map_err(|_| GateRejection::Forbidden)?;
    Ok(claims)
}

pub(crate) fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

pub(crate) async fn csrf_check(headers: &HeaderMap, state: &AppState) -> bool {
    let session = derive_session_id(headers);
    let candidate = get_header_value(headers, "x-csrf-token")
        .or_else(|| get_header_value(headers, "csrf-token"));

    match candidate {
        Some(token) => state.csrf.verify(&session, &token).await,
        None => false,
    }
}

pub(crate) fn csrf_rejected() -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_error_json(
        "CSRF token validation failed",
        Some("CSRF_TOKEN_INVALID"),
        StatusCode::FORBIDDEN,
    )
    .context("Failed to deliver CSRF rejection")
}

fn page_rejection_response(
    rejection: &GateRejection,
    path: &str,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match rejection {
        GateRejection::Unauthenticated | GateRejection::InvalidToken(_) => {
            deliver_redirect(&format!("/auth/login?from={}", path))
                .context("Failed to deliver login redirect")
        }
        GateRejection::Forbidden => {
            deliver_redirect("/unauthorized").context("Failed to deliver unauthorized redirect")
        }
    }
}

fn api_rejection_response(
    rejection: &GateRejection,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match rejection {
        GateRejection::Unauthenticated => deliver_error_json(
            "Authentication required",
            Some("UNAUTHORIZED"),
            StatusCode::UNAUTHORIZED,
        )
        .context("Failed to deliver 401 response"),
        GateRejection::InvalidToken(reason) => {
            deliver_error_json(&reason.to_string(), Some(reason.code()), reason.status())
                .context("Failed to deliver token rejection")
        }
        GateRejection::Forbidden => deliver_error_json(
            "Insufficient privileges",
            Some("INSUFFICIENT_PRIVILEGES"),
            StatusCode::FORBIDDEN,
        )
        .context("Failed to deliver 403 response"),
    }
}

// ---------------------------------------------------------------------------
// Route table
//
// The gate tier is enforced here at the routing level — handlers MUST NOT
// repeat the auth or CSRF call.  The contract is:
//
//   .get(...) / .post(...)   → Open     — handler gets (req, state)
//   .page(...)               → Page     — handler gets (req, state, claims)
//   .get_guarded(...)        → Guarded  — same, JSON failures
//   .post_guarded(...)       → Guarded  — + CSRF gate before the handler
//   .post_csrf(...)          → Csrf     — CSRF gate only
// ---------------------------------------------------------------------------

const ANY_ADMIN: &[Role] = &[Role::Admin, Role::SuperAdmin];
const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

pub fn build_router() -> Router {
    Router::new()
        // ── Public: no auth ──────────────────────────────────────────────────
        .get("/health", |req, state| async move {
            api::health::handle_health(req, state)
                .await
                .context("Health check failed")
        })
        .get("/api/csrf-token", |req, state| async move {
            api::csrf_token::handle_issue(req, state)
                .await
                .context("CSRF issuance failed")
        })
        .post("/api/admin/login", |req, state| async move {
            auth::login::handle_login(req, state)
                .await
                .context("Admin login failed")
        })
        .post("/api/admin/logout", |req, state| async move {
            auth::logout::handle_logout(req, state)
                .await
                .context("Admin logout failed")
        })
        .get("/api/products", |req, state| async move {
            api::products::handle_list(req, state)
                .await
                .context("Product list failed")
        })
        // ── CSRF-protected public mutations ──────────────────────────────────
        .post_csrf("/api/products", |req, state| async move {
            api::products::handle_create(req, state)
                .await
                .context("Product create failed")
        })
        // ── Guarded API: token + role, JSON failures ─────────────────────────
        .get_guarded("/api/admin/logs", SUPER_ADMIN_ONLY, |req, state, claims| async move {
            admin::logs::handle_get_logs(req, state, claims)
                .await
                .context("Log query failed")
        })
        .post_guarded("/api/admin/products", ANY_ADMIN, |req, state, claims| async move {
            api::products::handle_admin_create(req, state, claims)
                .await
                .context("Admin product create failed")
        })
        // ── Admin pages: browser gate, redirect failures ─────────────────────
        .page("/admin", ANY_ADMIN, |req, state, claims| async move {
            admin::pages::handle_dashboard(req, state, claims)
                .await
                .context("Dashboard page failed")
        })
        .page("/admin/products", ANY_ADMIN, |req, state, claims| async move {
            admin::pages::handle_products_page(req, state, claims)
                .await
                .context("Products page failed")
        })
        .page("/admin/programs", ANY_ADMIN, |req, state, claims| async move {
            admin::pages::handle_programs_page(req, state, claims)
                .await
                .context("Programs page failed")
        })
        .page("/admin/users", SUPER_ADMIN_ONLY, |req, state, claims| async move {
            admin::pages::handle_users_page(req, state, claims)
                .await
                .context("Users page failed")
        })
}

// ---------------------------------------------------------------------------
// Tower service wrapping the router, so the request-logging layer can sit
// outside it.
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct RouterService {
    router: Arc<Router>,
    state: AppState,
}

impl RouterService {
    pub fn new(router: Arc<Router>, state: AppState) -> Self {
        Self { router, state }
    }
}

impl Service<Request<hyper::body::Incoming>> for RouterService {
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = anyhow::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        let router = self.router.clone();
        let state = self.state.clone();
        Box::pin(async move { router.route(req, state).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
