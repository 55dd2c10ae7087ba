use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;

use crate::AppState;
use crate::handlers::http::utils::deliver_html;

use shared::types::claims::Claims;

// Server-rendered admin pages.  These only exist to give the
// browser-navigation gate something to protect; the real UI is a
// separate frontend.

fn render_page(title: &str, claims: &Claims, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{title} - Si-UMKM Admin</title></head>\n\
         <body>\n<h1>{title}</h1>\n<p>Signed in as {email} ({role})</p>\n{body}\n</body>\n</html>\n",
        title = title,
        email = claims.email,
        role = claims.role,
        body = body,
    )
}

pub async fn handle_dashboard(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let products = state.products.len().await;
    let logged = state.logs.len().await;
    let body = format!(
        "<ul><li>Products: {}</li><li>Logged requests: {}</li></ul>",
        products, logged
    );
    deliver_html(render_page("Dashboard", &claims, &body), StatusCode::OK)
}

pub async fn handle_products_page(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let products = state.products.list().await;
    let rows: String = products
        .iter()
        .map(|p| format!("<li>{} — {}</li>", p.name, p.price))
        .collect();
    let body = format!("<ul>{}</ul>", rows);
    deliver_html(render_page("Products", &claims, &body), StatusCode::OK)
}

pub async fn handle_programs_page(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_html(
        render_page("Programs", &claims, "<p>No training programs scheduled.</p>"),
        StatusCode::OK,
    )
}

pub async fn handle_users_page(
    _req: Request<hyper::body::Incoming>,
    _state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    deliver_html(
        render_page("Users", &claims, "<p>User management.</p>"),
        StatusCode::OK,
    )
}
