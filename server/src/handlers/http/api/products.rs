use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::{Map, Value, json};
use std::convert::Infallible;
use tracing::{info, warn};

use crate::AppState;
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json};
use crate::security::sanitize::{self, FieldKind, FormSchema};
use crate::store::Product;

use shared::types::claims::Claims;

/// Field-by-field cleaning rules for product submissions.  Every string
/// field gets an explicit kind; unknown keys fall back to plain text.
fn product_schema() -> FormSchema {
    FormSchema::new()
        .field("name", FieldKind::Text)
        .field("description", FieldKind::Html)
        .field("website", FieldKind::Url)
        .field("phone", FieldKind::Phone)
        .field("contact_email", FieldKind::Email)
}

pub async fn handle_list(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let products = state.products.list().await;
    deliver_serialized_json(&json!({ "products": products }), StatusCode::OK)
}

/// Public product submission.  The CSRF gate has already passed by the
/// time this runs; this handler owns parsing, sanitization, validation
/// and storage.
pub async fn handle_create(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let body = req
        .collect()
        .await
        .context("Failed to read product body")?
        .to_bytes();

    let raw: Map<String, Value> = match serde_json::from_slice(&body) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            warn!("Product submission body was not a JSON object");
            return deliver_error_json(
                "Request body must be a JSON object",
                Some("INVALID_BODY"),
                StatusCode::BAD_REQUEST,
            );
        }
    };

    create_from_map(raw, &state).await
}

/// Admin product creation behind the token + CSRF gates.  Requires the
/// `write:products` permission on top of the role check the router
/// already performed.
pub async fn handle_admin_create(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    claims: Claims,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    if !claims.has_permission("write:products") {
        warn!("Admin {} lacks write:products", claims.sub);
        return deliver_error_json(
            "Missing permission: write:products",
            Some("INSUFFICIENT_PRIVILEGES"),
            StatusCode::FORBIDDEN,
        );
    }

    handle_create(req, state).await
}

async fn create_from_map(
    raw: Map<String, Value>,
    state: &AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let clean = sanitize::form(&raw, &product_schema());

    let name = string_field(&clean, "name");
    if name.is_empty() {
        return deliver_error_json(
            "Product name is required",
            Some("MISSING_FIELD"),
            StatusCode::BAD_REQUEST,
        );
    }

    let price = clean.get("price").and_then(Value::as_f64).unwrap_or(0.0);
    if !price.is_finite() || price < 0.0 {
        return deliver_error_json(
            "Product price must be a non-negative number",
            Some("INVALID_FIELD"),
            StatusCode::BAD_REQUEST,
        );
    }

    let tags = clean
        .get("tags")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let product = state
        .products
        .create(Product {
            id: String::new(),
            name,
            description: string_field(&clean, "description"),
            price,
            website: string_field(&clean, "website"),
            phone: string_field(&clean, "phone"),
            contact_email: string_field(&clean, "contact_email"),
            tags,
        })
        .await;

    info!("Product created: {} ({})", product.name, product.id);
    deliver_serialized_json(&json!({ "product": product }), StatusCode::CREATED)
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use shared::types::server_config::AppConfig;

    fn test_state() -> AppState {
        let config: AppConfig = toml::from_str("[server]\nbind = \"127.0.0.1\"\n").unwrap();
        AppState::new(config)
    }

    fn submission(name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(name.to_string()));
        map.insert(
            "description".to_string(),
            Value::String("<p>Keripik <script>alert(1)</script>singkong</p>".to_string()),
        );
        map.insert("price".to_string(), json!(15000.0));
        map.insert(
            "website".to_string(),
            Value::String("https://umkm.example.com".to_string()),
        );
        map.insert(
            "contact_email".to_string(),
            Value::String("  SELLER@Example.COM".to_string()),
        );
        map
    }

    async fn body_json(response: Response<BoxBody<Bytes, Infallible>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_sanitizes_fields_before_storing() {
        let state = test_state();
        let response = create_from_map(submission("Keripik <Pedas>"), &state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let product = &body["product"];

        // Text field loses the angle brackets (only the brackets — inner
        // characters survive); HTML field keeps the allow-list tags but
        // drops the script payload.
        assert_eq!(product["name"], "Keripik Pedas");
        assert_eq!(product["description"], "<p>Keripik singkong</p>");
        assert_eq!(product["contact_email"], "seller@example.com");
        // Url re-serialization normalizes the empty path to "/".
        assert_eq!(product["website"], "https://umkm.example.com/");

        assert_eq!(state.products.len().await, 1);
    }

    #[tokio::test]
    async fn create_rejects_empty_name() {
        let state = test_state();
        // Nothing but brackets and whitespace sanitizes to the empty string.
        let response = create_from_map(submission("<>  <>"), &state)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.products.len().await, 0);
    }

    #[tokio::test]
    async fn markup_heavy_name_survives_with_brackets_stripped() {
        let state = test_state();
        let response = create_from_map(submission("<script>Kopi</script>"), &state)
            .await
            .unwrap();

        // The text sanitizer only drops the brackets, so the remaining
        // characters still form a non-empty (if mangled) name.
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["product"]["name"], "scriptKopi/script");
    }

    #[tokio::test]
    async fn create_rejects_negative_price() {
        let state = test_state();
        let mut raw = submission("Kopi");
        raw.insert("price".to_string(), json!(-5.0));

        let response = create_from_map(raw, &state).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listed_products_match_created() {
        let state = test_state();
        create_from_map(submission("Batik Tulis"), &state)
            .await
            .unwrap();

        let listed = state.products.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Batik Tulis");
        assert!(!listed[0].id.is_empty());
    }
}
