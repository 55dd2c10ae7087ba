use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use tracing::{error, info, warn};

use crate::AppState;
use crate::handlers::http::utils::{self, deliver_serialized_json, full};
use crate::security::token::{self, TokenRequest};
use crate::store::AdminUser;

/// Login request data (supports both form-encoded and JSON)
#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

/// Login response codes (for API-style responses)
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Success {
        token: String,
        user: AdminUser,
        expires_in: u64,
        message: String,
        redirect: String,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug)]
pub enum LoginError {
    InvalidCredentials,
    MissingField(String),
    InternalError,
}

impl LoginError {
    fn to_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    fn to_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::MissingField(field) => format!("Missing required field: {}", field),
            Self::InternalError => "An internal error occurred".to_string(),
        }
    }

    fn to_response(&self) -> LoginResponse {
        LoginResponse::Error {
            code: self.to_code().to_string(),
            message: self.to_message(),
        }
    }
}

/// Main admin login handler
pub async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing admin login request");

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let login_data = if content_type.contains("application/json") {
        match parse_login_json(req).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Admin login JSON parsing failed: {:?}", e.to_code());
                return deliver_serialized_json(&e.to_response(), StatusCode::BAD_REQUEST);
            }
        }
    } else {
        match parse_login_form(req).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Admin login form parsing failed: {:?}", e.to_code());
                return deliver_serialized_json(&e.to_response(), StatusCode::BAD_REQUEST);
            }
        }
    };

    if let Err(e) = validate_login(&login_data) {
        warn!("Admin login validation failed: {:?}", e.to_code());
        return deliver_serialized_json(&e.to_response(), StatusCode::BAD_REQUEST);
    }

    match attempt_login(&login_data, &state) {
        Ok((user, token)) => {
            info!("Admin logged in successfully: {} ({})", user.email, user.id);

            let token_expiry_secs = state.config.auth.token_expiry_secs();

            // The token is stored both in the cookie and returned in the JSON
            // body so the frontend can send it as a Bearer header on
            // subsequent requests.
            let admin_cookie = utils::create_persistent_cookie(
                &state.config.auth.admin_cookie,
                &token,
                std::time::Duration::from_secs(token_expiry_secs),
                state.config.auth.secure_cookies,
            )
            .context("Failed to create admin token cookie")?;

            let response_data = LoginResponse::Success {
                token,
                user,
                expires_in: token_expiry_secs,
                message: "Admin login successful".to_string(),
                redirect: "/admin".to_string(),
            };

            let json =
                serde_json::to_string(&response_data).context("Failed to serialize response")?;

            let response = Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .header("set-cookie", admin_cookie)
                .body(full(Bytes::from(json)))
                .context("Failed to build response")?;

            Ok(response)
        }
        Err(e) => {
            warn!("Admin login failed: {:?}", e.to_code());
            deliver_serialized_json(&e.to_response(), StatusCode::UNAUTHORIZED)
        }
    }
}

/// Parse login JSON data
async fn parse_login_json(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<LoginData, LoginError> {
    let body = req
        .collect()
        .await
        .map_err(|_| LoginError::InternalError)?
        .to_bytes();

    serde_json::from_slice::<LoginData>(&body).map_err(|e| {
        error!("Failed to parse admin login JSON: {}", e);
        LoginError::InternalError
    })
}

/// Parse login form data
async fn parse_login_form(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<LoginData, LoginError> {
    let body = req
        .collect()
        .await
        .map_err(|_| LoginError::InternalError)?
        .to_bytes();

    let params = form_urlencoded::parse(body.as_ref())
        .into_owned()
        .collect::<HashMap<String, String>>();

    let email = params
        .get("email")
        .ok_or(LoginError::MissingField("email".to_string()))?
        .trim()
        .to_string();

    let password = params
        .get("password")
        .ok_or(LoginError::MissingField("password".to_string()))?
        .to_string();

    Ok(LoginData { email, password })
}

/// Validate login data
fn validate_login(data: &LoginData) -> std::result::Result<(), LoginError> {
    if data.email.is_empty() {
        return Err(LoginError::MissingField("email".to_string()));
    }
    if data.password.is_empty() {
        return Err(LoginError::MissingField("password".to_string()));
    }
    Ok(())
}

/// Check credentials against the admin directory and mint a token.
fn attempt_login(
    data: &LoginData,
    state: &AppState,
) -> std::result::Result<(AdminUser, String), LoginError> {
    info!("Attempting admin login for: {}", data.email);

    let user = state
        .admins
        .authenticate(&data.email, &data.password)
        .ok_or_else(|| {
            warn!("Invalid credentials for: {}", data.email);
            LoginError::InvalidCredentials
        })?;

    let token = token::issue(&TokenRequest {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        permissions: user.permissions.clone(),
    });

    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::claims::Role;
    use shared::types::server_config::AppConfig;

    fn test_state() -> AppState {
        let config: AppConfig = toml::from_str("[server]\nbind = \"127.0.0.1\"\n").unwrap();
        AppState::new(config)
    }

    #[test]
    fn seeded_admin_can_log_in() {
        let state = test_state();
        let data = LoginData {
            email: "admin@si-umkm.com".to_string(),
            password: "admin123".to_string(),
        };

        let (user, token) = attempt_login(&data, &state).unwrap();
        assert_eq!(user.role, Role::Admin);

        let claims = token::verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "admin@si-umkm.com");
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let state = test_state();
        let data = LoginData {
            email: "admin@si-umkm.com".to_string(),
            password: "nope".to_string(),
        };

        let err = attempt_login(&data, &state).unwrap_err();
        assert_eq!(err.to_code(), "INVALID_CREDENTIALS");
    }

    #[test]
    fn empty_fields_fail_validation() {
        let missing = validate_login(&LoginData {
            email: String::new(),
            password: "x".to_string(),
        })
        .unwrap_err();
        assert_eq!(missing.to_code(), "MISSING_FIELD");
    }

    #[test]
    fn super_admin_token_carries_wildcard_permission() {
        let state = test_state();
        let data = LoginData {
            email: "superadmin@si-umkm.com".to_string(),
            password: "admin123".to_string(),
        };

        let (_, token) = attempt_login(&data, &state).unwrap();
        let claims = token::verify(&token).unwrap();
        assert_eq!(claims.role, Role::SuperAdmin);
        assert!(claims.has_permission("anything:at-all"));
    }
}
