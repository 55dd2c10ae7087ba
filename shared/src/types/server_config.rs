use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Lifetime of issued admin tokens.  The wire format pins 7 days; this
    /// only controls the cookie `Max-Age`, which should match.
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: u64,

    /// Name of the cookie carrying the admin token.  The `Authorization:
    /// Bearer` header always takes priority over it.
    #[serde(default = "default_admin_cookie")]
    pub admin_cookie: String,

    /// Set the `Secure` flag on issued cookies.  Off by default so local
    /// plain-HTTP development works; turn on in production.
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// CSRF token lifetime.
    #[serde(default = "default_csrf_ttl_minutes")]
    pub csrf_ttl_minutes: u64,

    /// `session_id` cookie `Max-Age`.
    #[serde(default = "default_session_cookie_hours")]
    pub session_cookie_hours: u64,

    /// Request-log ring capacity; oldest entries are evicted past this.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Cadence of the background sweep evicting expired CSRF entries.
    /// Correctness does not depend on it — expiry is also checked lazily at
    /// verification time — this is memory hygiene only.
    #[serde(default = "default_cleanup_interval_minutes")]
    pub cleanup_interval_minutes: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:4000"`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    /// Token expiry converted to seconds — convenience for cookie `Max-Age`.
    pub fn token_expiry_secs(&self) -> u64 {
        self.token_expiry_days * 24 * 60 * 60
    }
}

impl SecurityConfig {
    pub fn csrf_ttl(&self) -> Duration {
        Duration::from_secs(self.csrf_ttl_minutes * 60)
    }

    pub fn session_cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.session_cookie_hours * 60 * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_minutes * 60)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_expiry_days: default_token_expiry_days(),
            admin_cookie: default_admin_cookie(),
            secure_cookies: false,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            csrf_ttl_minutes: default_csrf_ttl_minutes(),
            session_cookie_hours: default_session_cookie_hours(),
            log_capacity: default_log_capacity(),
            cleanup_interval_minutes: default_cleanup_interval_minutes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_port() -> u16 {
    4000
}

pub fn default_max_connections() -> usize {
    1024
}

pub fn default_token_expiry_days() -> u64 {
    7
}

pub fn default_admin_cookie() -> String {
    "admin_token".to_string()
}

pub fn default_csrf_ttl_minutes() -> u64 {
    60
}

pub fn default_session_cookie_hours() -> u64 {
    24
}

pub fn default_log_capacity() -> usize {
    1000
}

pub fn default_cleanup_interval_minutes() -> u64 {
    30
}
