use serde::{Deserialize, Serialize};

/// Uniform error body for the security pipeline: `{ "error": ..., "code": ... }`.
///
/// `code` is a machine-readable string (e.g. `CSRF_TOKEN_INVALID`) that lets
/// clients react programmatically — re-fetch a CSRF token, redirect to the
/// login page — without parsing the human-readable message.  It is omitted
/// from the JSON entirely when not set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_string(),
            code: None,
        }
    }

    pub fn with_code(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: Some(code.to_string()),
        }
    }
}
