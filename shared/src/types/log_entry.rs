use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One finalized request record.
///
/// Created when the request arrives, finalized when the response (or the
/// 500 produced from a handler failure) is ready, and never mutated after
/// that.  Serialized camelCase for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLogEntry {
    /// Request arrival time, Unix epoch milliseconds.
    pub timestamp: u64,
    pub method: String,
    pub path: String,
    /// Decoded query parameters.  Repeated keys keep the last value.
    pub query: HashMap<String, String>,
    /// Best-effort client address from proxy headers.
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// Elapsed handler time in milliseconds.
    pub response_time: u64,
    pub status_code: u16,
    /// Present only when the wrapped handler failed; holds its message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
