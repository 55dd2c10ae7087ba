use serde::{Deserialize, Serialize};

/// Principal roles carried in every token.
///
/// Roles and permissions are separate axes: a `SuperAdmin` with the wildcard
/// permission `*` passes any *permission* check, but a route that requires
/// `SuperAdmin` still rejects an `Admin` token — the wildcard never widens
/// the role itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims embedded in every token issued by the gateway.
///
/// Immutable once issued — a role or permission change only takes effect on
/// the next login, when a fresh token is minted.  Expiry is time-based; there
/// is no revocation list, so a stolen token stays valid until `exp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Standard subject — the admin user id (e.g. `"admin-1"`).
    pub sub: String,

    /// Login email, embedded so handlers can attribute actions without a
    /// directory lookup.
    pub email: String,

    /// Principal role, checked by the route tiers.
    pub role: Role,

    /// Permission strings such as `"write:products"`.  `"*"` grants all
    /// permissions (but see [`Role`] — it does not grant roles).
    pub permissions: Vec<String>,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: u64,

    /// Expiry (Unix timestamp, seconds).  A token with `exp <= now` must be
    /// treated as invalid by every consumer.
    pub exp: u64,
}

impl Claims {
    /// Permission check with wildcard support.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == "*" || p == permission)
    }
}
