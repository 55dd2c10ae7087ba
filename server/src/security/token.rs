//! Admin token codec.
//!
//! Wire format (fixed for compatibility with the deployed dashboard):
//! three dot-delimited segments, each base64url (no padding) —
//! `header-json . payload-json . placeholder`.
//!
//! **The signature segment is decorative.**  Nothing verifies it; the token
//! is a readable claims envelope with an expiry, not a cryptographic proof.
//! Anyone who can forge the payload can mint a token.  A deployment that
//! needs real integrity must HMAC the first two segments and verify before
//! trusting any claim — that changes the wire contract, so it is not done
//! here.  Expiry checking and role gating still apply.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use shared::types::claims::{Claims, Role};

use super::error::AuthError;

/// Issued tokens live for 7 days.
const TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Claims supplied by the caller; `iat`/`exp` are stamped at issue time.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Mint a token for `request`, stamped `iat = now`, `exp = now + 7d`.
pub fn issue(request: &TokenRequest) -> String {
    issue_at(request, now_secs())
}

pub(crate) fn issue_at(request: &TokenRequest, now: u64) -> String {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let payload = json!({
        "sub": request.sub,
        "email": request.email,
        "role": request.role,
        "permissions": request.permissions,
        "iat": now,
        "exp": now + TOKEN_TTL_SECS,
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload.to_string());
    // Placeholder third segment — see module docs.
    let signature_b64 =
        URL_SAFE_NO_PAD.encode(format!("{}.{}.demo-signature", header_b64, payload_b64));

    debug!("Issued token for {} ({})", request.sub, request.role);

    format!("{}.{}.{}", header_b64, payload_b64, signature_b64)
}

/// Decode and validate a token.  Returns the claims when the token parses
/// into three segments, the payload is valid JSON, and `exp` has not passed.
pub fn verify(token: &str) -> Result<Claims, AuthError> {
    verify_at(token, now_secs())
}

pub(crate) fn verify_at(token: &str, now: u64) -> Result<Claims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::MalformedToken);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| AuthError::MalformedToken)?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|_| AuthError::MalformedToken)?;

    // The `exp <= now` boundary is deliberate: a token expiring this exact
    // second is already invalid.
    if claims.exp <= now {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

/// Role gate.  The `*` wildcard permission never satisfies a role check —
/// roles and permissions are independent axes.
pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPrivileges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin_request() -> TokenRequest {
        TokenRequest {
            sub: "admin-1".to_string(),
            email: "admin@si-umkm.com".to_string(),
            role: Role::Admin,
            permissions: vec!["read:products".to_string(), "write:products".to_string()],
        }
    }

    #[test]
    fn round_trip_preserves_identity() {
        let now = 1_700_000_000;
        let token = issue_at(&admin_request(), now);
        let claims = verify_at(&token, now).unwrap();

        assert_eq!(claims.sub, "admin-1");
        assert_eq!(claims.email, "admin@si-umkm.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.permissions.len(), 2);
        assert_eq!(claims.iat, now);
        assert_eq!(claims.exp, now + TOKEN_TTL_SECS);
    }

    #[test]
    fn token_has_three_base64url_segments() {
        let token = issue(&admin_request());
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            assert!(URL_SAFE_NO_PAD.decode(part).is_ok());
        }
    }

    #[test]
    fn two_segments_is_malformed() {
        assert_eq!(verify("abc.def"), Err(AuthError::MalformedToken));
    }

    #[test]
    fn four_segments_is_malformed() {
        assert_eq!(verify("a.b.c.d"), Err(AuthError::MalformedToken));
    }

    #[test]
    fn empty_string_is_malformed() {
        assert_eq!(verify(""), Err(AuthError::MalformedToken));
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let garbage = URL_SAFE_NO_PAD.encode("not json at all");
        let token = format!("{g}.{g}.{g}", g = garbage);
        assert_eq!(verify(&token), Err(AuthError::MalformedToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = 1_700_000_000;
        let token = issue_at(&admin_request(), now);
        assert_eq!(
            verify_at(&token, now + TOKEN_TTL_SECS + 1),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = 1_700_000_000;
        let token = issue_at(&admin_request(), now);
        // exp == now is already invalid.
        assert_eq!(
            verify_at(&token, now + TOKEN_TTL_SECS),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn role_check_accepts_listed_roles() {
        let now = 1_700_000_000;
        let token = issue_at(&admin_request(), now);
        let claims = verify_at(&token, now).unwrap();
        assert!(require_role(&claims, &[Role::Admin, Role::SuperAdmin]).is_ok());
    }

    #[test]
    fn wildcard_permission_does_not_widen_role() {
        let request = TokenRequest {
            sub: "admin-1".to_string(),
            email: "admin@si-umkm.com".to_string(),
            role: Role::Admin,
            permissions: vec!["*".to_string()],
        };
        let now = 1_700_000_000;
        let claims = verify_at(&issue_at(&request, now), now).unwrap();

        // `*` grants every permission...
        assert!(claims.has_permission("write:anything"));
        // ...but not the super_admin role.
        assert_eq!(
            require_role(&claims, &[Role::SuperAdmin]),
            Err(AuthError::InsufficientPrivileges)
        );
    }
}
