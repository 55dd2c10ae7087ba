use hyper::StatusCode;
use thiserror::Error;

/// Why a token was rejected.  Converted to an HTTP response at the router
/// boundary — nothing here propagates past the request-logging layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Token does not split into three segments, or the payload is not
    /// base64url-encoded JSON.
    #[error("Invalid token format")]
    MalformedToken,

    /// `exp` has passed.
    #[error("Token expired")]
    TokenExpired,

    /// Token is valid but the role is not in the route's allowed set.
    #[error("Insufficient privileges")]
    InsufficientPrivileges,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedToken => "MALFORMED_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InsufficientPrivileges => "INSUFFICIENT_PRIVILEGES",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedToken | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::InsufficientPrivileges => StatusCode::FORBIDDEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_map_to_401() {
        assert_eq!(AuthError::MalformedToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn privilege_failure_maps_to_403() {
        assert_eq!(
            AuthError::InsufficientPrivileges.status(),
            StatusCode::FORBIDDEN
        );
    }
}
