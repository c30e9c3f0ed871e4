//! Bearer token validation for inbound requests

use std::sync::Arc;

use super::jwt::JwtService;
use crate::{models::Principal, Error, Result};

/// Maps an `Authorization` header to the calling principal
#[derive(Clone)]
pub struct JwtValidator {
    jwt_service: Arc<JwtService>,
}

impl JwtValidator {
    #[must_use]
    pub const fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Extract bearer token from Authorization header value
    ///
    /// The scheme is matched case-insensitively.
    pub fn extract_bearer_token(auth_value: &str) -> Result<&str> {
        let (scheme, token) = auth_value
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::Authentication("invalid or missing authentication token".to_string()))?;

        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return Err(Error::Authentication(
                "invalid or missing authentication token".to_string(),
            ));
        }

        Ok(token)
    }

    /// Validate a header value such as `Bearer <token>`
    pub fn validate_http(&self, auth_header: &str) -> Result<Principal> {
        let token = Self::extract_bearer_token(auth_header)?;
        self.jwt_service.verify_token(token)?.principal()
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserId, UserRole};
    use chrono::{Duration, Utc};

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(JwtValidator::extract_bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(JwtValidator::extract_bearer_token("bearer  abc ").unwrap(), "abc");
        assert!(JwtValidator::extract_bearer_token("Basic abc").is_err());
        assert!(JwtValidator::extract_bearer_token("Bearer").is_err());
        assert!(JwtValidator::extract_bearer_token("").is_err());
    }

    #[test]
    fn test_validate_http() {
        let jwt = Arc::new(JwtService::new(b"0123456789abcdef0123456789abcdef", Duration::hours(1)).unwrap());
        let validator = JwtValidator::new(jwt.clone());
        let user = User {
            id: UserId::new(11),
            name: "Lin".to_string(),
            email: "lin@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
        };
        let issued = jwt.sign_token(&user).unwrap();

        let principal = validator.validate_http(&format!("Bearer {}", issued.token)).unwrap();
        assert_eq!(principal.user_id, UserId::new(11));
        assert_eq!(principal.role, UserRole::User);

        assert!(validator.validate_http("Bearer nope").is_err());
    }
}
