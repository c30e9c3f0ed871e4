use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    models::{Principal, User, UserId, UserRole},
    Error, Result,
};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// User role (admin, user)
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId> {
        self.sub
            .parse()
            .map_err(|_| Error::Authentication("Invalid subject in token".to_string()))
    }

    pub fn role(&self) -> Result<UserRole> {
        UserRole::from_str(&self.role)
            .map_err(|_| Error::Authentication(format!("Invalid role in token: {}", self.role)))
    }

    /// The caller these claims identify
    pub fn principal(&self) -> Result<Principal> {
        Ok(Principal::new(self.user_id()?, self.role()?))
    }
}

/// A freshly signed access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

/// Signs and verifies HS256 access tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    ttl: Duration,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtService {
    /// Create a JWT service from a shared secret
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::Internal("JWT secret must not be empty".to_string()));
        }
        if ttl <= Duration::zero() {
            return Err(Error::Internal("JWT lifetime must be positive".to_string()));
        }

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            ttl,
        })
    }

    /// Sign an access token for a user
    pub fn sign_token(&self, user: &User) -> Result<IssuedToken> {
        self.sign_token_at(user, Utc::now())
    }

    fn sign_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expiry = now + self.ttl;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))?;

        Ok(IssuedToken { token, expiry })
    }

    /// Verify a token and extract claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 60; // clock skew

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    Error::Authentication("Token expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    Error::Authentication("Invalid token signature".to_string())
                }
                _ => Error::Authentication("Invalid token".to_string()),
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(7),
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let service = JwtService::new(SECRET, Duration::hours(24)).unwrap();
        let issued = service.sign_token(&user(UserRole::Admin)).unwrap();

        let claims = service.verify_token(&issued.token).unwrap();
        assert_eq!(claims.email, "grace@example.com");
        assert_eq!(claims.exp, issued.expiry.timestamp());

        let principal = claims.principal().unwrap();
        assert_eq!(principal.user_id, UserId::new(7));
        assert!(principal.is_admin());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(SECRET, Duration::hours(1)).unwrap();
        let issued = service
            .sign_token_at(&user(UserRole::User), Utc::now() - Duration::hours(3))
            .unwrap();

        let err = service.verify_token(&issued.token).unwrap_err();
        assert!(matches!(err, Error::Authentication(msg) if msg == "Token expired"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = JwtService::new(SECRET, Duration::hours(1)).unwrap();
        let verifier = JwtService::new(b"another-secret-another-secret-xx", Duration::hours(1)).unwrap();
        let issued = signer.sign_token(&user(UserRole::User)).unwrap();

        assert!(matches!(verifier.verify_token(&issued.token), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let service = JwtService::new(SECRET, Duration::hours(1)).unwrap();
        assert!(matches!(service.verify_token("not.a.jwt"), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_invalid_construction() {
        assert!(JwtService::new(b"", Duration::hours(1)).is_err());
        assert!(JwtService::new(SECRET, Duration::zero()).is_err());
    }
}
