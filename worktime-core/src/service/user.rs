use std::sync::Arc;

use chrono::Duration;
use nanoid::nanoid;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{
    clock::Clock,
    models::{IssuedResetToken, NewUser, Principal, User, UserRole},
    repository::{ResetTokenStore, UserStore},
    service::auth::{hash_password, validate_password, verify_password, IssuedToken, JwtService},
    Error, Result,
};

/// How long a password reset token stays redeemable
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 255;

/// Accounts: registration, login and password reset
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    reset_tokens: Arc<dyn ResetTokenStore>,
    clock: Arc<dyn Clock>,
    jwt_service: JwtService,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish()
    }
}

impl UserService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        reset_tokens: Arc<dyn ResetTokenStore>,
        clock: Arc<dyn Clock>,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            clock,
            jwt_service,
        }
    }

    /// Create a regular, active account
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();

        validate_name(name)?;
        validate_email(&email)?;
        validate_password(password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password).await?;
        let user = self
            .users
            .create(&NewUser {
                name: name.to_string(),
                email,
                password_hash,
                role: UserRole::User,
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Exchange email and password for an access token
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken)> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(Error::InvalidInput("email and password are required".to_string()));
        }

        let invalid = || Error::Authentication("invalid authentication credentials".to_string());

        let user = self.users.get_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash).await? {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(Error::Authentication("user account is not active".to_string()));
        }

        let token = self.jwt_service.sign_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok((user, token))
    }

    /// Issue a one-time reset token for the account behind `email`.
    ///
    /// Administrators only. The plain token is returned here and never stored.
    pub async fn issue_reset_token(&self, principal: &Principal, email: &str) -> Result<IssuedResetToken> {
        if !principal.is_admin() {
            return Err(Error::Authorization("only admins can issue reset tokens".to_string()));
        }

        let email = email.trim();
        if email.is_empty() {
            return Err(Error::InvalidInput("email is required".to_string()));
        }

        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound("user not found".to_string()))?;

        let token = nanoid!(32);
        let expires_at = self.clock.now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.reset_tokens
            .create(user.id, &hash_token(&token), expires_at)
            .await?;

        info!(user_id = %user.id, issued_by = %principal.user_id, "Password reset token issued");
        Ok(IssuedResetToken { token, expires_at })
    }

    /// Redeem a reset token and set a new password
    pub async fn reset_password(&self, token: &str, password: &str, confirm_password: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidInput("token is required".to_string()));
        }
        if password != confirm_password {
            return Err(Error::InvalidInput("passwords do not match".to_string()));
        }
        validate_password(password)?;

        let user_id = self
            .reset_tokens
            .consume(&hash_token(token), self.clock.now())
            .await?
            .ok_or_else(|| Error::InvalidInput("invalid or expired token".to_string()))?;

        let password_hash = hash_password(password).await?;
        self.users.update_password(user_id, &password_hash).await?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }
}

/// Hex SHA-256 of a reset token, the only form that is persisted
fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(Error::InvalidInput(format!(
            "email must be at most {MAX_EMAIL_LEN} characters"
        )));
    }

    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.contains(char::is_whitespace)
    });
    if !valid {
        return Err(Error::InvalidInput("invalid email".to_string()));
    }
    Ok(())
}
