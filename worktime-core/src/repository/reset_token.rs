use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{models::UserId, Result};

/// Storage for hashed one-time password reset tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn create(&self, user_id: UserId, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Mark an unused, unexpired token as used and return its owner.
    ///
    /// Each token is redeemable exactly once, even under concurrent attempts.
    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserId>>;
}

/// Postgres-backed reset tokens
#[derive(Clone)]
pub struct ResetTokenRepository {
    pool: PgPool,
}

impl ResetTokenRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for ResetTokenRepository {
    async fn create(&self, user_id: UserId, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO reset_tokens (user_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            ",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserId>> {
        let user_id = sqlx::query_scalar::<_, UserId>(
            r"
            UPDATE reset_tokens
            SET used_at = $2
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
            RETURNING user_id
            ",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }
}
