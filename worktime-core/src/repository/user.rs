use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{NewUser, User, UserId, UserRole},
    Error, Result,
};

/// Account storage used by login, registration and password reset.
///
/// Emails are unique case-insensitively; `create` reports a duplicate as
/// [`Error::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Replace the password hash, or [`Error::NotFound`] for an unknown user.
    async fn update_password(&self, user_id: UserId, password_hash: &str) -> Result<()>;
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn admin_exists(&self) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin' LIMIT 1)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let row = sqlx::query(
            r"
            INSERT INTO users (name, email, password_hash, role, is_active, created_at)
            VALUES ($1, $2, $3, $4, TRUE, NOW())
            RETURNING id, name, email, password_hash, role, is_active, created_at
            ",
        )
        .bind(&user.name)
        .bind(user.email.to_lowercase())
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_user(row)
    }

    /// Emails are stored lowercased, so lookup is case-insensitive.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, is_active, created_at FROM users WHERE email = $1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_user).transpose()
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("user not found".to_string()));
        }
        Ok(())
    }
}

fn row_to_user(row: PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    let role = UserRole::from_str(&role).map_err(Error::Internal)?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}
