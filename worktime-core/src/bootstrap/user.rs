//! Administrator bootstrap

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    config::BootstrapConfig,
    models::{NewUser, UserRole},
    repository::{UserRepository, UserStore},
    service::auth::hash_password,
    Result,
};

/// Create the first administrator if enabled and none exists yet
///
/// Call after migrations and before serving requests.
pub async fn bootstrap_admin_user(pool: &PgPool, config: &BootstrapConfig) -> Result<()> {
    if !config.create_admin {
        info!("Admin bootstrap disabled in config");
        return Ok(());
    }

    let repository = UserRepository::new(pool.clone());

    if repository.admin_exists().await? {
        info!("Admin user already exists, skipping bootstrap");
        return Ok(());
    }

    if repository.get_by_email(&config.admin_email).await?.is_some() {
        warn!(
            email = %config.admin_email,
            "Bootstrap email belongs to a non-admin user, skipping admin creation"
        );
        return Ok(());
    }

    let password_hash = hash_password(&config.admin_password).await?;
    let admin = repository
        .create(&NewUser {
            name: config.admin_name.clone(),
            email: config.admin_email.clone(),
            password_hash,
            role: UserRole::Admin,
        })
        .await?;

    info!(user_id = %admin.id, email = %admin.email, "Admin user created");

    Ok(())
}
