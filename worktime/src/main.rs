mod server;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use worktime_core::{
    bootstrap::{bootstrap_admin_user, init_database, init_services, load_config},
    logging,
};
use worktime_hub::EventHub;

use server::WorktimeServer;

/// Work session tracking server
#[derive(Debug, Parser)]
#[command(name = "worktime", version, about)]
struct Cli {
    /// Path to a YAML or TOML config file
    #[arg(short, long, env = "WORKTIME_CONFIG_PATH")]
    config: Option<String>,

    /// HTTP port, overriding `server.http_port`
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.http_port = port;
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Worktime server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Initialize database
    let pool = init_database(&config.database).await?;

    // 4. Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");

    // 5. Bootstrap admin user (if enabled and no admin exists)
    if let Err(e) = bootstrap_admin_user(&pool, &config.bootstrap).await {
        error!("Failed to bootstrap admin user: {}", e);
        error!("You may need to manually create an admin user");
    }

    // 6. Event hub and services
    let hub = EventHub::new(config.events.mailbox_capacity);
    info!(mailbox_capacity = config.events.mailbox_capacity, "EventHub initialized");

    let services = init_services(pool.clone(), &config, Arc::new(hub.clone()))?;

    // 7. Serve until shutdown
    WorktimeServer::new(config, services, hub, pool).start().await
}
