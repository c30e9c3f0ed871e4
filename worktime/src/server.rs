//! Server lifecycle management
//!
//! Runs the HTTP server and tears everything down on SIGTERM or Ctrl+C.

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use worktime_api::{create_router, AppState};
use worktime_core::{bootstrap::Services, Config};
use worktime_hub::EventHub;

pub struct WorktimeServer {
    config: Config,
    services: Services,
    hub: EventHub,
    pool: PgPool,
}

impl WorktimeServer {
    pub const fn new(config: Config, services: Services, hub: EventHub, pool: PgPool) -> Self {
        Self {
            config,
            services,
            hub,
            pool,
        }
    }

    /// Serve HTTP until a shutdown signal arrives
    pub async fn start(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();

        let state = AppState::new(
            self.services.clone(),
            self.hub.clone(),
            &self.config.events,
            shutdown.clone(),
        );
        let http_router = create_router(state, &self.config.server);

        let http_address = self.config.http_address();
        let http_addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;
        let listener = tokio::net::TcpListener::bind(http_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_addr}: {e}"))?;

        info!("HTTP server listening on {}", http_addr);

        let graceful = {
            let shutdown = shutdown.clone();
            async move {
                shutdown_signal().await;
                info!("Shutdown signal received, starting graceful shutdown...");
                // Ends every open event stream so the server can drain
                shutdown.cancel();
            }
        };

        if let Err(e) = axum::serve(listener, http_router)
            .with_graceful_shutdown(graceful)
            .await
        {
            error!("HTTP server error: {}", e);
        }
        info!("HTTP server shut down gracefully");

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        info!(
            open_streams = self.hub.connection_count(),
            "Shutting down Worktime server..."
        );

        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("Database pool closed");

        info!("Worktime server shut down complete");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C signal");
            }
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
