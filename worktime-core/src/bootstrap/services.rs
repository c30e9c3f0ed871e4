//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    clock::SystemClock,
    repository::{ProjectRepository, ResetTokenRepository, UserRepository, WorkSessionRepository},
    service::{EventPublisher, JwtService, JwtValidator, ProjectService, UserService, WorkSessionService},
    Config,
};

/// Container for the initialized services
#[derive(Clone, Debug)]
pub struct Services {
    /// Session start/stop/list/summary
    pub work_session_service: Arc<WorkSessionService>,
    /// Registration, login and password reset
    pub user_service: Arc<UserService>,
    /// Project administration and status lookup
    pub project_service: Arc<ProjectService>,
    /// Bearer token validation
    pub jwt_validator: JwtValidator,
}

/// Build repositories and services on top of `pool`
///
/// `publisher` receives session lifecycle events; normally the in-process
/// event hub.
pub fn init_services(
    pool: PgPool,
    config: &Config,
    publisher: Arc<dyn EventPublisher>,
) -> anyhow::Result<Services> {
    let ttl_hours = i64::try_from(config.jwt.access_token_duration_hours)?;
    let jwt_service = JwtService::new(config.jwt.secret.as_bytes(), chrono::Duration::hours(ttl_hours))?;

    let work_session_service = WorkSessionService::new(
        Arc::new(WorkSessionRepository::new(pool.clone())),
        Arc::new(ProjectRepository::new(pool.clone())),
        publisher,
        Arc::new(SystemClock),
        config.sessions.clone(),
    );
    let user_service = UserService::new(
        Arc::new(UserRepository::new(pool.clone())),
        Arc::new(ResetTokenRepository::new(pool.clone())),
        Arc::new(SystemClock),
        jwt_service.clone(),
    );
    let project_service = ProjectService::new(Arc::new(ProjectRepository::new(pool)));

    info!(
        stop_policy = ?config.sessions.stop_policy,
        "Services initialized"
    );

    Ok(Services {
        work_session_service: Arc::new(work_session_service),
        user_service: Arc::new(user_service),
        project_service: Arc::new(project_service),
        jwt_validator: JwtValidator::new(Arc::new(jwt_service)),
    })
}
