// Module: http
// HTTP/JSON API over the session services

pub mod auth;
pub mod error;
pub mod events;
pub mod health;
pub mod middleware;
pub mod projects;
pub mod sessions;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use worktime_core::{
    bootstrap::Services,
    config::{EventsConfig, ServerConfig},
    service::{JwtValidator, ProjectService, UserService, WorkSessionService},
};
use worktime_hub::EventHub;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub work_session_service: Arc<WorkSessionService>,
    pub user_service: Arc<UserService>,
    pub project_service: Arc<ProjectService>,
    pub jwt_validator: JwtValidator,
    pub hub: EventHub,
    pub keepalive_interval: Duration,
    /// Cancelled on server shutdown; ends every open event stream
    pub shutdown: CancellationToken,
}

impl AppState {
    #[must_use]
    pub fn new(services: Services, hub: EventHub, events: &EventsConfig, shutdown: CancellationToken) -> Self {
        Self {
            work_session_service: services.work_session_service,
            user_service: services.user_service,
            project_service: services.project_service,
            jwt_validator: services.jwt_validator,
            hub,
            keepalive_interval: Duration::from_secs(events.keepalive_interval_seconds),
            shutdown,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let router = Router::new()
        // Liveness check for load balancers
        .merge(health::create_health_router())
        // Accounts and authentication
        .route("/api/v1/users", post(users::register))
        .route("/api/v1/users/password-reset", post(users::reset_password))
        .route("/api/v1/tokens/authentication", post(auth::login))
        .route("/api/v1/tokens/password-reset", post(auth::issue_reset_token))
        // Projects
        .route(
            "/api/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route("/api/v1/projects/{id}", patch(projects::update_project))
        .route("/api/v1/statuses", get(projects::list_statuses))
        // Work sessions
        .route("/api/v1/sessions", get(sessions::list_sessions))
        .route("/api/v1/sessions/start", post(sessions::start_session))
        .route("/api/v1/sessions/summary", get(sessions::summary))
        .route("/api/v1/sessions/{id}/stop", patch(sessions::stop_session))
        // Real-time session events
        .route("/api/v1/events", get(events::event_stream));

    let router = router
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http());

    // Apply state to all routes (must be last)
    router.with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
