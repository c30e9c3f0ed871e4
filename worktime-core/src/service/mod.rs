pub mod auth;
pub mod events;
pub mod project;
pub mod user;
pub mod work_session;

pub use auth::{JwtService, JwtValidator};
pub use events::EventPublisher;
pub use project::ProjectService;
pub use user::UserService;
pub use work_session::{ListSessionsQuery, SummaryQuery, WorkSessionService};
