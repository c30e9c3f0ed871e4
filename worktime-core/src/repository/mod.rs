pub mod project;
pub mod reset_token;
pub mod user;
pub mod work_session;

pub use project::{ProjectCatalog, ProjectDirectory, ProjectRepository};
pub use reset_token::{ResetTokenRepository, ResetTokenStore};
pub use user::{UserRepository, UserStore};
pub use work_session::{SessionLedger, WorkSessionRepository};

#[cfg(test)]
pub use project::{MockProjectCatalog, MockProjectDirectory};
#[cfg(test)]
pub use reset_token::MockResetTokenStore;
#[cfg(test)]
pub use user::MockUserStore;
#[cfg(test)]
pub use work_session::MockSessionLedger;
