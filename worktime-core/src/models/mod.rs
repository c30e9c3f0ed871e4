pub mod event;
pub mod id;
pub mod pagination;
pub mod project;
pub mod report;
pub mod user;
pub mod work_session;

pub use event::{SessionEvent, SessionStarted, SessionStopped};
pub use id::{ProjectId, SessionId, StatusId, UserId};
pub use pagination::{Page, PageMetadata, PageParams};
pub use project::{NewProject, Project, ProjectStatus, ProjectUpdate};
pub use report::{
    format_duration, ProjectSummary, SummaryBucket, SummaryFilter, SummaryRange, SummaryReport,
    Totals, UserSummary,
};
pub use user::{IssuedResetToken, NewUser, Principal, User, UserRole};
pub use work_session::{
    NewWorkSession, SessionDetails, SessionListFilter, SessionRow, SessionSort, SessionState,
    SessionUser, SortColumn, SortDirection, StoppedSession, WorkSession,
};
