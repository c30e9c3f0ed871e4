use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    clock::Clock,
    config::{SessionsConfig, StopPolicy},
    models::{
        NewWorkSession, Page, PageParams, Principal, ProjectId, SessionEvent, SessionId,
        SessionListFilter, SessionRow, SessionSort, SessionStarted, SessionStopped, StoppedSession,
        SummaryFilter, SummaryRange, SummaryReport, UserId, WorkSession,
    },
    repository::{ProjectDirectory, SessionLedger},
    service::events::EventPublisher,
    Error, Result,
};

/// Raw listing parameters as received from a client
#[derive(Debug, Clone, Default)]
pub struct ListSessionsQuery {
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

/// Raw summary parameters as received from a client
#[derive(Debug, Clone, Default)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
}

/// Orchestrates session start/stop against the ledger and announces
/// successful changes.
///
/// Every write goes through here so that notification always follows a
/// committed change and never precedes or replaces it.
#[derive(Clone)]
pub struct WorkSessionService {
    ledger: Arc<dyn SessionLedger>,
    projects: Arc<dyn ProjectDirectory>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    settings: SessionsConfig,
}

impl std::fmt::Debug for WorkSessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkSessionService")
            .field("settings", &self.settings)
            .finish()
    }
}

impl WorkSessionService {
    #[must_use]
    pub fn new(
        ledger: Arc<dyn SessionLedger>,
        projects: Arc<dyn ProjectDirectory>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        settings: SessionsConfig,
    ) -> Self {
        Self {
            ledger,
            projects,
            publisher,
            clock,
            settings,
        }
    }

    /// Clock in `principal` on a project.
    pub async fn start(&self, principal: &Principal, project_id: ProjectId, note: &str) -> Result<WorkSession> {
        if !project_id.is_valid() {
            return Err(Error::InvalidInput("invalid project_id".to_string()));
        }

        let note = note.trim();
        if note.chars().count() > self.settings.max_note_length {
            return Err(Error::InvalidInput(format!(
                "note must not exceed {} characters",
                self.settings.max_note_length
            )));
        }

        if !self.projects.project_exists(project_id).await? {
            return Err(Error::InvalidInput("project does not exist".to_string()));
        }

        let session = self
            .ledger
            .start(NewWorkSession {
                user_id: principal.user_id,
                project_id,
                note: note.to_string(),
                start_at: self.clock.now(),
            })
            .await?;

        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            project_id = %session.project_id,
            "Work session started"
        );

        let delivered = self.publisher.publish(SessionEvent::SessionStarted(SessionStarted {
            session_id: session.id,
            user_id: session.user_id,
            project_id: session.project_id,
            start_at: session.start_at,
        }));
        debug!(session_id = %session.id, delivered, "Published session_started");

        Ok(session)
    }

    /// Clock out of an open session.
    ///
    /// Which sessions `principal` may close is governed by the configured
    /// [`StopPolicy`]. Sessions outside that reach look exactly like missing
    /// ones.
    pub async fn stop(&self, principal: &Principal, session_id: SessionId) -> Result<StoppedSession> {
        if !session_id.is_valid() {
            return Err(Error::InvalidInput("invalid session id".to_string()));
        }

        let owner = match self.settings.stop_policy {
            StopPolicy::OwnerOnly => Some(principal.user_id),
            StopPolicy::OwnerOrAdmin if principal.is_admin() => None,
            StopPolicy::OwnerOrAdmin => Some(principal.user_id),
            StopPolicy::AnyAuthenticated => None,
        };

        let stopped = self.ledger.stop(session_id, owner, self.clock.now()).await?;

        info!(
            session_id = %stopped.session_id,
            owner = %stopped.owner,
            stopped_by = %principal.user_id,
            "Work session stopped"
        );

        let delivered = self.publisher.publish(SessionEvent::SessionStopped(SessionStopped {
            session_id: stopped.session_id,
            user_id: stopped.owner,
            stopped_by: principal.user_id,
            end_at: stopped.end_at,
        }));
        debug!(session_id = %stopped.session_id, delivered, "Published session_stopped");

        Ok(stopped)
    }

    /// Page through sessions visible to `principal`.
    pub async fn list(&self, principal: &Principal, query: ListSessionsQuery) -> Result<Page<SessionRow>> {
        let page = PageParams::new(query.page, query.page_size)?;
        let sort = SessionSort::parse(query.sort.as_deref())?;

        let filter = SessionListFilter {
            user_id: principal.scope_user(query.user_id),
            project_id: query.project_id,
            active: query.active,
            search: query.search,
            sort,
            page,
        };

        let (rows, total) = self.ledger.list(&filter).await?;
        Ok(Page::new(rows, total, page))
    }

    /// Aggregate time per user and project over a date range.
    pub async fn summary(&self, principal: &Principal, query: SummaryQuery) -> Result<SummaryReport> {
        let range = SummaryRange::parse(query.from.as_deref(), query.to.as_deref())?;
        let filter = SummaryFilter {
            user_id: principal.scope_user(query.user_id),
            project_id: query.project_id,
        };

        self.ledger
            .summary_by_range(range, filter, self.clock.now())
            .await
    }
}
