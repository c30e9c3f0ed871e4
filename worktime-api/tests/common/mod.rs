#![allow(dead_code)]
//! Common test utilities.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use worktime_api::{create_router, AppState};
use worktime_core::{
    bootstrap::Services,
    clock::SystemClock,
    config::{EventsConfig, ServerConfig, SessionsConfig},
    models::{
        NewProject, NewUser, NewWorkSession, Project, ProjectId, ProjectStatus, ProjectUpdate,
        SessionDetails, SessionId, SessionListFilter, SessionRow, SessionState, SessionUser,
        StatusId, StoppedSession, SummaryBucket, SummaryFilter, SummaryRange, SummaryReport, User,
        UserId, UserRole, WorkSession,
    },
    repository::{ProjectCatalog, ProjectDirectory, ResetTokenStore, SessionLedger, UserStore},
    service::{JwtService, JwtValidator, ProjectService, UserService, WorkSessionService},
    Error, Result,
};
use worktime_hub::EventHub;

pub const SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

/// In-memory ledger with the same one-open-session rule as the database.
#[derive(Default)]
pub struct MemoryLedger {
    sessions: Mutex<Vec<WorkSession>>,
}

#[async_trait]
impl SessionLedger for MemoryLedger {
    async fn start(&self, session: NewWorkSession) -> Result<WorkSession> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions
            .iter()
            .any(|s| s.user_id == session.user_id && s.end_at.is_none())
        {
            return Err(Error::Conflict("active session exists".to_string()));
        }

        let created = WorkSession {
            id: SessionId::new(i64::try_from(sessions.len()).unwrap() + 1),
            user_id: session.user_id,
            project_id: session.project_id,
            start_at: session.start_at,
            end_at: None,
            note: session.note,
            created_at: session.start_at,
        };
        sessions.push(created.clone());
        Ok(created)
    }

    async fn stop(
        &self,
        session_id: SessionId,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<StoppedSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.end_at.is_none() && owner.map_or(true, |o| o == s.user_id))
            .ok_or_else(|| Error::NotFound("no active session".to_string()))?;

        let end_at = now.max(session.start_at);
        session.end_at = Some(end_at);

        Ok(StoppedSession {
            session_id,
            owner: session.user_id,
            end_at,
        })
    }

    async fn list(&self, filter: &SessionListFilter) -> Result<(Vec<SessionRow>, u64)> {
        let sessions = self.sessions.lock().unwrap();
        let matching: Vec<_> = sessions
            .iter()
            .rev()
            .filter(|s| filter.user_id.map_or(true, |u| u == s.user_id))
            .filter(|s| filter.project_id.map_or(true, |p| p == s.project_id))
            .filter(|s| filter.active.map_or(true, |a| a == s.is_active()))
            .collect();

        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(usize::try_from(filter.page.offset()).unwrap())
            .take(usize::try_from(filter.page.limit()).unwrap())
            .map(row)
            .collect();

        Ok((rows, total))
    }

    async fn summary_by_range(
        &self,
        range: SummaryRange,
        filter: SummaryFilter,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport> {
        let sessions = self.sessions.lock().unwrap();
        let buckets = sessions
            .iter()
            .filter(|s| s.start_at >= range.start() && s.start_at < range.end())
            .filter(|s| filter.user_id.map_or(true, |u| u == s.user_id))
            .map(|s| SummaryBucket {
                user_id: s.user_id,
                user_name: format!("user {}", s.user_id),
                user_email: format!("user{}@example.com", s.user_id),
                user_is_active: true,
                project_id: s.project_id,
                project_name: format!("project {}", s.project_id),
                project_status: None,
                total_sessions: 1,
                total_seconds: s.duration(now).num_seconds(),
            })
            .collect();

        Ok(SummaryReport::from_buckets(range, filter, buckets))
    }
}

fn row(session: &WorkSession) -> SessionRow {
    SessionRow {
        user: SessionUser {
            user_id: session.user_id,
            name: format!("user {}", session.user_id),
            email: format!("user{}@example.com", session.user_id),
            is_active: true,
        },
        project: Project {
            id: session.project_id,
            name: format!("project {}", session.project_id),
            status: None,
        },
        session: SessionDetails {
            id: session.id,
            start_at: session.start_at,
            end_at: session.end_at,
            note: session.note.clone(),
            created_at: session.created_at,
        },
        status: SessionState::from_end(session.end_at),
    }
}

/// Statuses seeded by the initial migration
pub const STATUSES: [(i64, &str); 3] = [(1, "planning"), (2, "in progress"), (3, "completed")];

/// In-memory projects, seeded with ids 1 and 2
pub struct MemoryProjects {
    projects: Mutex<Vec<Project>>,
}

impl Default for MemoryProjects {
    fn default() -> Self {
        let projects = [1, 2]
            .into_iter()
            .map(|id| Project {
                id: ProjectId::new(id),
                name: format!("project {id}"),
                status: None,
            })
            .collect();
        Self {
            projects: Mutex::new(projects),
        }
    }
}

fn status(id: StatusId) -> Result<ProjectStatus> {
    STATUSES
        .iter()
        .find(|(sid, _)| *sid == id.as_i64())
        .map(|(sid, name)| ProjectStatus {
            id: StatusId::new(*sid),
            name: (*name).to_string(),
        })
        .ok_or_else(|| Error::InvalidInput("status does not exist".to_string()))
}

#[async_trait]
impl ProjectDirectory for MemoryProjects {
    async fn project_exists(&self, project_id: ProjectId) -> Result<bool> {
        Ok(self.projects.lock().unwrap().iter().any(|p| p.id == project_id))
    }
}

#[async_trait]
impl ProjectCatalog for MemoryProjects {
    async fn create(&self, project: NewProject) -> Result<Project> {
        let status = project.status_id.map(status).transpose()?;
        let mut projects = self.projects.lock().unwrap();
        let created = Project {
            id: ProjectId::new(i64::try_from(projects.len()).unwrap() + 1),
            name: project.name,
            status,
        };
        projects.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let mut projects = self.projects.lock().unwrap().clone();
        projects.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(projects)
    }

    async fn update(&self, project_id: ProjectId, update: ProjectUpdate) -> Result<Project> {
        let new_status = update.status_id.map(status).transpose()?;
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::NotFound("project not found".to_string()))?;
        if let Some(name) = update.name {
            project.name = name;
        }
        if new_status.is_some() {
            project.status = new_status;
        }
        Ok(project.clone())
    }

    async fn statuses(&self) -> Result<Vec<ProjectStatus>> {
        STATUSES.iter().map(|(id, _)| status(StatusId::new(*id))).collect()
    }
}

/// In-memory accounts keyed by lowercased email
#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn create(&self, user: &NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        let email = user.email.to_lowercase();
        if users.iter().any(|u| u.email == email) {
            return Err(Error::Conflict("Email already registered".to_string()));
        }
        let created = User {
            // Clear of the ids the tests hand out directly
            id: UserId::new(100 + i64::try_from(users.len()).unwrap()),
            name: user.name.clone(),
            email,
            password_hash: user.password_hash.clone(),
            role: user.role,
            is_active: true,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn update_password(&self, user_id: UserId, password_hash: &str) -> Result<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| Error::NotFound("user not found".to_string()))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

/// In-memory reset tokens: hash -> (owner, expiry, used)
#[derive(Default)]
pub struct MemoryResetTokens {
    tokens: Mutex<HashMap<String, (UserId, DateTime<Utc>, bool)>>,
}

#[async_trait]
impl ResetTokenStore for MemoryResetTokens {
    async fn create(&self, user_id: UserId, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.tokens
            .lock()
            .unwrap()
            .insert(token_hash.to_string(), (user_id, expires_at, false));
        Ok(())
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<UserId>> {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get_mut(token_hash) {
            Some((user_id, expires_at, used)) if !*used && *expires_at > now => {
                *used = true;
                Ok(Some(*user_id))
            }
            _ => Ok(None),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub hub: EventHub,
    pub shutdown: CancellationToken,
    jwt_service: JwtService,
}

impl TestApp {
    /// Bearer header value for a user with `role`
    pub fn bearer(&self, user_id: i64, role: UserRole) -> String {
        let user = User {
            id: UserId::new(user_id),
            name: format!("user {user_id}"),
            email: format!("user{user_id}@example.com"),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        format!("Bearer {}", self.jwt_service.sign_token(&user).unwrap().token)
    }
}

/// Router over in-memory stores, with projects 1 and 2 already present.
pub async fn test_app() -> TestApp {
    let hub = EventHub::default();
    let jwt_service = JwtService::new(SECRET, chrono::Duration::hours(24)).unwrap();
    let projects = Arc::new(MemoryProjects::default());

    let work_session_service = WorkSessionService::new(
        Arc::new(MemoryLedger::default()),
        projects.clone(),
        Arc::new(hub.clone()),
        Arc::new(SystemClock),
        SessionsConfig::default(),
    );
    let user_service = UserService::new(
        Arc::new(MemoryUsers::default()),
        Arc::new(MemoryResetTokens::default()),
        Arc::new(SystemClock),
        jwt_service.clone(),
    );

    let services = Services {
        work_session_service: Arc::new(work_session_service),
        user_service: Arc::new(user_service),
        project_service: Arc::new(ProjectService::new(projects)),
        jwt_validator: JwtValidator::new(Arc::new(jwt_service.clone())),
    };

    let shutdown = CancellationToken::new();
    let state = AppState::new(services, hub.clone(), &EventsConfig::default(), shutdown.clone());

    TestApp {
        router: create_router(state, &ServerConfig::default()),
        hub,
        shutdown,
        jwt_service,
    }
}

pub fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
