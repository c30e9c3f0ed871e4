use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProjectId, SessionId, UserId};
use super::pagination::PageParams;
use super::project::Project;
use crate::{Error, Result};

/// A clock-in/clock-out record.
///
/// `end_at` is `None` while the session is open. A user owns at most one open
/// session at a time; the storage layer enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl WorkSession {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.end_at.is_none()
    }

    /// Elapsed time, measuring an open session against `now`.
    #[must_use]
    pub fn duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.end_at.unwrap_or(now) - self.start_at
    }
}

/// Session to be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkSession {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub note: String,
    pub start_at: DateTime<Utc>,
}

/// Outcome of closing a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppedSession {
    pub session_id: SessionId,
    pub owner: UserId,
    pub end_at: DateTime<Utc>,
}

/// Columns a session listing may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    StartAt,
    EndAt,
    CreatedAt,
    ProjectId,
    UserId,
}

impl SortColumn {
    const ALLOWED: [(&'static str, Self); 6] = [
        ("id", Self::Id),
        ("start_at", Self::StartAt),
        ("end_at", Self::EndAt),
        ("created_at", Self::CreatedAt),
        ("project_id", Self::ProjectId),
        ("user_id", Self::UserId),
    ];

    const fn column(self) -> &'static str {
        match self {
            Self::Id => "ws.id",
            Self::StartAt => "ws.start_at",
            Self::EndAt => "ws.end_at",
            Self::CreatedAt => "ws.created_at",
            Self::ProjectId => "ws.project_id",
            Self::UserId => "ws.user_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated ordering for session listings.
///
/// Parsed from keys such as `start_at` or `-start_at` (descending). Anything
/// outside the allow-list is rejected, so the rendered clause never carries
/// caller text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSort {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SessionSort {
    fn default() -> Self {
        Self {
            column: SortColumn::StartAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SessionSort {
    /// Parse an optional sort key, falling back to newest-first.
    pub fn parse(key: Option<&str>) -> Result<Self> {
        let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(Self::default());
        };

        let (direction, name) = match key.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, key),
        };

        SortColumn::ALLOWED
            .iter()
            .find(|(allowed, _)| *allowed == name)
            .map(|(_, column)| Self {
                column: *column,
                direction,
            })
            .ok_or_else(|| Error::InvalidInput(format!("invalid sort parameter: {key}")))
    }

    /// `ORDER BY` body, with `id` as a tie-breaker in the same direction.
    #[must_use]
    pub fn to_sql(self) -> String {
        let dir = self.direction.as_sql();
        if self.column == SortColumn::Id {
            format!("ws.id {dir}")
        } else {
            format!("{} {dir} NULLS LAST, ws.id {dir}", self.column.column())
        }
    }
}

/// Filter for session listings
#[derive(Debug, Clone, Default)]
pub struct SessionListFilter {
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub sort: SessionSort,
    pub page: PageParams,
}

impl SessionListFilter {
    /// Search term with surrounding whitespace removed, if any is left.
    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// User columns shown next to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

/// Session columns of a listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub id: SessionId,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Inactive,
}

impl SessionState {
    #[must_use]
    pub const fn from_end(end_at: Option<DateTime<Utc>>) -> Self {
        if end_at.is_none() {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// A session joined with its user and project display data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub user: SessionUser,
    pub project: Project,
    pub session: SessionDetails,
    pub status: SessionState,
}
