use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{
        NewWorkSession, Project, ProjectStatus, SessionDetails, SessionId, SessionListFilter,
        SessionRow, SessionState, SessionUser, StatusId, StoppedSession, SummaryBucket, SummaryFilter,
        SummaryRange, SummaryReport, UserId, WorkSession,
    },
    Error, Result,
};

/// Authoritative store of work sessions.
///
/// Implementations must enforce "at most one open session per user"
/// atomically at the storage layer; `start` reports a violation as
/// [`Error::Conflict`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Open a new session.
    async fn start(&self, session: NewWorkSession) -> Result<WorkSession>;

    /// Close an open session at `now` (never earlier than its start).
    ///
    /// With `owner` set, only a session owned by that user matches. A missing
    /// session, an already closed one and someone else's all report
    /// [`Error::NotFound`].
    async fn stop(
        &self,
        session_id: SessionId,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<StoppedSession>;

    /// One page of sessions with display data, plus the total match count.
    async fn list(&self, filter: &SessionListFilter) -> Result<(Vec<SessionRow>, u64)>;

    /// Session counts and durations in `range`, open sessions measured
    /// against `now`.
    async fn summary_by_range(
        &self,
        range: SummaryRange,
        filter: SummaryFilter,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport>;
}

/// Postgres-backed session ledger
#[derive(Clone)]
pub struct WorkSessionRepository {
    pool: PgPool,
}

impl WorkSessionRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const LIST_FILTER: &str = r"
    ($1::BIGINT IS NULL OR ws.user_id = $1)
    AND ($2::BIGINT IS NULL OR ws.project_id = $2)
    AND ($3::BOOLEAN IS NULL OR (ws.end_at IS NULL) = $3)
    AND ($4::TEXT IS NULL
         OR p.name ILIKE $4
         OR u.name ILIKE $4
         OR u.email ILIKE $4
         OR ws.note ILIKE $4)
";

#[async_trait]
impl SessionLedger for WorkSessionRepository {
    async fn start(&self, session: NewWorkSession) -> Result<WorkSession> {
        let row = sqlx::query(
            r"
            INSERT INTO work_sessions (user_id, project_id, start_at, note, created_at)
            VALUES ($1, $2, $3, $4, $3)
            RETURNING id, user_id, project_id, start_at, end_at, note, created_at
            ",
        )
        .bind(session.user_id)
        .bind(session.project_id)
        .bind(session.start_at)
        .bind(&session.note)
        .fetch_one(&self.pool)
        .await?;

        row_to_session(row)
    }

    async fn stop(
        &self,
        session_id: SessionId,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<StoppedSession> {
        let row = sqlx::query(
            r"
            UPDATE work_sessions
            SET end_at = GREATEST($3, start_at)
            WHERE id = $1
              AND end_at IS NULL
              AND ($2::BIGINT IS NULL OR user_id = $2)
            RETURNING id, user_id, end_at
            ",
        )
        .bind(session_id)
        .bind(owner)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("no active session".to_string()))?;

        Ok(StoppedSession {
            session_id: row.try_get("id")?,
            owner: row.try_get("user_id")?,
            end_at: row.try_get("end_at")?,
        })
    }

    async fn list(&self, filter: &SessionListFilter) -> Result<(Vec<SessionRow>, u64)> {
        let search = filter.search_term().map(|term| format!("{}%", escape_like(term)));

        let count_sql = format!(
            r"
            SELECT COUNT(*)
            FROM work_sessions ws
            JOIN users u ON u.id = ws.user_id
            JOIN projects p ON p.id = ws.project_id
            WHERE {LIST_FILTER}
            "
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.user_id)
            .bind(filter.project_id)
            .bind(filter.active)
            .bind(search.as_deref())
            .fetch_one(&self.pool)
            .await?;

        // ORDER BY comes from the sort allow-list, never from caller text
        let list_sql = format!(
            r"
            SELECT ws.id, ws.user_id, ws.project_id, ws.start_at, ws.end_at, ws.note, ws.created_at,
                   u.name AS user_name, u.email AS user_email, u.is_active AS user_is_active,
                   p.name AS project_name, s.id AS status_id, s.name AS status_name
            FROM work_sessions ws
            JOIN users u ON u.id = ws.user_id
            JOIN projects p ON p.id = ws.project_id
            LEFT JOIN statuses s ON s.id = p.status_id
            WHERE {LIST_FILTER}
            ORDER BY {order}
            LIMIT $5 OFFSET $6
            ",
            order = filter.sort.to_sql(),
        );
        let rows = sqlx::query(&list_sql)
            .bind(filter.user_id)
            .bind(filter.project_id)
            .bind(filter.active)
            .bind(search.as_deref())
            .bind(filter.page.limit())
            .bind(filter.page.offset())
            .fetch_all(&self.pool)
            .await?;

        let rows = rows
            .into_iter()
            .map(row_to_listing)
            .collect::<Result<Vec<_>>>()?;

        Ok((rows, u64::try_from(total).unwrap_or_default()))
    }

    async fn summary_by_range(
        &self,
        range: SummaryRange,
        filter: SummaryFilter,
        now: DateTime<Utc>,
    ) -> Result<SummaryReport> {
        let rows = sqlx::query(
            r"
            SELECT ws.user_id, u.name AS user_name, u.email AS user_email, u.is_active AS user_is_active,
                   ws.project_id, p.name AS project_name, s.name AS project_status,
                   COUNT(*) AS total_sessions,
                   COALESCE(
                       SUM(EXTRACT(EPOCH FROM (GREATEST(COALESCE(ws.end_at, $3), ws.start_at) - ws.start_at))),
                       0
                   )::BIGINT AS total_seconds
            FROM work_sessions ws
            JOIN users u ON u.id = ws.user_id
            JOIN projects p ON p.id = ws.project_id
            LEFT JOIN statuses s ON s.id = p.status_id
            WHERE ws.start_at >= $1
              AND ws.start_at < $2
              AND ($4::BIGINT IS NULL OR ws.user_id = $4)
              AND ($5::BIGINT IS NULL OR ws.project_id = $5)
            GROUP BY ws.user_id, u.name, u.email, u.is_active, ws.project_id, p.name, s.name
            ",
        )
        .bind(range.start())
        .bind(range.end())
        .bind(now)
        .bind(filter.user_id)
        .bind(filter.project_id)
        .fetch_all(&self.pool)
        .await?;

        let buckets = rows
            .into_iter()
            .map(row_to_bucket)
            .collect::<Result<Vec<_>>>()?;

        Ok(SummaryReport::from_buckets(range, filter, buckets))
    }
}

/// Escape `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_session(row: PgRow) -> Result<WorkSession> {
    Ok(WorkSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        project_id: row.try_get("project_id")?,
        start_at: row.try_get("start_at")?,
        end_at: row.try_get("end_at")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_listing(row: PgRow) -> Result<SessionRow> {
    let end_at: Option<DateTime<Utc>> = row.try_get("end_at")?;

    let status_id: Option<StatusId> = row.try_get("status_id")?;
    let status_name: Option<String> = row.try_get("status_name")?;
    let status = match (status_id, status_name) {
        (Some(id), Some(name)) => Some(ProjectStatus { id, name }),
        _ => None,
    };

    Ok(SessionRow {
        user: SessionUser {
            user_id: row.try_get("user_id")?,
            name: row.try_get("user_name")?,
            email: row.try_get("user_email")?,
            is_active: row.try_get("user_is_active")?,
        },
        project: Project {
            id: row.try_get("project_id")?,
            name: row.try_get("project_name")?,
            status,
        },
        session: SessionDetails {
            id: row.try_get("id")?,
            start_at: row.try_get("start_at")?,
            end_at,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        },
        status: SessionState::from_end(end_at),
    })
}

fn row_to_bucket(row: PgRow) -> Result<SummaryBucket> {
    Ok(SummaryBucket {
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        user_email: row.try_get("user_email")?,
        user_is_active: row.try_get("user_is_active")?,
        project_id: row.try_get("project_id")?,
        project_name: row.try_get("project_name")?,
        project_status: row.try_get("project_status")?,
        total_sessions: row.try_get("total_sessions")?,
        total_seconds: row.try_get("total_seconds")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("acme"), "acme");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
