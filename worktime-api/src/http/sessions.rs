// Work session HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use worktime_core::{
    models::{Page, ProjectId, SessionId, SessionRow, SummaryReport, UserId, WorkSession},
    service::{ListSessionsQuery, SummaryQuery},
};

use super::{middleware::AuthUser, AppError, AppResult, AppState};

/// Start request
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub project_id: i64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session: WorkSession,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub message: &'static str,
    pub session_id: SessionId,
    pub end_at: DateTime<Utc>,
}

/// Listing query string. Kept as raw text so malformed values get a JSON 400
/// rather than the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsParams {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub active: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub report: SummaryReport,
}

/// Clock the caller in on a project
pub async fn start_session(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<StartSessionRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<StartSessionResponse>)> {
    let Json(req) = payload?;

    let session = state
        .work_session_service
        .start(&principal, ProjectId::new(req.project_id), &req.note)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session,
            status: "active",
        }),
    ))
}

/// Clock out of an open session
pub async fn stop_session(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<StopSessionResponse>> {
    let Path(id) = id?;

    let stopped = state
        .work_session_service
        .stop(&principal, SessionId::new(id))
        .await?;

    Ok(Json(StopSessionResponse {
        message: "session stopped",
        session_id: stopped.session_id,
        end_at: stopped.end_at,
    }))
}

/// Page through sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(params): Query<ListSessionsParams>,
) -> AppResult<Json<Page<SessionRow>>> {
    let query = ListSessionsQuery {
        user_id: parse_id::<UserId>("user_id", params.user_id.as_deref(), UserId::is_valid)?,
        project_id: parse_id::<ProjectId>("project_id", params.project_id.as_deref(), ProjectId::is_valid)?,
        active: parse_param::<bool>("active", params.active.as_deref())?,
        search: params.search,
        page: parse_param("page", params.page.as_deref())?,
        page_size: parse_param("page_size", params.page_size.as_deref())?,
        sort: params.sort.filter(|s| !s.trim().is_empty()),
    };

    let page = state.work_session_service.list(&principal, query).await?;
    Ok(Json(page))
}

/// Totals per user and project over a date range
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<SummaryResponse>> {
    let query = SummaryQuery {
        from: params.from,
        to: params.to,
        user_id: parse_id::<UserId>("user_id", params.user_id.as_deref(), UserId::is_valid)?,
        project_id: parse_id::<ProjectId>("project_id", params.project_id.as_deref(), ProjectId::is_valid)?,
    };

    let report = state.work_session_service.summary(&principal, query).await?;
    Ok(Json(SummaryResponse { report }))
}

/// Parse an optional query value; blank counts as absent.
fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> AppResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("invalid {name}"))),
    }
}

/// Parse an optional identifier filter; ids start at 1.
fn parse_id<T: FromStr + Copy>(name: &str, raw: Option<&str>, is_valid: fn(T) -> bool) -> AppResult<Option<T>> {
    match parse_param::<T>(name, raw)? {
        Some(id) if !is_valid(id) => Err(AppError::bad_request(format!("invalid {name}"))),
        id => Ok(id),
    }
}
