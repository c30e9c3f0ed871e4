// Project and status HTTP handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use worktime_core::models::{Project, ProjectId, ProjectStatus, StatusId};

use super::{middleware::AuthUser, AppResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    pub status_id: Option<i64>,
}

/// Fields left out are not changed
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub status_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub message: &'static str,
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub count: usize,
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct StatusListResponse {
    pub statuses: Vec<ProjectStatus>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> AppResult<Json<ProjectListResponse>> {
    let projects = state.project_service.list().await?;
    Ok(Json(ProjectListResponse {
        count: projects.len(),
        projects,
    }))
}

/// Admin only
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ProjectResponse>)> {
    let Json(req) = payload?;

    let project = state
        .project_service
        .create(&principal, &req.name, req.status_id.map(StatusId::new))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            message: "project created",
            project,
        }),
    ))
}

/// Admin only
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> AppResult<Json<ProjectResponse>> {
    let Path(id) = id?;
    let Json(req) = payload?;

    let project = state
        .project_service
        .update(
            &principal,
            ProjectId::new(id),
            req.name.as_deref(),
            req.status_id.map(StatusId::new),
        )
        .await?;

    Ok(Json(ProjectResponse {
        message: "project updated",
        project,
    }))
}

pub async fn list_statuses(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> AppResult<Json<StatusListResponse>> {
    let statuses = state.project_service.statuses().await?;
    Ok(Json(StatusListResponse { statuses }))
}
