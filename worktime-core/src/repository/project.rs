use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{NewProject, Project, ProjectId, ProjectStatus, ProjectUpdate, StatusId},
    Error, Result,
};

/// Answers whether a project may have sessions logged against it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn project_exists(&self, project_id: ProjectId) -> Result<bool>;
}

/// Project and status bookkeeping.
///
/// An unknown `status_id` on write reports [`Error::InvalidInput`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    async fn create(&self, project: NewProject) -> Result<Project>;

    /// All projects ordered by name, then id
    async fn list(&self) -> Result<Vec<Project>>;

    /// Apply `update`, or [`Error::NotFound`] if the project does not exist.
    async fn update(&self, project_id: ProjectId, update: ProjectUpdate) -> Result<Project>;

    async fn statuses(&self) -> Result<Vec<ProjectStatus>>;
}

/// Project repository for database operations
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for ProjectRepository {
    async fn project_exists(&self, project_id: ProjectId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ProjectCatalog for ProjectRepository {
    async fn create(&self, project: NewProject) -> Result<Project> {
        let row = sqlx::query(
            r"
            WITH p AS (
                INSERT INTO projects (name, status_id, created_at)
                VALUES ($1, $2, NOW())
                RETURNING id, name, status_id
            )
            SELECT p.id, p.name, s.id AS status_id, s.name AS status_name
            FROM p
            LEFT JOIN statuses s ON s.id = p.status_id
            ",
        )
        .bind(&project.name)
        .bind(project.status_id)
        .fetch_one(&self.pool)
        .await?;

        row_to_project(&row)
    }

    async fn list(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            r"
            SELECT p.id, p.name, s.id AS status_id, s.name AS status_name
            FROM projects p
            LEFT JOIN statuses s ON s.id = p.status_id
            ORDER BY p.name ASC, p.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_project).collect()
    }

    async fn update(&self, project_id: ProjectId, update: ProjectUpdate) -> Result<Project> {
        let row = sqlx::query(
            r"
            WITH p AS (
                UPDATE projects
                SET name = COALESCE($2, name),
                    status_id = COALESCE($3, status_id)
                WHERE id = $1
                RETURNING id, name, status_id
            )
            SELECT p.id, p.name, s.id AS status_id, s.name AS status_name
            FROM p
            LEFT JOIN statuses s ON s.id = p.status_id
            ",
        )
        .bind(project_id)
        .bind(update.name.as_deref())
        .bind(update.status_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(row_to_project)
            .transpose()?
            .ok_or_else(|| Error::NotFound("project not found".to_string()))
    }

    async fn statuses(&self) -> Result<Vec<ProjectStatus>> {
        let rows = sqlx::query("SELECT id, name FROM statuses ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ProjectStatus {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }
}

fn row_to_project(row: &PgRow) -> Result<Project> {
    let status_id: Option<StatusId> = row.try_get("status_id")?;
    let status_name: Option<String> = row.try_get("status_name")?;

    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        status: status_id.zip(status_name).map(|(id, name)| ProjectStatus { id, name }),
    })
}
