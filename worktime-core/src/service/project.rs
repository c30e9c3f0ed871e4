use std::sync::Arc;

use tracing::info;

use crate::{
    models::{NewProject, Principal, Project, ProjectId, ProjectStatus, ProjectUpdate, StatusId},
    repository::ProjectCatalog,
    Error, Result,
};

const MAX_PROJECT_NAME_LEN: usize = 200;

/// Project administration and lookup
#[derive(Clone)]
pub struct ProjectService {
    catalog: Arc<dyn ProjectCatalog>,
}

impl std::fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectService").finish()
    }
}

impl ProjectService {
    #[must_use]
    pub fn new(catalog: Arc<dyn ProjectCatalog>) -> Self {
        Self { catalog }
    }

    /// Create a project. Administrators only.
    pub async fn create(
        &self,
        principal: &Principal,
        name: &str,
        status_id: Option<StatusId>,
    ) -> Result<Project> {
        require_admin(principal)?;

        let project = self
            .catalog
            .create(NewProject {
                name: validate_name(name)?,
                status_id: validate_status(status_id)?,
            })
            .await?;

        info!(project_id = %project.id, created_by = %principal.user_id, "Project created");
        Ok(project)
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        self.catalog.list().await
    }

    /// Rename a project or change its status. Administrators only.
    pub async fn update(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        name: Option<&str>,
        status_id: Option<StatusId>,
    ) -> Result<Project> {
        require_admin(principal)?;

        if !project_id.is_valid() {
            return Err(Error::InvalidInput("invalid project id".to_string()));
        }

        let update = ProjectUpdate {
            name: name.map(validate_name).transpose()?,
            status_id: validate_status(status_id)?,
        };
        if update.is_empty() {
            return Err(Error::InvalidInput(
                "at least one field is required: name or status_id".to_string(),
            ));
        }

        let project = self.catalog.update(project_id, update).await?;
        info!(project_id = %project.id, updated_by = %principal.user_id, "Project updated");
        Ok(project)
    }

    pub async fn statuses(&self) -> Result<Vec<ProjectStatus>> {
        self.catalog.statuses().await
    }
}

fn require_admin(principal: &Principal) -> Result<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(Error::Authorization("only admins can manage projects".to_string()))
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_PROJECT_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "name must be at most {MAX_PROJECT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_status(status_id: Option<StatusId>) -> Result<Option<StatusId>> {
    match status_id {
        Some(id) if !id.is_valid() => Err(Error::InvalidInput("status_id must be positive".to_string())),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserId, UserRole};
    use crate::repository::MockProjectCatalog;

    fn admin() -> Principal {
        Principal::new(UserId::new(1), UserRole::Admin)
    }

    fn project(id: i64, name: &str) -> Project {
        Project {
            id: ProjectId::new(id),
            name: name.to_string(),
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let mut catalog = MockProjectCatalog::new();
        catalog
            .expect_create()
            .withf(|p| p.name == "Billing" && p.status_id == Some(StatusId::new(2)))
            .times(1)
            .returning(|p| Ok(project(3, &p.name)));

        let created = ProjectService::new(Arc::new(catalog))
            .create(&admin(), "  Billing ", Some(StatusId::new(2)))
            .await
            .unwrap();
        assert_eq!(created.id, ProjectId::new(3));
    }

    #[tokio::test]
    async fn test_regular_users_cannot_manage_projects() {
        let mut catalog = MockProjectCatalog::new();
        catalog.expect_create().never();
        catalog.expect_update().never();
        let service = ProjectService::new(Arc::new(catalog));
        let user = Principal::new(UserId::new(7), UserRole::User);

        let err = service.create(&user, "Billing", None).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let err = service
            .update(&user, ProjectId::new(1), Some("Renamed"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_storage() {
        let mut catalog = MockProjectCatalog::new();
        catalog.expect_create().never();
        catalog.expect_update().never();
        let service = ProjectService::new(Arc::new(catalog));

        assert!(service.create(&admin(), "   ", None).await.is_err());
        assert!(service.create(&admin(), "Billing", Some(StatusId::new(0))).await.is_err());
        assert!(service
            .create(&admin(), &"x".repeat(MAX_PROJECT_NAME_LEN + 1), None)
            .await
            .is_err());

        let err = service
            .update(&admin(), ProjectId::new(1), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("at least one field")));

        let err = service
            .update(&admin(), ProjectId::new(0), Some("Renamed"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_passes_only_given_fields() {
        let mut catalog = MockProjectCatalog::new();
        catalog
            .expect_update()
            .withf(|id, u| *id == ProjectId::new(4) && u.name.is_none() && u.status_id == Some(StatusId::new(3)))
            .times(1)
            .returning(|id, _| Ok(project(id.as_i64(), "Billing")));

        ProjectService::new(Arc::new(catalog))
            .update(&admin(), ProjectId::new(4), None, Some(StatusId::new(3)))
            .await
            .unwrap();
    }
}
