use serde::{Deserialize, Serialize};

use super::id::{ProjectId, StatusId};

/// Display status attached to a project (e.g. "planning", "in progress")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub id: StatusId,
    pub name: String,
}

/// Project a session is logged against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub status: Option<ProjectStatus>,
}

/// Project to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub status_id: Option<StatusId>,
}

/// Partial project update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub status_id: Option<StatusId>,
}

impl ProjectUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.status_id.is_none()
    }
}
