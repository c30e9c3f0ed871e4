use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ProjectId, SessionId, UserId};

/// Payload of a `session_started` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub start_at: DateTime<Utc>,
}

/// Payload of a `session_stopped` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStopped {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub stopped_by: UserId,
    pub end_at: DateTime<Utc>,
}

/// Session lifecycle notification.
///
/// Transient: events are fanned out to connected streams and then forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted(SessionStarted),
    SessionStopped(SessionStopped),
}

impl SessionEvent {
    /// Wire name of the event
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStarted(_) => "session_started",
            Self::SessionStopped(_) => "session_stopped",
        }
    }

    /// User the event concerns. For a stop this is the session owner, which
    /// may differ from whoever performed the stop.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::SessionStarted(e) => e.user_id,
            Self::SessionStopped(e) => e.user_id,
        }
    }

    /// Serialize the payload alone, without the `type` tag.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            Self::SessionStarted(e) => serde_json::to_string(e),
            Self::SessionStopped(e) => serde_json::to_string(e),
        }
    }
}
