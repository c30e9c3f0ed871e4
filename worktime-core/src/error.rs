use thiserror::Error;

/// Name of the partial unique index that enforces one open session per user.
pub const ACTIVE_SESSION_CONSTRAINT: &str = "one_active_session_per_user";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // unique_violation
                    "23505" => {
                        if db_err.constraint() == Some(ACTIVE_SESSION_CONSTRAINT) {
                            Self::Conflict("active session exists".to_string())
                        } else if db_err.message().contains("email") {
                            Self::Conflict("Email already registered".to_string())
                        } else {
                            Self::Conflict("Resource already exists".to_string())
                        }
                    }
                    // foreign_key_violation
                    "23503" => {
                        if db_err.constraint().is_some_and(|c| c.contains("status")) {
                            Self::InvalidInput("status does not exist".to_string())
                        } else if db_err.constraint().is_some_and(|c| c.contains("project")) {
                            Self::InvalidInput("project does not exist".to_string())
                        } else {
                            Self::InvalidInput("Referenced resource not found".to_string())
                        }
                    }
                    // check_violation
                    "23514" => Self::InvalidInput("Constraint check failed".to_string()),
                    // not_null_violation
                    "23502" => Self::InvalidInput("Required field is missing".to_string()),
                    _ => Self::Database(err),
                }
            }
            _ => Self::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_pool_errors_stay_database_errors() {
        let err: Error = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_display_includes_message() {
        let err = Error::Conflict("active session exists".to_string());
        assert_eq!(err.to_string(), "Conflict: active session exists");
    }
}
