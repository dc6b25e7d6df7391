//! Error types for Portfolio

use thiserror::Error;

/// Result type alias using Portfolio's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Portfolio error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Project '{0}' not found. Run `portfolio projects list` to see all projects.")]
    ProjectNotFound(String),

    #[error("Task '{0}' not found. Run `portfolio tasks list <project>` to see its tasks.")]
    TaskNotFound(String),

    // Input errors (E100-E199)
    #[error("Invalid input: {0}")]
    Validation(String),

    // Analysis errors (E200-E299)
    #[error("AI analysis response rejected: {0}")]
    AnalysisParse(String),

    #[error("LLM authentication failed: {0}")]
    UpstreamAuth(String),

    #[error("LLM request failed: {0}")]
    UpstreamRequest(String),

    // Network errors (E300-E399)
    #[error("Network error: {0}. Check your connection to the LLM endpoint.")]
    Network(#[from] reqwest::Error),

    // Storage errors (E400-E499)
    #[error("Storage error during {operation}: {source}")]
    Storage {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Stored record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(source: sqlx::Error) -> Self {
        Self::Storage {
            operation: "query".to_string(),
            source,
        }
    }
}

impl Error {
    /// Wrap a storage error with the operation that produced it
    pub fn storage(operation: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let operation = operation.into();
        move |source| Self::Storage { operation, source }
    }

    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E001",
            Self::TaskNotFound(_) => "E002",
            Self::Validation(_) => "E100",
            Self::AnalysisParse(_) => "E200",
            Self::UpstreamAuth(_) => "E201",
            Self::UpstreamRequest(_) => "E202",
            Self::Network(_) => "E300",
            Self::Storage { .. } => "E400",
            Self::Serialization(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether this error means the referenced record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProjectNotFound(_) | Self::TaskNotFound(_))
    }

    /// Whether a write was rejected by a uniqueness constraint
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Storage {
                source: sqlx::Error::Database(db_err),
                ..
            } => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// Whether this error came from the LLM side and can be replaced by local synthesis
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::AnalysisParse(_)
                | Self::UpstreamAuth(_)
                | Self::UpstreamRequest(_)
                | Self::Network(_)
        )
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ProjectNotFound(_) => Some("portfolio projects list".to_string()),
            Self::TaskNotFound(_) => Some("portfolio tasks list <project-id>".to_string()),
            Self::UpstreamAuth(_) => {
                Some("Set PORTFOLIO_TOKEN_AUTH or enable llm.mock_mode".to_string())
            }
            Self::UpstreamRequest(_) | Self::Network(_) => {
                Some("portfolio config get llm.base_url".to_string())
            }
            Self::ConfigError(_) => Some("portfolio config list".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_not_found_error() {
        let error = Error::ProjectNotFound("42".to_string());
        assert_eq!(error.code(), "E001");
        assert!(error.is_not_found());
        assert_eq!(
            error.suggestion(),
            Some("portfolio projects list".to_string())
        );
        assert!(error.to_string().contains("42"));
    }

    #[test]
    fn test_task_not_found_error() {
        let error = Error::TaskNotFound("CRM-2026-007-T001".to_string());
        assert_eq!(error.code(), "E002");
        assert!(error.is_not_found());
        assert!(error.to_string().contains("CRM-2026-007-T001"));
    }

    #[test]
    fn test_upstream_errors_are_recoverable() {
        assert!(Error::AnalysisParse("missing risks".into()).is_upstream());
        assert!(Error::UpstreamAuth("401".into()).is_upstream());
        assert!(Error::UpstreamRequest("500".into()).is_upstream());
        assert!(!Error::ProjectNotFound("1".into()).is_upstream());
        assert!(!Error::Validation("bad".into()).is_upstream());
    }

    #[test]
    fn test_storage_error_keeps_operation() {
        let error = Error::storage("insert task")(sqlx::Error::RowNotFound);
        assert_eq!(error.code(), "E400");
        assert!(error.to_string().contains("insert task"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let error: Error = sqlx::Error::PoolClosed.into();
        assert!(matches!(error, Error::Storage { .. }));
    }

    #[test]
    fn test_validation_error_has_no_suggestion() {
        let error = Error::Validation("progress must be 0-100".into());
        assert_eq!(error.code(), "E100");
        assert_eq!(error.suggestion(), None);
    }
}
