//! Repository-specific error types.

use quiver_core::Error as CoreError;
use std::fmt;

/// Repository-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A repository failed while serving a query.
    SourceFailed {
        /// Repository name.
        repository: String,
        /// Error message.
        message: String,
    },
    /// Query uses an operator that cannot be evaluated at its position.
    UnsupportedOperator {
        /// Operator name.
        operator: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// Invalid repository configuration.
    InvalidConfig {
        /// Error message.
        message: String,
    },
    /// JSON parsing error.
    ParseError {
        /// Source of the JSON.
        source: String,
        /// Error message.
        message: String,
    },
    /// Enumeration was cancelled.
    Cancelled,
}

impl RepositoryError {
    /// Shorthand for [`RepositoryError::SourceFailed`].
    #[must_use]
    pub fn source_failed(repository: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFailed {
            repository: repository.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceFailed {
                repository,
                message,
            } => {
                write!(f, "Repository '{repository}' failed: {message}")
            }
            Self::UnsupportedOperator { operator, reason } => {
                write!(f, "Unsupported query operator '{operator}': {reason}")
            }
            Self::InvalidConfig { message } => {
                write!(f, "Invalid repository configuration: {message}")
            }
            Self::ParseError { source, message } => {
                write!(f, "Failed to parse {source}: {message}")
            }
            Self::Cancelled => write!(f, "Query cancelled"),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<RepositoryError> for CoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            err @ RepositoryError::SourceFailed { .. } => Self::Repository(err.to_string()),
            err @ RepositoryError::UnsupportedOperator { .. } => {
                Self::UnsupportedQuery(err.to_string())
            }
            RepositoryError::InvalidConfig { message } => Self::Config(message),
            RepositoryError::ParseError { message, .. } => Self::InvalidManifest(message),
            RepositoryError::Cancelled => Self::Cancelled,
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
