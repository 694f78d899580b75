//! Resolver error types.

use quiver_core::Error as CoreError;
use quiver_repository::RepositoryError;
use thiserror::Error;

/// Errors raised while resolving a dependency.
///
/// Finding no matching version is not an error; `resolve` returns `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Gathering candidates failed.
    #[error("failed to gather candidates for '{dependency}': {source}")]
    Repository {
        /// Dependency being resolved.
        dependency: String,
        /// Underlying repository failure.
        #[source]
        source: RepositoryError,
    },

    /// Invalid resolver configuration.
    #[error("invalid resolver configuration: {0}")]
    Config(String),
}

impl ResolveError {
    /// Wrap a repository failure for `dependency`.
    pub fn repository(dependency: impl Into<String>, source: RepositoryError) -> Self {
        Self::Repository {
            dependency: dependency.into(),
            source,
        }
    }
}

impl From<ResolveError> for CoreError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Repository { source, .. } => source.into(),
            ResolveError::Config(message) => Self::Config(message),
        }
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
