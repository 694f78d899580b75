//! Error types for quiver operations.

use thiserror::Error;

/// Main error type for quiver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed version string.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// Malformed version range.
    #[error("invalid version spec '{spec}': {reason}")]
    InvalidVersionSpec {
        /// The rejected spec.
        spec: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A package source failed.
    #[error("repository error: {0}")]
    Repository(String),

    /// Query cannot be evaluated.
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),

    /// Invalid manifest or feed payload.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for quiver operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_rejected_range() {
        let err = Error::InvalidVersionSpec {
            spec: "[2.0,1.0]".to_string(),
            reason: "empty version range".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid version spec '[2.0,1.0]': empty version range"
        );
    }
}
