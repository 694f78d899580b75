//! Aggregate repository configuration.
//!
//! Values come from built-in defaults, optionally overlaid by a JSON
//! document and then by environment variables:
//!
//! - `QUIVER_IGNORE_FAILING_REPOSITORIES` - `1`/`true`/`yes` or `0`/`false`/`no`
//! - `QUIVER_READ_AHEAD_WINDOW` - packages buffered per repository

use crate::error::{RepositoryError, Result};
use serde::{Deserialize, Serialize};

/// Default number of packages read from a repository per request.
pub const DEFAULT_READ_AHEAD_WINDOW: usize = 30;

/// Environment variable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEnvVar {
    /// Ignore failing repositories.
    IgnoreFailingRepositories,
    /// Read-ahead window size.
    ReadAheadWindow,
}

impl ConfigEnvVar {
    /// Variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IgnoreFailingRepositories => "QUIVER_IGNORE_FAILING_REPOSITORIES",
            Self::ReadAheadWindow => "QUIVER_READ_AHEAD_WINDOW",
        }
    }
}

/// Aggregate behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AggregateConfig {
    /// Treat a repository that fails during a query as empty.
    pub ignore_failing_repositories: bool,
    /// Packages buffered per repository before the next request.
    pub read_ahead_window: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            ignore_failing_repositories: false,
            read_ahead_window: DEFAULT_READ_AHEAD_WINDOW,
        }
    }
}

impl AggregateConfig {
    /// Parse a JSON document; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the result is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = sonic_rs::from_str(json).map_err(|e| RepositoryError::ParseError {
            source: "aggregate config".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable holds an unparseable value.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a variable holds an unparseable value.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ConfigEnvVar::IgnoreFailingRepositories.as_str()) {
            self.ignore_failing_repositories =
                parse_bool(&value).ok_or_else(|| RepositoryError::InvalidConfig {
                    message: format!(
                        "{} must be a boolean, got '{value}'",
                        ConfigEnvVar::IgnoreFailingRepositories.as_str()
                    ),
                })?;
        }
        if let Some(value) = lookup(ConfigEnvVar::ReadAheadWindow.as_str()) {
            self.read_ahead_window =
                value
                    .trim()
                    .parse()
                    .map_err(|_| RepositoryError::InvalidConfig {
                        message: format!(
                            "{} must be a positive integer, got '{value}'",
                            ConfigEnvVar::ReadAheadWindow.as_str()
                        ),
                    })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants.
    ///
    /// # Errors
    /// Returns error if the read-ahead window is zero.
    pub fn validate(&self) -> Result<()> {
        if self.read_ahead_window == 0 {
            return Err(RepositoryError::InvalidConfig {
                message: "read-ahead-window must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
