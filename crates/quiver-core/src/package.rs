//! Package types and metadata.

use crate::version::SemanticVersion;
use crate::version_spec::VersionSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Package identifier. Comparison ignores case; display keeps the original spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Create new package ID without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id made of letters, digits, `.`, `-` and `_`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty()
            || !s
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return None;
        }
        Some(Self::new(s))
    }

    /// Get the id as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased id, suitable as a lookup key.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    fn folded(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars().flat_map(char::to_lowercase)
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.folded().eq(other.folded())
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded() {
            c.hash(state);
        }
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.folded().cmp(other.folded())
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Declared dependency of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    /// Dependency id.
    pub id: PackageId,
    /// Acceptable versions; `None` accepts anything.
    #[serde(default)]
    pub version_spec: Option<VersionSpec>,
}

impl PackageDependency {
    /// Create new dependency.
    #[must_use]
    pub const fn new(id: PackageId, version_spec: Option<VersionSpec>) -> Self {
        Self { id, version_spec }
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_spec {
            Some(spec) => write!(f, "{} {spec}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Package as served by a repository. Immutable once obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Package identifier.
    pub id: PackageId,
    /// Version.
    pub version: SemanticVersion,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Authors.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Search tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Download count reported by the source.
    #[serde(default)]
    pub download_count: u64,
    /// Publication time.
    #[serde(default)]
    pub published: Option<DateTime<Utc>>,
    /// Unlisted packages stay installable but are hidden from browsing.
    #[serde(default = "default_listed")]
    pub listed: bool,
    /// Source marks this as the newest version of its id.
    #[serde(default)]
    pub is_latest_version: bool,
    /// Target frameworks the package ships assets for. Empty means any.
    #[serde(default)]
    pub target_frameworks: Vec<String>,
    /// Dependencies.
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
}

const fn default_listed() -> bool {
    true
}

impl Package {
    /// Create minimal package.
    #[must_use]
    pub fn new(id: PackageId, version: SemanticVersion) -> Self {
        Self {
            id,
            version,
            title: None,
            description: String::new(),
            authors: Vec::new(),
            tags: Vec::new(),
            download_count: 0,
            published: None,
            listed: true,
            is_latest_version: false,
            target_frameworks: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Title if present, otherwise the id.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.id.as_str())
    }

    /// Get full name with version.
    #[must_use]
    pub fn name_version(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }

    /// Whether the package has assets usable by `framework`.
    #[must_use]
    pub fn supports_framework(&self, framework: &str) -> bool {
        self.target_frameworks.is_empty()
            || self
                .target_frameworks
                .iter()
                .any(|f| f.eq_ignore_ascii_case(framework))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}
