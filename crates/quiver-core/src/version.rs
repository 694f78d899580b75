//! Four-part semantic versions.
//!
//! Versions carry `Major.Minor.Build.Revision` plus an optional pre-release
//! label. Missing numeric parts parse as zero, so `1.0` and `1.0.0.0` are the
//! same version.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Structured package version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Build component.
    pub build: u32,
    /// Revision component.
    pub revision: u32,
    /// Pre-release label, without the leading dash.
    pub special: Option<String>,
}

impl SemanticVersion {
    /// Create a release version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
            special: None,
        }
    }

    /// Attach a pre-release label.
    #[must_use]
    pub fn with_special(mut self, special: impl Into<String>) -> Self {
        let special = special.into();
        self.special = if special.is_empty() {
            None
        } else {
            Some(special)
        };
        self
    }

    /// Parse a version string such as `1.2`, `1.2.3.4` or `2.0.0-beta1`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVersion`] for anything else.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let invalid = || Error::InvalidVersion(input.to_string());

        let (numbers, special) = match s.split_once('-') {
            Some((numbers, special)) => {
                if special.is_empty()
                    || !special
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
                {
                    return Err(invalid());
                }
                (numbers, Some(special))
            }
            None => (s, None),
        };

        let mut parts = [0u32; 4];
        let mut count = 0;
        for part in numbers.split('.') {
            if count == parts.len() || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            parts[count] = part.parse().map_err(|_| invalid())?;
            count += 1;
        }

        let version = Self::new(parts[0], parts[1], parts[2], parts[3]);
        Ok(match special {
            Some(label) => version.with_special(label),
            None => version,
        })
    }

    /// Whether this version carries a pre-release label.
    #[must_use]
    pub const fn is_prerelease(&self) -> bool {
        self.special.is_some()
    }

    /// The `(major, minor)` line this version belongs to.
    #[must_use]
    pub const fn minor_line(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    fn special_key(&self) -> Option<String> {
        self.special.as_deref().map(str::to_lowercase)
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.build, self.revision)
            .cmp(&(other.major, other.minor, other.build, other.revision))
            .then_with(|| match (&self.special, &other.special) {
                (None, None) => Ordering::Equal,
                // a release outranks any pre-release of the same numbers
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(_), Some(_)) => self.special_key().cmp(&other.special_key()),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.build, self.revision).hash(state);
        self.special_key().hash(state);
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(special) = &self.special {
            write!(f, "-{special}")?;
        }
        Ok(())
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SemanticVersion> for String {
    fn from(version: SemanticVersion) -> Self {
        version.to_string()
    }
}

impl From<&semver::Version> for SemanticVersion {
    fn from(v: &semver::Version) -> Self {
        let part = |n: u64| u32::try_from(n).unwrap_or(u32::MAX);
        Self::new(part(v.major), part(v.minor), part(v.patch), 0).with_special(v.pre.as_str())
    }
}
