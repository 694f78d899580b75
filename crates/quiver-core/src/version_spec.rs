//! Version range constraints.

use crate::error::{Error, Result};
use crate::version::SemanticVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Range of acceptable versions with optional, independently inclusive bounds.
///
/// Interval notation:
///
/// | spec | meaning |
/// |---|---|
/// | `1.0` | `1.0 <= x` |
/// | `[1.0]` | `x == 1.0` |
/// | `(1.0,)` | `1.0 < x` |
/// | `(,1.0]` | `x <= 1.0` |
/// | `[1.0,2.0)` | `1.0 <= x < 2.0` |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionSpec {
    /// Lower bound.
    pub min_version: Option<SemanticVersion>,
    /// Whether the lower bound is part of the range.
    pub is_min_inclusive: bool,
    /// Upper bound.
    pub max_version: Option<SemanticVersion>,
    /// Whether the upper bound is part of the range.
    pub is_max_inclusive: bool,
}

impl VersionSpec {
    /// Exactly one version.
    #[must_use]
    pub fn exact(version: SemanticVersion) -> Self {
        Self {
            min_version: Some(version.clone()),
            is_min_inclusive: true,
            max_version: Some(version),
            is_max_inclusive: true,
        }
    }

    /// `version` or anything newer.
    #[must_use]
    pub const fn at_least(version: SemanticVersion) -> Self {
        Self {
            min_version: Some(version),
            is_min_inclusive: true,
            max_version: None,
            is_max_inclusive: false,
        }
    }

    /// Half-open range `[min, max)`.
    #[must_use]
    pub const fn range(min: SemanticVersion, max: SemanticVersion) -> Self {
        Self {
            min_version: Some(min),
            is_min_inclusive: true,
            max_version: Some(max),
            is_max_inclusive: false,
        }
    }

    /// Check whether `version` falls inside the range.
    #[must_use]
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        let above_min = self.min_version.as_ref().is_none_or(|min| {
            if self.is_min_inclusive {
                version >= min
            } else {
                version > min
            }
        });
        let below_max = self.max_version.as_ref().is_none_or(|max| {
            if self.is_max_inclusive {
                version <= max
            } else {
                version < max
            }
        });
        above_min && below_max
    }

    /// Whether the range pins a single version.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.is_min_inclusive
            && self.is_max_inclusive
            && self.min_version.is_some()
            && self.min_version == self.max_version
    }

    /// Parse interval notation.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVersionSpec`] for malformed or empty ranges.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        let invalid = |reason: &str| Error::InvalidVersionSpec {
            spec: input.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("empty version range"));
        }

        // bare version means "at least"
        if !s.starts_with('[') && !s.starts_with('(') {
            return SemanticVersion::parse(s)
                .map(Self::at_least)
                .map_err(|_| invalid("invalid version"));
        }

        if s.len() < 3 {
            return Err(invalid("interval too short"));
        }
        let is_min_inclusive = s.starts_with('[');
        let is_max_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("interval must end with ']' or ')'")),
        };

        let inner = &s[1..s.len() - 1];
        let bound = |part: &str| -> Result<Option<SemanticVersion>> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                SemanticVersion::parse(part)
                    .map(Some)
                    .map_err(|_| invalid("invalid version bound"))
            }
        };

        let parts: Vec<&str> = inner.split(',').collect();
        let spec = match parts.as_slice() {
            [single] => {
                if !(is_min_inclusive && is_max_inclusive) {
                    return Err(invalid("a single version must use '[x]'"));
                }
                let version = bound(single)?.ok_or_else(|| invalid("missing version"))?;
                Self::exact(version)
            }
            [min, max] => Self {
                min_version: bound(min)?,
                is_min_inclusive,
                max_version: bound(max)?,
                is_max_inclusive,
            },
            _ => return Err(invalid("too many bounds")),
        };

        match (&spec.min_version, &spec.max_version) {
            (None, None) => Err(invalid("at least one bound is required")),
            (Some(min), Some(max)) if min > max => Err(invalid("lower bound exceeds upper bound")),
            (Some(min), Some(max))
                if min == max && !(spec.is_min_inclusive && spec.is_max_inclusive) =>
            {
                Err(invalid("range is empty"))
            }
            _ => Ok(spec),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact()
            && let Some(version) = &self.min_version
        {
            return write!(f, "[{version}]");
        }
        if self.is_min_inclusive
            && self.max_version.is_none()
            && let Some(min) = &self.min_version
        {
            return write!(f, "{min}");
        }

        f.write_str(if self.is_min_inclusive { "[" } else { "(" })?;
        if let Some(min) = &self.min_version {
            write!(f, "{min}")?;
        }
        f.write_str(", ")?;
        if let Some(max) = &self.max_version {
            write!(f, "{max}")?;
        }
        f.write_str(if self.is_max_inclusive { "]" } else { ")" })
    }
}

impl FromStr for VersionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionSpec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionSpec> for String {
    fn from(spec: VersionSpec) -> Self {
        spec.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn bare_version_is_minimum() {
        let spec = VersionSpec::parse("1.0").unwrap();
        assert!(spec.satisfies(&v("1.0")));
        assert!(spec.satisfies(&v("9.0")));
        assert!(!spec.satisfies(&v("0.9")));
    }

    #[test]
    fn half_open_range() {
        let spec = VersionSpec::parse("[1.0,2.0)").unwrap();
        assert!(spec.satisfies(&v("1.0")));
        assert!(spec.satisfies(&v("1.9.9")));
        assert!(!spec.satisfies(&v("2.0")));
        assert!(spec.satisfies(&v("2.0-beta")));
        assert_eq!(spec, VersionSpec::range(v("1.0"), v("2.0")));
    }

    #[test]
    fn exclusive_and_open_bounds() {
        let above = VersionSpec::parse("(1.0,)").unwrap();
        assert!(!above.satisfies(&v("1.0")));
        assert!(above.satisfies(&v("1.0.0.1")));

        let below = VersionSpec::parse("(,1.5]").unwrap();
        assert!(below.satisfies(&v("0.1")));
        assert!(below.satisfies(&v("1.5")));
        assert!(!below.satisfies(&v("1.5.1")));
    }

    #[test]
    fn exact_match() {
        let spec = VersionSpec::parse("[1.2.3]").unwrap();
        assert!(spec.is_exact());
        assert!(spec.satisfies(&v("1.2.3")));
        assert!(!spec.satisfies(&v("1.2.4")));
        assert_eq!(spec.to_string(), "[1.2.3]");
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "[",
            "(1.0)",
            "[1.0,2.0,3.0]",
            "[2.0,1.0]",
            "(1.0,1.0]",
            "(,)",
            "[a,b]",
            "[1.0,2.0",
        ] {
            assert!(VersionSpec::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for s in ["1.0", "[1.0]", "[1.0, 2.0)", "(, 3.0]"] {
            let spec = VersionSpec::parse(s).unwrap();
            assert_eq!(VersionSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }
}
