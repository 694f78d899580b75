//! Equality strategies used to deduplicate packages across repositories.
//!
//! The same logical package is materialized as a distinct value by every
//! repository that serves it, so deduplication always goes through an
//! explicit comparer rather than value identity.

use crate::package::Package;
use crate::version::SemanticVersion;

/// Maps an item to the key that decides whether two items are the same.
pub trait IdentityComparer<T>: Send + Sync {
    /// Hashable identity key.
    type Key: Eq + std::hash::Hash + Send;

    /// Compute the identity of `item`.
    fn identity(&self, item: &T) -> Self::Key;
}

/// Package identity strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageIdentity {
    /// Same id (ignoring case) and same version. Used when browsing.
    #[default]
    IdAndVersion,
    /// Same id only; one entry per package regardless of version.
    IdOnly,
}

/// Key produced by [`PackageIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    id: String,
    version: Option<SemanticVersion>,
}

impl IdentityComparer<Package> for PackageIdentity {
    type Key = IdentityKey;

    fn identity(&self, item: &Package) -> IdentityKey {
        IdentityKey {
            id: item.id.normalized(),
            version: match self {
                Self::IdAndVersion => Some(item.version.clone()),
                Self::IdOnly => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageId;

    fn pkg(id: &str, version: &str) -> Package {
        Package::new(PackageId::new(id), SemanticVersion::parse(version).unwrap())
    }

    #[test]
    fn id_and_version() {
        let cmp = PackageIdentity::IdAndVersion;
        assert_eq!(cmp.identity(&pkg("A", "1.0")), cmp.identity(&pkg("a", "1.0.0")));
        assert_ne!(cmp.identity(&pkg("A", "1.0")), cmp.identity(&pkg("A", "1.1")));
    }

    #[test]
    fn id_only() {
        let cmp = PackageIdentity::IdOnly;
        assert_eq!(cmp.identity(&pkg("A", "1.0")), cmp.identity(&pkg("a", "2.0")));
        assert_ne!(cmp.identity(&pkg("A", "1.0")), cmp.identity(&pkg("B", "1.0")));
    }
}
