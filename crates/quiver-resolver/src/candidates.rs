//! Candidate versions of a single dependency.

use ahash::AHashSet;
use quiver_core::{Package, PackageId, SemanticVersion};

/// Every known version of one package id, built fresh for each resolve call.
///
/// Packages with another id are dropped on construction and repeated
/// versions keep their first occurrence, so the set never depends on how
/// often a version was reported.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    id: PackageId,
    packages: Vec<Package>,
}

impl CandidateSet {
    /// Collect the candidates for `id` from `packages`.
    pub fn new(id: PackageId, packages: impl IntoIterator<Item = Package>) -> Self {
        let mut seen: AHashSet<SemanticVersion> = AHashSet::new();
        let packages = packages
            .into_iter()
            .filter(|p| p.id == id && seen.insert(p.version.clone()))
            .collect();
        Self { id, packages }
    }

    /// Dependency id.
    #[must_use]
    pub const fn id(&self) -> &PackageId {
        &self.id
    }

    /// Candidates in collection order.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Number of distinct versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether no version is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(id: &str, version: &str) -> Package {
        Package::new(PackageId::new(id), SemanticVersion::parse(version).unwrap())
    }

    #[test]
    fn keeps_matching_ids_once_per_version() {
        let set = CandidateSet::new(
            PackageId::new("alpha"),
            [
                pkg("Alpha", "1.0"),
                pkg("beta", "1.0"),
                pkg("ALPHA", "1.0.0.0"),
                pkg("alpha", "2.0"),
            ],
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.packages()[0].id.as_str(), "Alpha");
        assert_eq!(set.packages()[1].version, SemanticVersion::new(2, 0, 0, 0));
    }

    #[test]
    fn keeps_collection_order() {
        let set = CandidateSet::new(
            PackageId::new("a"),
            [pkg("a", "1.0"), pkg("a", "3.0"), pkg("a", "2.0-rc1"), pkg("a", "3.0.0")],
        );
        let versions: Vec<String> = set.packages().iter().map(|p| p.version.to_string()).collect();
        assert_eq!(versions, ["1.0.0", "3.0.0", "2.0.0-rc1"]);
        assert_eq!(set.id().as_str(), "a");
    }

    #[test]
    fn empty_set() {
        let set = CandidateSet::new(PackageId::new("a"), Vec::new());
        assert!(set.is_empty());
        assert!(set.packages().is_empty());
    }
}
