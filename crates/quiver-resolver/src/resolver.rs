//! Dependency version selection.
//!
//! Selection rules:
//!
//! - without a version spec the newest candidate wins;
//! - with a spec, candidates outside it are dropped, the lowest
//!   (major, minor) line that remains is chosen, and the newest version on
//!   that line wins, so patch updates are picked up without jumping to a
//!   new feature line.
//!
//! Pre-releases only take part when allowed by [`ResolverConfig`] or when
//! the version spec itself has a pre-release bound.

use crate::candidates::CandidateSet;
use crate::error::{ResolveError, Result};
use futures::future::try_join_all;
use quiver_core::{Package, PackageDependency, PackageId, SemanticVersion, VersionSpec};
use quiver_repository::AggregateRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Consider pre-release versions.
    pub allow_prerelease: bool,
    /// Pick among listed versions first, falling back to unlisted ones.
    pub prefer_listed: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            allow_prerelease: false,
            prefer_listed: true,
        }
    }
}

impl ResolverConfig {
    /// Parse a JSON document; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns [`ResolveError::Config`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        sonic_rs::from_str(json).map_err(|e| ResolveError::Config(e.to_string()))
    }
}

/// Resolver statistics.
#[derive(Debug, Default)]
pub struct ResolverStats {
    /// Dependencies resolved to a version.
    pub resolved: AtomicU64,
    /// Dependencies without a matching version.
    pub unresolved: AtomicU64,
    /// Candidate versions examined.
    pub candidates_considered: AtomicU64,
    /// Resolve calls that failed.
    pub failures: AtomicU64,
}

impl ResolverStats {
    /// Get summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "resolved: {}, unresolved: {}, candidates: {}, failures: {}",
            self.resolved.load(Ordering::Relaxed),
            self.unresolved.load(Ordering::Relaxed),
            self.candidates_considered.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed)
        )
    }
}

/// Pick the version to install from `candidates`.
///
/// Returns `None` when nothing is eligible. The result only depends on the
/// set of candidate versions, not on their order.
///
/// With the default [`ResolverConfig`] prereleases are skipped and listed
/// versions win over unlisted ones. The plain "newest version" rule for an
/// unconstrained dependency needs `allow_prerelease: true` and
/// `prefer_listed: false`.
#[must_use]
pub fn select_version<'a>(
    candidates: &'a [Package],
    spec: Option<&VersionSpec>,
    config: &ResolverConfig,
) -> Option<&'a Package> {
    let allow_prerelease = config.allow_prerelease || spec.is_some_and(names_prerelease);
    let eligible = |p: &&Package| {
        (allow_prerelease || !p.version.is_prerelease())
            && spec.is_none_or(|s| s.satisfies(&p.version))
    };

    if config.prefer_listed
        && let Some(found) = pick(
            candidates.iter().filter(|p| p.listed).filter(eligible),
            spec.is_some(),
        )
    {
        return Some(found);
    }
    pick(candidates.iter().filter(eligible), spec.is_some())
}

fn names_prerelease(spec: &VersionSpec) -> bool {
    [&spec.min_version, &spec.max_version]
        .into_iter()
        .flatten()
        .any(SemanticVersion::is_prerelease)
}

fn pick<'a>(
    candidates: impl Iterator<Item = &'a Package>,
    lowest_minor_line: bool,
) -> Option<&'a Package> {
    if !lowest_minor_line {
        return newest(candidates);
    }
    let candidates: Vec<&Package> = candidates.collect();
    let line = candidates.iter().map(|p| p.version.minor_line()).min()?;
    newest(
        candidates
            .into_iter()
            .filter(|p| p.version.minor_line() == line),
    )
}

fn newest<'a>(candidates: impl Iterator<Item = &'a Package>) -> Option<&'a Package> {
    candidates.reduce(|best, p| if p.version > best.version { p } else { best })
}

/// Resolves direct dependencies against an aggregate repository.
pub struct DependencyResolver {
    repository: Arc<AggregateRepository>,
    config: ResolverConfig,
    stats: Arc<ResolverStats>,
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DependencyResolver {
    /// Create a new resolver over `repository`.
    #[must_use]
    pub fn new(repository: Arc<AggregateRepository>, config: ResolverConfig) -> Self {
        Self {
            repository,
            config,
            stats: Arc::new(ResolverStats::default()),
        }
    }

    /// Get resolver configuration.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Get resolver statistics.
    #[must_use]
    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    /// Gather every known version of `id`.
    ///
    /// # Errors
    /// Returns [`ResolveError::Repository`] if a repository fails and failing
    /// repositories are not ignored.
    pub async fn candidates(&self, id: &PackageId) -> Result<CandidateSet> {
        let packages = self
            .repository
            .get_dependencies(id)
            .await
            .map_err(|e| ResolveError::repository(id.as_str(), e))?;
        let set = CandidateSet::new(id.clone(), packages);
        debug!(id = %id, candidates = set.len(), "gathered candidates");
        Ok(set)
    }

    /// Pick a version from an already gathered candidate set.
    #[must_use]
    pub fn select<'a>(
        &self,
        candidates: &'a CandidateSet,
        spec: Option<&VersionSpec>,
    ) -> Option<&'a Package> {
        select_version(candidates.packages(), spec, &self.config)
    }

    /// Resolve one dependency; `Ok(None)` when no version matches.
    ///
    /// # Errors
    /// Returns [`ResolveError::Repository`] if gathering candidates fails.
    pub async fn resolve(&self, dependency: &PackageDependency) -> Result<Option<Package>> {
        let candidates = match self.candidates(&dependency.id).await {
            Ok(candidates) => candidates,
            Err(err) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                return Err(err);
            }
        };
        self.stats
            .candidates_considered
            .fetch_add(candidates.len() as u64, Ordering::Relaxed);

        let selected = self
            .select(&candidates, dependency.version_spec.as_ref())
            .cloned();
        match &selected {
            Some(package) => {
                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                info!(dependency = %dependency, version = %package.version, "resolved");
            }
            None => {
                self.stats.unresolved.fetch_add(1, Ordering::Relaxed);
                info!(
                    dependency = %dependency,
                    candidates = candidates.len(),
                    "no matching version"
                );
            }
        }
        Ok(selected)
    }

    /// Resolve several dependencies concurrently, results in input order.
    ///
    /// # Errors
    /// Returns the first failure.
    pub async fn resolve_all(
        &self,
        dependencies: &[PackageDependency],
    ) -> Result<Vec<Option<Package>>> {
        try_join_all(dependencies.iter().map(|dep| self.resolve(dep))).await
    }
}
