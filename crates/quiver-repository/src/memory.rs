//! In-memory package repository.

use crate::error::{RepositoryError, Result};
use crate::query::PackageQuery;
use crate::repository::{DependencyLookup, PackageLookup, PackageRepository};
use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use quiver_core::{Package, PackageId, SemanticVersion};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Repository holding its packages in memory.
///
/// Supports every optional capability, which makes it the reference
/// implementation for local sources and for tests.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    packages: RwLock<Vec<Package>>,
    queries_served: AtomicUsize,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: RwLock::new(Vec::new()),
            queries_served: AtomicUsize::new(0),
        }
    }

    /// Create a repository holding `packages`.
    #[must_use]
    pub fn with_packages(
        name: impl Into<String>,
        packages: impl IntoIterator<Item = Package>,
    ) -> Self {
        let repo = Self::new(name);
        repo.packages.write().extend(packages);
        repo
    }

    /// Load a repository from a JSON array of packages.
    ///
    /// # Errors
    /// Returns [`RepositoryError::ParseError`] if the JSON is not a package list.
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let name = name.into();
        let packages: Vec<Package> =
            sonic_rs::from_str(json).map_err(|e| RepositoryError::ParseError {
                source: name.clone(),
                message: e.to_string(),
            })?;
        debug!(repository = %name, packages = packages.len(), "loaded repository");
        Ok(Self::with_packages(name, packages))
    }

    /// Add a package.
    pub fn add(&self, package: Package) {
        self.packages.write().push(package);
    }

    /// Number of packages held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }

    /// Number of `query_page` calls answered so far.
    #[must_use]
    pub fn queries_served(&self) -> usize {
        self.queries_served.load(Ordering::Relaxed)
    }
}

impl PackageRepository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_page<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<Vec<Package>>> {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
        let page = query.apply(self.packages.read().iter());
        Box::pin(future::ready(Ok(page)))
    }

    fn count<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<usize>> {
        let count = query.count_in(self.packages.read().iter());
        Box::pin(future::ready(Ok(count)))
    }

    fn package_lookup(&self) -> Option<&dyn PackageLookup> {
        Some(self)
    }

    fn dependency_lookup(&self) -> Option<&dyn DependencyLookup> {
        Some(self)
    }
}

impl PackageLookup for MemoryRepository {
    fn find_package<'a>(
        &'a self,
        id: &'a PackageId,
        version: &'a SemanticVersion,
    ) -> BoxFuture<'a, Result<Option<Package>>> {
        let found = self
            .packages
            .read()
            .iter()
            .find(|p| p.id == *id && p.version == *version)
            .cloned();
        Box::pin(future::ready(Ok(found)))
    }
}

impl DependencyLookup for MemoryRepository {
    fn find_packages_by_id<'a>(&'a self, id: &'a PackageId) -> BoxFuture<'a, Result<Vec<Package>>> {
        let found = self
            .packages
            .read()
            .iter()
            .filter(|p| p.id == *id)
            .cloned()
            .collect();
        Box::pin(future::ready(Ok(found)))
    }
}
