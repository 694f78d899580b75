//! Repository contracts consumed by the aggregate.
//!
//! A repository only has to serve filtered, ordered, pageable results.
//! Direct lookup by identity and lookup of every version of an id are
//! optional capabilities exposed through [`PackageRepository::package_lookup`]
//! and [`PackageRepository::dependency_lookup`].

use crate::error::Result;
use crate::query::PackageQuery;
use futures::future::BoxFuture;
use quiver_core::{Package, PackageId, SemanticVersion};
use std::sync::Arc;

/// A queryable package catalog.
pub trait PackageRepository: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Evaluate `query` and return its results in query order.
    ///
    /// Implementations must honour filters, ordering and the `skip`/`take`
    /// window of the query they receive.
    ///
    /// # Errors
    /// Returns error if the repository cannot be read.
    fn query_page<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<Vec<Package>>>;

    /// Number of results `query` would return.
    ///
    /// # Errors
    /// Returns error if the repository cannot be read.
    fn count<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move { Ok(self.query_page(query).await?.len()) })
    }

    /// Direct lookup by identity, if supported.
    fn package_lookup(&self) -> Option<&dyn PackageLookup> {
        None
    }

    /// Lookup of every version of an id, if supported.
    fn dependency_lookup(&self) -> Option<&dyn DependencyLookup> {
        None
    }
}

/// Direct package lookup by id and version.
pub trait PackageLookup: Send + Sync {
    /// Find one exact package.
    ///
    /// # Errors
    /// Returns error if the repository cannot be read.
    fn find_package<'a>(
        &'a self,
        id: &'a PackageId,
        version: &'a SemanticVersion,
    ) -> BoxFuture<'a, Result<Option<Package>>>;
}

/// Lookup of every available version of an id, used for dependency resolution.
pub trait DependencyLookup: Send + Sync {
    /// All versions of `id` this repository serves, in any order.
    ///
    /// # Errors
    /// Returns error if the repository cannot be read.
    fn find_packages_by_id<'a>(&'a self, id: &'a PackageId) -> BoxFuture<'a, Result<Vec<Package>>>;
}

impl<T: PackageRepository + ?Sized> PackageRepository for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn query_page<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<Vec<Package>>> {
        (**self).query_page(query)
    }

    fn count<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<usize>> {
        (**self).count(query)
    }

    fn package_lookup(&self) -> Option<&dyn PackageLookup> {
        (**self).package_lookup()
    }

    fn dependency_lookup(&self) -> Option<&dyn DependencyLookup> {
        (**self).dependency_lookup()
    }
}
