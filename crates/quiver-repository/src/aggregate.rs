//! Several repositories presented as one.
//!
//! Queries fan out to every child repository, each evaluating filters and
//! ordering on its own, and the per-repository streams are merged back into
//! one ordered, deduplicated stream. Pagination and counting apply to the
//! merged result only.

use crate::config::AggregateConfig;
use crate::error::{RepositoryError, Result};
use crate::merge::{OrderedOrigin, Paginated, StreamingMerge};
use crate::query::{PackageFilter, PackageQuery, QueryOperator, SortKey, SortProperty};
use crate::repository::{DependencyLookup, PackageLookup, PackageRepository};
use crate::rewriter::QueryRewriter;
use crate::source::SourceQuery;
use futures::StreamExt;
use futures::future::{BoxFuture, join_all};
use futures::stream::{self, BoxStream};
use quiver_core::{Package, PackageId, PackageIdentity, SemanticVersion};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Read-only facade over an ordered list of repositories.
///
/// Registration order matters: it breaks ordering ties during merges and
/// decides which repository's copy of a duplicated package is kept.
pub struct AggregateRepository {
    name: String,
    repositories: Vec<Arc<dyn PackageRepository>>,
    config: AggregateConfig,
}

impl std::fmt::Debug for AggregateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.repositories.iter().map(|r| r.name()).collect();
        f.debug_struct("AggregateRepository")
            .field("name", &self.name)
            .field("repositories", &names)
            .field("config", &self.config)
            .finish()
    }
}

impl AggregateRepository {
    /// Create an aggregate with default configuration.
    pub fn new(repositories: impl IntoIterator<Item = Arc<dyn PackageRepository>>) -> Self {
        Self::with_config(repositories, AggregateConfig::default())
    }

    /// Create an aggregate with explicit configuration.
    pub fn with_config(
        repositories: impl IntoIterator<Item = Arc<dyn PackageRepository>>,
        config: AggregateConfig,
    ) -> Self {
        Self {
            name: "aggregate".to_string(),
            repositories: repositories.into_iter().collect(),
            config,
        }
    }

    /// Rename the aggregate (shown in logs when it is nested in another).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register another repository after the existing ones.
    pub fn add_repository(&mut self, repository: Arc<dyn PackageRepository>) {
        self.repositories.push(repository);
    }

    /// Registered repositories, in registration order.
    #[must_use]
    pub fn repositories(&self) -> &[Arc<dyn PackageRepository>] {
        &self.repositories
    }

    /// Number of registered repositories.
    #[must_use]
    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Switch ignore-failing-repositories mode.
    pub const fn set_ignore_failing_repositories(&mut self, ignore: bool) {
        self.config.ignore_failing_repositories = ignore;
    }

    /// Start a query over every package of every repository.
    ///
    /// Packages are deduplicated by id and version unless
    /// [`PackageQueryable::with_identity`] says otherwise.
    #[must_use]
    pub const fn get_packages(&self) -> PackageQueryable<'_> {
        PackageQueryable {
            aggregate: self,
            operators: Vec::new(),
            identity: PackageIdentity::IdAndVersion,
            cancel: None,
        }
    }

    /// Merge every repository's results for a compiled query.
    ///
    /// Each repository receives the query without pagination; the page is
    /// cut from the merged stream.
    #[must_use]
    pub fn merge(
        &self,
        query: &PackageQuery,
        identity: PackageIdentity,
        cancel: Option<CancellationToken>,
    ) -> Paginated<Package, PackageIdentity> {
        let down = QueryRewriter::down(query);
        let up = QueryRewriter::up(query);
        let rule = down.ordering_rule();

        debug!(
            aggregate = %self.name,
            repositories = self.repositories.len(),
            window = self.config.read_ahead_window,
            "starting merge"
        );

        let origins = self
            .repositories
            .iter()
            .map(|repo| {
                SourceQuery::new(Arc::clone(repo), down.clone(), self.config.read_ahead_window)
                    .into_origin()
            })
            .collect();

        let mut merge = StreamingMerge::new(origins, move |a, b| rule.compare(a, b), identity)
            .ignore_failing_sources(self.config.ignore_failing_repositories);
        if let Some(token) = cancel {
            merge = merge.with_cancellation(token);
        }
        Paginated::new(merge, &up)
    }

    /// Approximate result count of a compiled query.
    ///
    /// Per-repository counts are summed, so a package served by several
    /// repositories is counted once per repository.
    ///
    /// # Errors
    /// Returns the first repository error unless failing repositories are ignored.
    pub async fn count_packages(&self, query: &PackageQuery) -> Result<usize> {
        let down = QueryRewriter::down(query);
        let counts = join_all(self.repositories.iter().map(|repo| repo.count(&down))).await;

        let mut per_repository = Vec::with_capacity(counts.len());
        for (repo, count) in self.repositories.iter().zip(counts) {
            match count {
                Ok(count) => per_repository.push(count),
                Err(err) => self.tolerate(repo.name(), err)?,
            }
        }

        Ok(QueryRewriter::approximate_count(
            per_repository,
            &QueryRewriter::up(query),
        ))
    }

    /// Find one exact package.
    ///
    /// Repositories are asked directly, in registration order; the first hit
    /// wins. Repositories without a direct lookup are skipped, their query
    /// is never scanned.
    ///
    /// # Errors
    /// Returns the first repository error unless failing repositories are ignored.
    pub async fn find_package(
        &self,
        id: &PackageId,
        version: &SemanticVersion,
    ) -> Result<Option<Package>> {
        for repo in &self.repositories {
            let Some(lookup) = repo.package_lookup() else {
                continue;
            };
            match lookup.find_package(id, version).await {
                Ok(Some(package)) => {
                    debug!(repository = repo.name(), package = %package, "found package");
                    return Ok(Some(package));
                }
                Ok(None) => {}
                Err(err) => self.tolerate(repo.name(), err)?,
            }
        }
        Ok(None)
    }

    /// Every version of `id` from repositories that support dependency
    /// lookup, deduplicated by version, newest first.
    ///
    /// Repositories without the capability are skipped.
    ///
    /// # Errors
    /// Returns the first repository error unless failing repositories are ignored.
    pub async fn get_dependencies(&self, id: &PackageId) -> Result<Vec<Package>> {
        let capable: Vec<(&Arc<dyn PackageRepository>, &dyn DependencyLookup)> = self
            .repositories
            .iter()
            .filter_map(|repo| repo.dependency_lookup().map(|lookup| (repo, lookup)))
            .collect();

        if capable.is_empty() {
            debug!(aggregate = %self.name, id = %id, "no repository supports dependency lookup");
            return Ok(Vec::new());
        }

        let results = join_all(
            capable
                .iter()
                .map(|(_, lookup)| lookup.find_packages_by_id(id)),
        )
        .await;

        let newest_first = |a: &Package, b: &Package| b.version.cmp(&a.version);
        let mut origins = Vec::with_capacity(results.len());
        for ((repo, _), result) in capable.iter().zip(results) {
            match result {
                Ok(mut packages) => {
                    packages.sort_by(newest_first);
                    let items: BoxStream<'static, Result<Package>> =
                        stream::iter(packages.into_iter().map(Ok)).boxed();
                    origins.push(OrderedOrigin::new(repo.name(), items));
                }
                Err(err) => self.tolerate(repo.name(), err)?,
            }
        }

        let merge = StreamingMerge::new(origins, newest_first, PackageIdentity::IdAndVersion);
        Paginated::new(merge, &PackageQuery::default()).collect().await
    }

    /// Swallow `err` in ignore mode, otherwise return it.
    fn tolerate(&self, repository: &str, err: RepositoryError) -> Result<()> {
        if self.config.ignore_failing_repositories {
            warn!(repository, error = %err, "ignoring failing repository");
            Ok(())
        } else {
            Err(err)
        }
    }
}

/// An aggregate can itself be a child of another aggregate.
///
/// Each `query_page` call merges the children from the start of their
/// results and then applies the window's skip/take, so reading `n` packages
/// through a nested aggregate costs about `n² / window` child reads. Give the
/// outer aggregate a read-ahead window large enough to cover typical result
/// sets.
impl PackageRepository for AggregateRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_page<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<Vec<Package>>> {
        Box::pin(async move {
            self.merge(query, PackageIdentity::IdAndVersion, None)
                .collect()
                .await
        })
    }

    fn count<'a>(&'a self, query: &'a PackageQuery) -> BoxFuture<'a, Result<usize>> {
        Box::pin(self.count_packages(query))
    }

    fn package_lookup(&self) -> Option<&dyn PackageLookup> {
        Some(self)
    }

    fn dependency_lookup(&self) -> Option<&dyn DependencyLookup> {
        Some(self)
    }
}

impl PackageLookup for AggregateRepository {
    fn find_package<'a>(
        &'a self,
        id: &'a PackageId,
        version: &'a SemanticVersion,
    ) -> BoxFuture<'a, Result<Option<Package>>> {
        Box::pin(Self::find_package(self, id, version))
    }
}

impl DependencyLookup for AggregateRepository {
    fn find_packages_by_id<'a>(&'a self, id: &'a PackageId) -> BoxFuture<'a, Result<Vec<Package>>> {
        Box::pin(self.get_dependencies(id))
    }
}

/// Query under construction against an [`AggregateRepository`].
///
/// Operators are recorded in call order and only validated when a terminal
/// method (`stream`, `to_vec`, `first`, `count`) runs.
#[derive(Debug, Clone)]
pub struct PackageQueryable<'a> {
    aggregate: &'a AggregateRepository,
    operators: Vec<QueryOperator>,
    identity: PackageIdentity,
    cancel: Option<CancellationToken>,
}

impl PackageQueryable<'_> {
    fn push(mut self, op: QueryOperator) -> Self {
        self.operators.push(op);
        self
    }

    /// Keep packages matching `filter`.
    #[must_use]
    pub fn filter(self, filter: PackageFilter) -> Self {
        self.push(QueryOperator::Filter(filter))
    }

    /// Keep packages whose id, title, description or tags contain `term`.
    #[must_use]
    pub fn search(self, term: impl Into<String>) -> Self {
        self.filter(PackageFilter::SearchTerm(term.into()))
    }

    /// Order ascending by `property`.
    #[must_use]
    pub fn order_by(self, property: SortProperty) -> Self {
        self.push(QueryOperator::OrderBy(SortKey::ascending(property)))
    }

    /// Order descending by `property`.
    #[must_use]
    pub fn order_by_descending(self, property: SortProperty) -> Self {
        self.push(QueryOperator::OrderBy(SortKey::descending(property)))
    }

    /// Break ties ascending by `property`.
    #[must_use]
    pub fn then_by(self, property: SortProperty) -> Self {
        self.push(QueryOperator::ThenBy(SortKey::ascending(property)))
    }

    /// Break ties descending by `property`.
    #[must_use]
    pub fn then_by_descending(self, property: SortProperty) -> Self {
        self.push(QueryOperator::ThenBy(SortKey::descending(property)))
    }

    /// Drop the first `n` merged results.
    #[must_use]
    pub fn skip(self, n: usize) -> Self {
        self.push(QueryOperator::Skip(n))
    }

    /// Keep at most `n` merged results.
    #[must_use]
    pub fn take(self, n: usize) -> Self {
        self.push(QueryOperator::Take(n))
    }

    /// Change how duplicates across repositories are recognised.
    #[must_use]
    pub const fn with_identity(mut self, identity: PackageIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Abort the enumeration once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Operators recorded so far.
    #[must_use]
    pub fn operators(&self) -> &[QueryOperator] {
        &self.operators
    }

    /// Validate and compile the recorded operators.
    ///
    /// # Errors
    /// Returns [`RepositoryError::UnsupportedOperator`] for malformed pipelines.
    pub fn compile(&self) -> Result<PackageQuery> {
        QueryRewriter::compile(&self.operators)
    }

    /// Lazily enumerate the results.
    ///
    /// # Errors
    /// Returns [`RepositoryError::UnsupportedOperator`] for malformed pipelines.
    pub fn page(self) -> Result<Paginated<Package, PackageIdentity>> {
        let query = self.compile()?;
        Ok(self.aggregate.merge(&query, self.identity, self.cancel))
    }

    /// Lazily enumerate the results as a stream.
    ///
    /// # Errors
    /// Returns [`RepositoryError::UnsupportedOperator`] for malformed pipelines.
    pub fn stream(self) -> Result<BoxStream<'static, Result<Package>>> {
        Ok(self.page()?.into_stream())
    }

    /// Collect every result.
    ///
    /// # Errors
    /// Returns a compile error or the first repository error.
    pub async fn to_vec(self) -> Result<Vec<Package>> {
        self.page()?.collect().await
    }

    /// First result, if any.
    ///
    /// # Errors
    /// Returns a compile error or the first repository error.
    pub async fn first(self) -> Result<Option<Package>> {
        self.take(1).page()?.next().await.transpose()
    }

    /// Approximate number of results (see [`AggregateRepository::count_packages`]).
    ///
    /// # Errors
    /// Returns a compile error or the first repository error.
    pub async fn count(self) -> Result<usize> {
        let query = self.compile()?;
        self.aggregate.count_packages(&query).await
    }
}
