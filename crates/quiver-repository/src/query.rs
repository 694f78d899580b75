//! Query descriptors.
//!
//! A query is a pipeline of [`QueryOperator`]s that compiles into a flat
//! [`PackageQuery`]. Repositories receive `PackageQuery` values; the
//! aggregate decides which stages each repository gets to see (see
//! [`crate::rewriter::QueryRewriter`]).

use crate::ordering::OrderingRule;
use quiver_core::{Package, PackageId};
use serde::{Deserialize, Serialize};

/// Package property a query can sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortProperty {
    /// Package id, ignoring case.
    Id,
    /// Package version.
    Version,
    /// Title, falling back to the id.
    Title,
    /// Download count.
    DownloadCount,
    /// Publication time; unpublished packages sort first.
    Published,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// One ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    /// Property to compare.
    pub property: SortProperty,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    /// Ascending key.
    #[must_use]
    pub const fn ascending(property: SortProperty) -> Self {
        Self {
            property,
            direction: SortDirection::Ascending,
        }
    }

    /// Descending key.
    #[must_use]
    pub const fn descending(property: SortProperty) -> Self {
        Self {
            property,
            direction: SortDirection::Descending,
        }
    }
}

/// Predicate a repository applies before sorting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum PackageFilter {
    /// Exact id match, ignoring case.
    IdEquals(PackageId),
    /// Case-insensitive substring of id, title, description or a tag.
    SearchTerm(String),
    /// Package ships assets for this target framework (or for any).
    SupportsFramework(String),
    /// Hide unlisted packages.
    ListedOnly,
    /// Hide pre-release versions.
    ExcludePrerelease,
    /// Only the version the repository marks as latest.
    LatestVersionOnly,
}

impl PackageFilter {
    /// Evaluate the predicate against a package.
    #[must_use]
    pub fn matches(&self, package: &Package) -> bool {
        match self {
            Self::IdEquals(id) => package.id == *id,
            Self::SearchTerm(term) => {
                let term = term.to_lowercase();
                let contains = |s: &str| s.to_lowercase().contains(&term);
                contains(package.id.as_str())
                    || package.title.as_deref().is_some_and(contains)
                    || contains(&package.description)
                    || package.tags.iter().any(|t| contains(t.as_str()))
            }
            Self::SupportsFramework(framework) => package.supports_framework(framework),
            Self::ListedOnly => package.listed,
            Self::ExcludePrerelease => !package.version.is_prerelease(),
            Self::LatestVersionOnly => package.is_latest_version,
        }
    }
}

/// One stage of a query pipeline, in the order the caller wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOperator {
    /// Keep packages matching the filter.
    Filter(PackageFilter),
    /// Replace the ordering with a single key.
    OrderBy(SortKey),
    /// Refine the current ordering with another key.
    ThenBy(SortKey),
    /// Drop the first `n` results.
    Skip(usize),
    /// Keep at most `n` results.
    Take(usize),
}

impl QueryOperator {
    /// Operator name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::OrderBy(_) => "order_by",
            Self::ThenBy(_) => "then_by",
            Self::Skip(_) => "skip",
            Self::Take(_) => "take",
        }
    }
}

/// Compiled query: filters, then ordering, then pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageQuery {
    /// All filters must match.
    pub filters: Vec<PackageFilter>,
    /// Sort keys, most significant first.
    pub ordering: Vec<SortKey>,
    /// Results to drop after ordering.
    pub skip: Option<usize>,
    /// Maximum results after skipping.
    pub take: Option<usize>,
}

impl PackageQuery {
    /// Query matching every package.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: PackageFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a sort key.
    #[must_use]
    pub fn with_order(mut self, key: SortKey) -> Self {
        self.ordering.push(key);
        self
    }

    /// Whether `package` passes every filter.
    #[must_use]
    pub fn matches(&self, package: &Package) -> bool {
        self.filters.iter().all(|f| f.matches(package))
    }

    /// Whether the query paginates.
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }

    /// Comparison function for this query's ordering.
    #[must_use]
    pub fn ordering_rule(&self) -> OrderingRule {
        OrderingRule::new(&self.ordering)
    }

    /// Same filters and ordering, reading `size` results starting at `offset`.
    #[must_use]
    pub fn window(&self, offset: usize, size: usize) -> Self {
        Self {
            filters: self.filters.clone(),
            ordering: self.ordering.clone(),
            skip: Some(offset),
            take: Some(size),
        }
    }

    /// Evaluate the whole query against an in-memory collection.
    ///
    /// Repositories backed by a local index can use this directly.
    pub fn apply<'a, I>(&self, packages: I) -> Vec<Package>
    where
        I: IntoIterator<Item = &'a Package>,
    {
        let rule = self.ordering_rule();
        let mut matched: Vec<&Package> = packages.into_iter().filter(|p| self.matches(p)).collect();
        // stable, so equal keys keep insertion order
        matched.sort_by(|a, b| rule.compare(a, b));

        matched
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.take.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Number of packages the query would return from an in-memory collection.
    pub fn count_in<'a, I>(&self, packages: I) -> usize
    where
        I: IntoIterator<Item = &'a Package>,
    {
        let matched = packages.into_iter().filter(|p| self.matches(p)).count();
        let after_skip = matched.saturating_sub(self.skip.unwrap_or(0));
        self.take.map_or(after_skip, |take| after_skip.min(take))
    }
}
