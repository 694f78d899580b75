//! Splitting a query between repositories and the merged stream.
//!
//! Filters and ordering are pushed down to every repository. Pagination
//! stays with the merged result: a repository that paged its own results
//! would drop packages that belong in the global page.

use crate::error::{RepositoryError, Result};
use crate::ordering::DEFAULT_ORDERING;
use crate::query::{PackageQuery, QueryOperator};
use tracing::debug;

/// Compiles operator pipelines and derives the per-repository and
/// post-merge forms of a query.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRewriter;

impl QueryRewriter {
    /// Compile an operator pipeline into a [`PackageQuery`].
    ///
    /// # Errors
    /// Returns [`RepositoryError::UnsupportedOperator`] for `then_by` without
    /// a preceding ordering, and for any filter or ordering written after
    /// `skip`/`take`.
    pub fn compile(operators: &[QueryOperator]) -> Result<PackageQuery> {
        let mut query = PackageQuery::default();

        for op in operators {
            match op {
                QueryOperator::Filter(_) | QueryOperator::OrderBy(_) | QueryOperator::ThenBy(_)
                    if query.is_paged() =>
                {
                    return Err(RepositoryError::UnsupportedOperator {
                        operator: op.name(),
                        reason: "cannot be applied after skip or take".to_string(),
                    });
                }
                QueryOperator::Filter(filter) => query.filters.push(filter.clone()),
                QueryOperator::OrderBy(key) => query.ordering = vec![*key],
                QueryOperator::ThenBy(key) => {
                    if query.ordering.is_empty() {
                        return Err(RepositoryError::UnsupportedOperator {
                            operator: op.name(),
                            reason: "requires a preceding order_by".to_string(),
                        });
                    }
                    query.ordering.push(*key);
                }
                QueryOperator::Skip(n) => {
                    query.skip = Some(query.skip.unwrap_or(0).saturating_add(*n));
                    // skipping inside an earlier take shrinks it
                    if let Some(take) = query.take {
                        query.take = Some(take.saturating_sub(*n));
                    }
                }
                QueryOperator::Take(n) => {
                    query.take = Some(query.take.map_or(*n, |take| take.min(*n)));
                }
            }
        }

        debug!(
            filters = query.filters.len(),
            ordering = query.ordering.len(),
            skip = ?query.skip,
            take = ?query.take,
            "compiled query"
        );
        Ok(query)
    }

    /// Form sent to each repository: pagination removed, default ordering
    /// filled in so repositories and the merge agree on the order.
    #[must_use]
    pub fn down(query: &PackageQuery) -> PackageQuery {
        let ordering = if query.ordering.is_empty() {
            DEFAULT_ORDERING.to_vec()
        } else {
            query.ordering.clone()
        };
        PackageQuery {
            filters: query.filters.clone(),
            ordering,
            skip: None,
            take: None,
        }
    }

    /// Form applied to the merged stream: filters and ordering removed.
    #[must_use]
    pub const fn up(query: &PackageQuery) -> PackageQuery {
        PackageQuery {
            filters: Vec::new(),
            ordering: Vec::new(),
            skip: query.skip,
            take: query.take,
        }
    }

    /// Count for a query whose per-repository counts are known.
    ///
    /// Counts are summed without removing packages served by more than one
    /// repository, so the result over-counts duplicates. Paging metadata
    /// relies on this figure as is.
    pub fn approximate_count(
        per_repository: impl IntoIterator<Item = usize>,
        up: &PackageQuery,
    ) -> usize {
        let total: usize = per_repository.into_iter().sum();
        let after_skip = total.saturating_sub(up.skip.unwrap_or(0));
        up.take.map_or(after_skip, |take| after_skip.min(take))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PackageFilter, SortKey, SortProperty};

    fn by_id() -> SortKey {
        SortKey::ascending(SortProperty::Id)
    }

    #[test]
    fn compile_collects_stages() {
        let query = QueryRewriter::compile(&[
            QueryOperator::Filter(PackageFilter::ListedOnly),
            QueryOperator::OrderBy(SortKey::descending(SortProperty::DownloadCount)),
            QueryOperator::ThenBy(by_id()),
            QueryOperator::Skip(10),
            QueryOperator::Take(5),
        ])
        .unwrap();

        assert_eq!(query.filters, [PackageFilter::ListedOnly]);
        assert_eq!(query.ordering.len(), 2);
        assert_eq!(query.skip, Some(10));
        assert_eq!(query.take, Some(5));
    }

    #[test]
    fn order_by_replaces_previous_ordering() {
        let query = QueryRewriter::compile(&[
            QueryOperator::OrderBy(SortKey::descending(SortProperty::Version)),
            QueryOperator::OrderBy(by_id()),
        ])
        .unwrap();
        assert_eq!(query.ordering, [by_id()]);
    }

    #[test]
    fn pagination_composes() {
        let query = QueryRewriter::compile(&[
            QueryOperator::Skip(2),
            QueryOperator::Take(10),
            QueryOperator::Skip(3),
            QueryOperator::Take(20),
        ])
        .unwrap();
        assert_eq!(query.skip, Some(5));
        assert_eq!(query.take, Some(7));
    }

    #[test]
    fn huge_skips_saturate() {
        let query =
            QueryRewriter::compile(&[QueryOperator::Skip(usize::MAX), QueryOperator::Skip(1)])
                .unwrap();
        assert_eq!(query.skip, Some(usize::MAX));
    }

    #[test]
    fn rejects_then_by_without_order() {
        let err = QueryRewriter::compile(&[QueryOperator::ThenBy(by_id())]).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnsupportedOperator { operator: "then_by", .. }
        ));
    }

    #[test]
    fn rejects_filter_after_pagination() {
        let err = QueryRewriter::compile(&[
            QueryOperator::Take(5),
            QueryOperator::Filter(PackageFilter::ListedOnly),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("'filter'"));

        let err =
            QueryRewriter::compile(&[QueryOperator::Skip(1), QueryOperator::OrderBy(by_id())])
                .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::UnsupportedOperator { operator: "order_by", .. }
        ));
    }

    #[test]
    fn down_strips_pagination() {
        let query = PackageQuery {
            filters: vec![PackageFilter::ExcludePrerelease],
            ordering: Vec::new(),
            skip: Some(4),
            take: Some(2),
        };
        let down = QueryRewriter::down(&query);
        assert_eq!(down.filters, query.filters);
        assert_eq!(down.ordering, DEFAULT_ORDERING);
        assert!(!down.is_paged());
    }

    #[test]
    fn up_strips_filters_and_ordering() {
        let query = PackageQuery {
            filters: vec![PackageFilter::ListedOnly],
            ordering: vec![by_id()],
            skip: Some(1),
            take: None,
        };
        let up = QueryRewriter::up(&query);
        assert!(up.filters.is_empty());
        assert!(up.ordering.is_empty());
        assert_eq!(up.skip, Some(1));
    }

    #[test]
    fn count_sums_without_dedup() {
        let up = PackageQuery::default();
        assert_eq!(QueryRewriter::approximate_count([3, 2], &up), 5);

        let paged = PackageQuery {
            skip: Some(4),
            take: Some(10),
            ..PackageQuery::default()
        };
        assert_eq!(QueryRewriter::approximate_count([3, 2], &paged), 1);
    }
}
