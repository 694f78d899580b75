//! Aggregate package repositories for quiver.
//!
//! Several package repositories can be queried as if they were one:
//!
//! - **Query rewriting**: a query is split into the part every repository
//!   evaluates (filters and ordering) and the part applied to the merged
//!   result (skip and take).
//!
//! - **Bounded read-ahead**: each repository is read one window at a time,
//!   so abandoning an enumeration early never fetches everything.
//!
//! - **Streaming merge**: per-repository streams are merged in order while
//!   duplicates are dropped. Each round waits for every repository, which
//!   keeps the output deterministic regardless of response timing.
//!
//! - **Failure tolerance**: a failing repository either aborts the query or,
//!   when configured, is logged and treated as empty.
//!
//! ## Example
//!
//! ```no_run
//! use quiver_repository::{AggregateRepository, MemoryRepository, PackageRepository, SortProperty};
//! use std::sync::Arc;
//!
//! # async fn example() -> quiver_repository::Result<()> {
//! let local: Arc<dyn PackageRepository> =
//!     Arc::new(MemoryRepository::from_json("local", r#"[{"id": "Alpha", "version": "1.0"}]"#)?);
//! let mirror: Arc<dyn PackageRepository> = Arc::new(MemoryRepository::new("mirror"));
//!
//! let aggregate = AggregateRepository::new([local, mirror]);
//! let top = aggregate
//!     .get_packages()
//!     .search("alpha")
//!     .order_by_descending(SortProperty::DownloadCount)
//!     .take(10)
//!     .to_vec()
//!     .await?;
//! for package in &top {
//!     println!("{package}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod config;
pub mod cursor;
pub mod error;
pub mod memory;
pub mod merge;
pub mod ordering;
pub mod query;
pub mod repository;
pub mod rewriter;
pub mod source;

// Re-export main types
pub use aggregate::{AggregateRepository, PackageQueryable};
pub use config::{AggregateConfig, ConfigEnvVar, DEFAULT_READ_AHEAD_WINDOW};
pub use cursor::LookaheadCursor;
pub use error::{RepositoryError, Result};
pub use memory::MemoryRepository;
pub use merge::{MergeStats, OrderedOrigin, Paginated, StreamingMerge};
pub use ordering::{DEFAULT_ORDERING, OrderingRule};
pub use query::{PackageFilter, PackageQuery, QueryOperator, SortDirection, SortKey, SortProperty};
pub use repository::{DependencyLookup, PackageLookup, PackageRepository};
pub use rewriter::QueryRewriter;
pub use source::SourceQuery;

pub use tokio_util::sync::CancellationToken;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_window() {
        assert_eq!(AggregateConfig::default().read_ahead_window, DEFAULT_READ_AHEAD_WINDOW);
    }
}
