//! Dependency version selection for quiver.
//!
//! Given a dependency id and an optional [`VersionSpec`](quiver_core::VersionSpec),
//! the resolver gathers every known version from an
//! [`AggregateRepository`](quiver_repository::AggregateRepository) and picks
//! one deterministically:
//!
//! - no spec: the newest version;
//! - with a spec: the newest version on the lowest (major, minor) line that
//!   satisfies it.
//!
//! # Example
//!
//! ```no_run
//! use quiver_core::{PackageDependency, PackageId, VersionSpec};
//! use quiver_repository::{AggregateRepository, MemoryRepository, PackageRepository};
//! use quiver_resolver::{DependencyResolver, ResolverConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> quiver_resolver::Result<()> {
//! let local: Arc<dyn PackageRepository> = Arc::new(MemoryRepository::new("local"));
//! let aggregate = Arc::new(AggregateRepository::new([local]));
//! let resolver = DependencyResolver::new(aggregate, ResolverConfig::default());
//!
//! let dependency = PackageDependency::new(
//!     PackageId::new("Alpha"),
//!     VersionSpec::parse("[1.0,2.0)").ok(),
//! );
//! if let Some(package) = resolver.resolve(&dependency).await? {
//!     println!("{package}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod candidates;
pub mod error;
pub mod resolver;

// Re-export main types
pub use candidates::CandidateSet;
pub use error::{ResolveError, Result};
pub use resolver::{DependencyResolver, ResolverConfig, ResolverStats, select_version};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
