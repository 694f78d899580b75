//! Core types for the quiver package query engine.
//!
//! Packages are identified by a case-insensitive [`PackageId`] and a
//! four-part [`SemanticVersion`]. Version ranges are expressed with
//! [`VersionSpec`], and cross-repository deduplication goes through an
//! explicit [`IdentityComparer`].

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod identity;
pub mod package;
pub mod version;
pub mod version_spec;

pub use error::{Error, Result};
pub use identity::{IdentityComparer, IdentityKey, PackageIdentity};
pub use package::{Package, PackageDependency, PackageId};
pub use version::SemanticVersion;
pub use version_spec::VersionSpec;
