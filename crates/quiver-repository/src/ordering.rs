//! Comparison functions derived from sort keys.

use crate::query::{SortDirection, SortKey, SortProperty};
use quiver_core::Package;
use std::cmp::Ordering;

/// Ordering used when a query names no sort keys.
pub const DEFAULT_ORDERING: [SortKey; 2] = [
    SortKey::ascending(SortProperty::Id),
    SortKey::ascending(SortProperty::Version),
];

/// Total order over packages built from a list of sort keys.
///
/// Repositories sort their results with it and the merge uses it to pick the
/// smallest head across repositories, so both sides must be built from the
/// same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingRule {
    keys: Vec<SortKey>,
}

impl OrderingRule {
    /// Build a rule from sort keys; an empty list gives [`DEFAULT_ORDERING`].
    #[must_use]
    pub fn new(keys: &[SortKey]) -> Self {
        let keys = if keys.is_empty() {
            DEFAULT_ORDERING.to_vec()
        } else {
            keys.to_vec()
        };
        Self { keys }
    }

    /// Sort keys, most significant first.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare two packages key by key.
    #[must_use]
    pub fn compare(&self, a: &Package, b: &Package) -> Ordering {
        for key in &self.keys {
            let ord = compare_property(key.property, a, b);
            let ord = match key.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Default for OrderingRule {
    fn default() -> Self {
        Self::new(&[])
    }
}

fn compare_property(property: SortProperty, a: &Package, b: &Package) -> Ordering {
    match property {
        SortProperty::Id => a.id.cmp(&b.id),
        SortProperty::Version => a.version.cmp(&b.version),
        SortProperty::Title => a
            .display_title()
            .to_lowercase()
            .cmp(&b.display_title().to_lowercase()),
        SortProperty::DownloadCount => a.download_count.cmp(&b.download_count),
        SortProperty::Published => a.published.cmp(&b.published),
    }
}
