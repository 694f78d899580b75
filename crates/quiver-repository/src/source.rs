//! Bounded read-ahead over a single repository.

use crate::error::Result;
use crate::merge::OrderedOrigin;
use crate::query::PackageQuery;
use crate::repository::PackageRepository;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use quiver_core::Package;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// One repository paired with the query it should evaluate.
///
/// Results are pulled in windows of at most `window` packages, so an
/// enumeration that stops early never reads more than one window past the
/// last consumed package.
#[derive(Clone)]
pub struct SourceQuery {
    repository: Arc<dyn PackageRepository>,
    query: PackageQuery,
    window: usize,
}

impl std::fmt::Debug for SourceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceQuery")
            .field("repository", &self.repository.name())
            .field("query", &self.query)
            .field("window", &self.window)
            .finish()
    }
}

struct WindowState {
    source: SourceQuery,
    buffer: VecDeque<Package>,
    offset: usize,
    exhausted: bool,
}

impl SourceQuery {
    /// Pair a repository with an already rewritten query.
    pub fn new(repository: Arc<dyn PackageRepository>, query: PackageQuery, window: usize) -> Self {
        Self {
            repository,
            query,
            window: window.max(1),
        }
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.repository.name()
    }

    /// Query evaluated against the repository.
    #[must_use]
    pub const fn query(&self) -> &PackageQuery {
        &self.query
    }

    /// Lazily stream the repository's results, one window at a time.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<Package>> {
        let state = WindowState {
            source: self,
            buffer: VecDeque::new(),
            offset: 0,
            exhausted: false,
        };

        stream::try_unfold(state, |mut state| async move {
            if state.buffer.is_empty() && !state.exhausted {
                let window = state.source.window;
                let page = state.source.query.window(state.offset, window);
                let items = state.source.repository.query_page(&page).await?;

                trace!(
                    repository = state.source.name(),
                    offset = state.offset,
                    received = items.len(),
                    "read window"
                );

                // a short window means the repository has nothing more
                state.exhausted = items.len() < window;
                state.offset += items.len();
                state.buffer.extend(items);
            }
            Ok(state.buffer.pop_front().map(|item| (item, state)))
        })
        .boxed()
    }

    /// Stream tagged with the repository name, ready for merging.
    #[must_use]
    pub fn into_origin(self) -> OrderedOrigin<Package> {
        let name = self.name().to_string();
        OrderedOrigin::new(name, self.into_stream())
    }
}
