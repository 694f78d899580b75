//! Ordered, deduplicating merge of several sorted streams.
//!
//! Every round peeks the head of each active source concurrently and waits
//! for all of them before choosing, so the output order depends only on the
//! comparer and on registration order, never on which source answered
//! first. Only the winning source is advanced; the other heads stay
//! memoized for the next round.
//!
//! Nothing is spawned. Dropping the merge drops every source stream, so an
//! abandoned enumeration performs no further I/O.

use crate::cursor::LookaheadCursor;
use crate::error::{RepositoryError, Result};
use crate::query::PackageQuery;
use ahash::AHashSet;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::{self, BoxStream};
use quiver_core::IdentityComparer;
use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Comparison function shared by a merge.
pub type Comparer<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A named, already sorted stream taking part in a merge.
pub struct OrderedOrigin<T> {
    name: String,
    stream: BoxStream<'static, Result<T>>,
}

impl<T> OrderedOrigin<T> {
    /// Tag a sorted stream with a name.
    pub fn new(name: impl Into<String>, stream: BoxStream<'static, Result<T>>) -> Self {
        Self {
            name: name.into(),
            stream,
        }
    }

    /// Origin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for OrderedOrigin<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedOrigin")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Counters for one merge enumeration.
#[derive(Debug, Default)]
pub struct MergeStats {
    /// Peek rounds performed.
    pub rounds: AtomicU64,
    /// Items yielded.
    pub emitted: AtomicU64,
    /// Items dropped because an equal identity was already yielded.
    pub duplicates_skipped: AtomicU64,
    /// Sources dropped after failing in ignore mode.
    pub failed_sources: AtomicU64,
}

impl MergeStats {
    /// Get summary string.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Merge: {} rounds, {} emitted, {} duplicates skipped, {} failed sources",
            self.rounds.load(AtomicOrdering::Relaxed),
            self.emitted.load(AtomicOrdering::Relaxed),
            self.duplicates_skipped.load(AtomicOrdering::Relaxed),
            self.failed_sources.load(AtomicOrdering::Relaxed),
        )
    }
}

struct ActiveSource<T> {
    name: String,
    cursor: LookaheadCursor<BoxStream<'static, Result<T>>, T>,
}

/// Lazy k-way merge with identity-based deduplication.
///
/// Single pass: once the merge returns `None` (or an error) it stays done.
pub struct StreamingMerge<T, E: IdentityComparer<T>> {
    // kept in registration order; ties resolve to the earliest entry
    active: Vec<ActiveSource<T>>,
    comparer: Comparer<T>,
    identity: E,
    seen: AHashSet<E::Key>,
    ignore_failing: bool,
    cancel: Option<CancellationToken>,
    stats: Arc<MergeStats>,
    finished: bool,
}

impl<T, E: IdentityComparer<T>> std::fmt::Debug for StreamingMerge<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.active.iter().map(|s| s.name.as_str()).collect();
        f.debug_struct("StreamingMerge")
            .field("active", &names)
            .field("seen", &self.seen.len())
            .field("ignore_failing", &self.ignore_failing)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<T, E> StreamingMerge<T, E>
where
    T: Send + 'static,
    E: IdentityComparer<T> + 'static,
{
    /// Merge `origins`, each already sorted by `comparer`.
    pub fn new<F>(origins: Vec<OrderedOrigin<T>>, comparer: F, identity: E) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        let active = origins
            .into_iter()
            .map(|origin| ActiveSource {
                name: origin.name,
                cursor: LookaheadCursor::new(origin.stream),
            })
            .collect();

        Self {
            active,
            comparer: Arc::new(comparer),
            identity,
            seen: AHashSet::new(),
            ignore_failing: false,
            cancel: None,
            stats: Arc::new(MergeStats::default()),
            finished: false,
        }
    }

    /// Treat a failing source as exhausted instead of failing the merge.
    #[must_use]
    pub fn ignore_failing_sources(mut self, ignore: bool) -> Self {
        self.ignore_failing = ignore;
        self
    }

    /// Stop with [`RepositoryError::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Counters for this enumeration.
    #[must_use]
    pub fn stats(&self) -> Arc<MergeStats> {
        Arc::clone(&self.stats)
    }

    /// Sources still being read.
    #[must_use]
    pub fn active_sources(&self) -> usize {
        self.active.len()
    }

    /// Next item in merged order.
    ///
    /// Returns `None` once every source is exhausted. An error ends the
    /// merge; subsequent calls return `None`.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }

        loop {
            if let Err(err) = self.poll_round().await {
                self.finish();
                return Some(Err(err));
            }

            let Some(winner) = self.select_winner() else {
                self.finish();
                return None;
            };

            let source = &mut self.active[winner];
            let Some(item) = source.cursor.advance() else {
                continue;
            };

            if self.seen.insert(self.identity.identity(&item)) {
                self.stats.emitted.fetch_add(1, AtomicOrdering::Relaxed);
                return Some(Ok(item));
            }

            trace!(source = %source.name, "skipping duplicate");
            self.stats
                .duplicates_skipped
                .fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Turn the merge into a stream.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        stream::unfold(self, |mut merge| async move {
            merge.next().await.map(|item| (item, merge))
        })
        .boxed()
    }

    /// Peek every active source concurrently and drop the exhausted ones.
    async fn poll_round(&mut self) -> Result<()> {
        if self.active.is_empty() {
            return Ok(());
        }
        self.stats.rounds.fetch_add(1, AtomicOrdering::Relaxed);

        let peeks = join_all(self.active.iter_mut().map(|s| s.cursor.try_peek()));
        let results = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(RepositoryError::Cancelled),
                results = peeks => results,
            },
            None => peeks.await,
        };

        let mut first_error = None;
        for (source, result) in std::mem::take(&mut self.active).into_iter().zip(results) {
            match result {
                Ok(true) => self.active.push(source),
                Ok(false) => debug!(source = %source.name, "source exhausted"),
                Err(err) if self.ignore_failing => {
                    warn!(source = %source.name, error = %err, "ignoring failing source");
                    self.stats.failed_sources.fetch_add(1, AtomicOrdering::Relaxed);
                }
                Err(err) => {
                    debug!(source = %source.name, error = %err, "source failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Index of the active source holding the smallest head.
    fn select_winner(&self) -> Option<usize> {
        let mut best: Option<(usize, &T)> = None;
        for (index, source) in self.active.iter().enumerate() {
            let Some(head) = source.cursor.peek() else {
                continue;
            };
            match best {
                // strictly less, so equal heads keep the earlier source
                Some((_, current)) if (self.comparer)(head, current) != Ordering::Less => {}
                _ => best = Some((index, head)),
            }
        }
        best.map(|(index, _)| index)
    }

    fn finish(&mut self) {
        self.finished = true;
        self.active.clear();
        trace!(stats = %self.stats.summary(), "merge finished");
    }
}

/// Merged stream with the post-merge pagination of a query applied.
#[derive(Debug)]
pub struct Paginated<T, E: IdentityComparer<T>> {
    merge: StreamingMerge<T, E>,
    to_skip: usize,
    remaining: Option<usize>,
}

impl<T, E> Paginated<T, E>
where
    T: Send + 'static,
    E: IdentityComparer<T> + 'static,
{
    /// Apply the `skip`/`take` of `up` to `merge`.
    pub fn new(merge: StreamingMerge<T, E>, up: &PackageQuery) -> Self {
        Self {
            merge,
            to_skip: up.skip.unwrap_or(0),
            remaining: up.take,
        }
    }

    /// Counters of the underlying merge.
    #[must_use]
    pub fn stats(&self) -> Arc<MergeStats> {
        self.merge.stats()
    }

    /// Next item of the page.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.remaining == Some(0) {
            return None;
        }
        loop {
            match self.merge.next().await? {
                Ok(_) if self.to_skip > 0 => self.to_skip -= 1,
                Ok(item) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(Ok(item));
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Turn the page into a stream.
    #[must_use]
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        stream::unfold(self, |mut page| async move {
            page.next().await.map(|item| (item, page))
        })
        .boxed()
    }

    /// Collect the whole page.
    ///
    /// # Errors
    /// Returns the first error raised by the merge.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use proptest::prelude::*;
    use std::time::Duration;

    struct ByValue;

    impl IdentityComparer<u32> for ByValue {
        type Key = u32;

        fn identity(&self, item: &u32) -> u32 {
            *item
        }
    }

    /// Identity and ordering by the first element; the second names the source.
    struct ByKey;

    impl IdentityComparer<(u32, &'static str)> for ByKey {
        type Key = u32;

        fn identity(&self, item: &(u32, &'static str)) -> u32 {
            item.0
        }
    }

    fn origin<T: Send + 'static>(name: &str, items: Vec<T>) -> OrderedOrigin<T> {
        OrderedOrigin::new(name, stream::iter(items.into_iter().map(Ok)).boxed())
    }

    fn failing<T: Send + 'static>(name: &str, before: Vec<T>) -> OrderedOrigin<T> {
        let err = RepositoryError::source_failed(name, "connection reset");
        let items = before
            .into_iter()
            .map(Ok)
            .chain(std::iter::once(Err(err)));
        OrderedOrigin::new(name, stream::iter(items).boxed())
    }

    fn merge_u32(origins: Vec<OrderedOrigin<u32>>) -> StreamingMerge<u32, ByValue> {
        StreamingMerge::new(origins, |a: &u32, b: &u32| a.cmp(b), ByValue)
    }

    #[tokio::test]
    async fn merges_in_order_without_duplicates() {
        let merge = merge_u32(vec![
            origin("a", vec![1, 4, 7]),
            origin("b", vec![2, 4, 8]),
            origin("c", vec![1, 3, 9]),
        ]);
        let stats = merge.stats();
        let out: Vec<u32> = merge.into_stream().try_collect().await.unwrap();

        assert_eq!(out, [1, 2, 3, 4, 7, 8, 9]);
        assert_eq!(stats.emitted.load(AtomicOrdering::Relaxed), 7);
        assert_eq!(stats.duplicates_skipped.load(AtomicOrdering::Relaxed), 2);
    }

    #[tokio::test]
    async fn ties_go_to_first_registered_source() {
        let merge = StreamingMerge::new(
            vec![
                origin("first", vec![(1, "first"), (2, "first")]),
                origin("second", vec![(1, "second"), (2, "second"), (3, "second")]),
            ],
            |a: &(u32, &str), b: &(u32, &str)| a.0.cmp(&b.0),
            ByKey,
        );
        let out: Vec<(u32, &str)> = merge.into_stream().try_collect().await.unwrap();
        assert_eq!(out, [(1, "first"), (2, "first"), (3, "second")]);
    }

    #[tokio::test]
    async fn no_sources_yields_nothing() {
        let mut merge = merge_u32(Vec::new());
        assert!(merge.next().await.is_none());
        assert!(merge.next().await.is_none());
    }

    #[tokio::test]
    async fn failure_aborts_by_default() {
        let mut merge = merge_u32(vec![
            origin("a", vec![1, 2, 3]),
            failing("broken", Vec::new()),
        ]);
        let err = merge.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::SourceFailed { ref repository, .. } if repository == "broken"
        ));
        assert!(merge.next().await.is_none());
    }

    #[tokio::test]
    async fn ignore_mode_drops_failing_source() {
        let merge = merge_u32(vec![
            origin("a", vec![1, 5]),
            failing("broken", vec![2]),
            origin("c", vec![3, 4]),
        ])
        .ignore_failing_sources(true);
        let stats = merge.stats();
        let out: Vec<u32> = merge.into_stream().try_collect().await.unwrap();

        // 2 was served before the failure and stays in the output
        assert_eq!(out, [1, 2, 3, 4, 5]);
        assert_eq!(stats.failed_sources.load(AtomicOrdering::Relaxed), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_the_merge() {
        let token = CancellationToken::new();
        let mut merge = merge_u32(vec![origin("a", vec![1, 2])]).with_cancellation(token.clone());

        assert_eq!(merge.next().await.unwrap().unwrap(), 1);
        token.cancel();
        assert_eq!(merge.next().await.unwrap().unwrap_err(), RepositoryError::Cancelled);
        assert!(merge.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_poll_sources_concurrently() {
        fn slow(name: &str, items: Vec<u32>) -> OrderedOrigin<u32> {
            let s = stream::iter(items).then(|x| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<u32, RepositoryError>(x)
            });
            OrderedOrigin::new(name, s.boxed())
        }

        let mut merge = merge_u32(vec![slow("a", vec![2]), slow("b", vec![1]), slow("c", vec![3])]);
        let start = tokio::time::Instant::now();
        assert_eq!(merge.next().await.unwrap().unwrap(), 1);
        // one barrier round, not three sequential fetches
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn order_ignores_arrival_time() {
        let fast = origin("fast", vec![5, 6]);
        let late = stream::iter(vec![1u32, 2])
            .then(|x| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<u32, RepositoryError>(x)
            })
            .boxed();
        let merge = merge_u32(vec![fast, OrderedOrigin::new("late", late)]);
        let out: Vec<u32> = merge.into_stream().try_collect().await.unwrap();
        assert_eq!(out, [1, 2, 5, 6]);
    }

    #[tokio::test]
    async fn pagination_slices_the_merged_stream() {
        let sources = || {
            vec![
                origin("a", vec![1, 3, 5, 7, 9]),
                origin("b", vec![2, 3, 4, 6, 8]),
            ]
        };
        let full: Vec<u32> = merge_u32(sources()).into_stream().try_collect().await.unwrap();

        let up = PackageQuery {
            skip: Some(2),
            take: Some(4),
            ..PackageQuery::default()
        };
        let page = Paginated::new(merge_u32(sources()), &up).collect().await.unwrap();
        assert_eq!(page, full[2..6]);
        assert_eq!(page, [3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn exhausted_take_stops_reading() {
        let up = PackageQuery {
            take: Some(0),
            ..PackageQuery::default()
        };
        let mut page = Paginated::new(merge_u32(vec![failing("broken", Vec::new())]), &up);
        assert!(page.next().await.is_none());
    }

    proptest! {
        #[test]
        fn merged_output_is_sorted_union(
            mut sources in prop::collection::vec(prop::collection::vec(0u32..50, 0..20), 0..5)
        ) {
            let mut expected: Vec<u32> = sources.iter().flatten().copied().collect();
            expected.sort_unstable();
            expected.dedup();

            for source in &mut sources {
                source.sort_unstable();
            }
            let origins = sources
                .into_iter()
                .enumerate()
                .map(|(i, items)| origin(&format!("s{i}"), items))
                .collect();

            let out: Vec<u32> = futures::executor::block_on(
                merge_u32(origins).into_stream().try_collect(),
            )
            .unwrap();
            prop_assert_eq!(out, expected);
        }
    }
}
