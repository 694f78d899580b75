//! Aggregate query benchmarks.
//!
//! Measures merging several in-memory repositories with overlapping content.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use quiver_core::{Package, PackageId, SemanticVersion};
use quiver_repository::{
    AggregateConfig, AggregateRepository, MemoryRepository, PackageRepository, SortProperty,
};
use std::sync::Arc;

/// Build `repositories` repositories of `packages` each, half shared with
/// the next repository.
fn build_aggregate(repositories: usize, packages: usize, window: usize) -> AggregateRepository {
    let repos: Vec<Arc<dyn PackageRepository>> = (0..repositories)
        .map(|r| {
            let start = r * packages / 2;
            let items = (start..start + packages).map(|i| {
                let mut package = Package::new(
                    PackageId::new(format!("vendor.package{i:05}")),
                    SemanticVersion::new(1, (i % 7) as u32, 0, 0),
                );
                package.download_count = (i as u64 * 7919) % 10_000;
                package
            });
            Arc::new(MemoryRepository::with_packages(format!("repo{r}"), items))
                as Arc<dyn PackageRepository>
        })
        .collect();

    AggregateRepository::with_config(
        repos,
        AggregateConfig {
            read_ahead_window: window,
            ..AggregateConfig::default()
        },
    )
}

/// Benchmark full enumeration in default order.
fn bench_full_merge(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("full_merge");

    for repositories in [2usize, 4, 8] {
        let aggregate = build_aggregate(repositories, 1_000, 30);
        group.throughput(Throughput::Elements((repositories * 1_000) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(repositories),
            &aggregate,
            |b, aggregate| {
                b.iter(|| {
                    runtime.block_on(async {
                        let packages = aggregate.get_packages().to_vec().await.unwrap();
                        black_box(packages.len())
                    })
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a first page ordered by downloads, for several window sizes.
fn bench_first_page(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("first_page");

    for window in [10usize, 30, 100] {
        let aggregate = build_aggregate(4, 2_000, window);
        group.bench_with_input(BenchmarkId::from_parameter(window), &aggregate, |b, aggregate| {
            b.iter(|| {
                runtime.block_on(async {
                    let page = aggregate
                        .get_packages()
                        .order_by_descending(SortProperty::DownloadCount)
                        .take(20)
                        .to_vec()
                        .await
                        .unwrap();
                    black_box(page)
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_merge, bench_first_page);
criterion_main!(benches);
