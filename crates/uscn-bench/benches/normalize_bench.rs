//! Normalizer (USCN canonical-form reducer) benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uscn_core::normalize::{Normalizer, NormalizerConfig};

fn bench_normalize_plain(c: &mut Criterion) {
    let normalizer = Normalizer::new(NormalizerConfig::default());
    let mut group = c.benchmark_group("normalize_plain");

    let sizes: &[usize] = &[16, 256, 4096];
    for &size in sizes {
        let input = vec![b'a'; size];
        group.bench_with_input(BenchmarkId::new("ascii", size), &input, |b, input| {
            b.iter(|| black_box(normalizer.normalize(black_box(input))));
        });
    }
    group.finish();
}

fn bench_normalize_percent_encoded(c: &mut Criterion) {
    let normalizer = Normalizer::new(NormalizerConfig::default());
    let mut group = c.benchmark_group("normalize_percent_encoded");

    group.bench_function("traversal_run", |b| {
        let input = "%2e%2e%2f".repeat(64);
        b.iter(|| black_box(normalizer.normalize(black_box(input.as_bytes()))));
    });

    group.finish();
}

criterion_group!(benches, bench_normalize_plain, bench_normalize_percent_encoded);
criterion_main!(benches);
