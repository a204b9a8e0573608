use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pprof::criterion::{Output, PProfProfiler};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use mtexp_core::{GridSpec, generate};
use mtexp_render::{GridStyle, rasterize_grid};

/// Rasterising happens once per trial, between the greeting and the first
/// stimulus frame, so it has to stay well under one tick.
pub fn bench_rasterize_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("rasterize_grid");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    let style = GridStyle::default();
    for distractors in [0usize, 5, 20] {
        let spec = GridSpec {
            distractor_count: distractors,
            ..GridSpec::default()
        };
        let (grid, _) = generate(&spec, true, &mut StdRng::seed_from_u64(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(distractors),
            &grid,
            |b, grid| {
                b.iter(|| black_box(rasterize_grid(black_box(grid), &style)));
            },
        );
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_rasterize_grid
}

criterion_main!(benches);
