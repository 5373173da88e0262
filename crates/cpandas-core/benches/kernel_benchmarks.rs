//! Criterion benchmarks for the relational kernel.
//!
//! Run with: `cargo bench`
//!
//! Grounded on the retrieval pack's `block_benchmarks.rs`
//! (`Origin-pod-Origin-DB-Simulator/block-system/benches`): one
//! `benchmark_group` per input size, `black_box` around the timed result, a
//! separate comparison group for the three join strategies.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cpandas_core::frame::Frame;
use cpandas_core::groupby::{groupby_agg, AggOp};
use cpandas_core::join::{join, How, Strategy};
use cpandas_core::series::Series;
use cpandas_core::sort::sort_values;

fn key_frame(n: usize, distinct_keys: i64) -> Frame {
    let ids: Vec<i64> = (0..n as i64).map(|i| i % distinct_keys).collect();
    let values: Vec<i64> = (0..n as i64).collect();
    Frame::from_series(vec![
        Series::from_i64("key", ids, vec![true; n]).unwrap(),
        Series::from_i64("value", values, vec![true; n]).unwrap(),
    ])
    .unwrap()
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_values");
    for n in [1_000, 10_000, 100_000] {
        let frame = key_frame(n, n as i64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &frame, |b, frame| {
            b.iter(|| black_box(sort_values(frame, "value", true).unwrap()));
        });
    }
    group.finish();
}

fn bench_groupby(c: &mut Criterion) {
    let mut group = c.benchmark_group("groupby_agg");
    for n in [1_000, 10_000, 100_000] {
        let frame = key_frame(n, 100);
        group.bench_with_input(BenchmarkId::from_parameter(n), &frame, |b, frame| {
            b.iter(|| black_box(groupby_agg(frame, "key", &["value"], &[AggOp::Sum]).unwrap()));
        });
    }
    group.finish();
}

fn bench_join_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_strategy_comparison");
    let left = key_frame(5_000, 1_000);
    let right = key_frame(5_000, 1_000);

    for (label, strategy) in [("nested", Strategy::Nested), ("hash", Strategy::Hash), ("sorted", Strategy::Sorted)] {
        group.bench_function(label, |b| {
            b.iter(|| black_box(join(&left, &right, &["key"], &["key"], How::Inner, strategy).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(kernel_benches, bench_sort, bench_groupby, bench_join_strategies);
criterion_main!(kernel_benches);
