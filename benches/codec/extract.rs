//! Benchmarks for run-merging extraction.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use agentic_sequencer::sequencing::extract_events;

use super::busy_pattern;
use crate::STEP_COUNTS;

pub fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/extract");

    for &steps in STEP_COUNTS {
        let pattern = busy_pattern(steps);
        group.bench_with_input(BenchmarkId::new("busy", steps), &steps, |b, _| {
            b.iter(|| extract_events(black_box(&pattern)))
        });

        let empty = pattern.cleared();
        group.bench_with_input(BenchmarkId::new("empty", steps), &steps, |b, _| {
            b.iter(|| extract_events(black_box(&empty)))
        });
    }

    group.finish();
}
