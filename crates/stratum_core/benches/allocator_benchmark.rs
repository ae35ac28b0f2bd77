//! # Entity Allocator Benchmark
//!
//! Generate/release churn in the fixed tier and across both tiers.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stratum_core::EntityAllocator;

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator_churn");

    // Fits the fixed tier, spills into overflow, spills far into overflow.
    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut allocator = EntityAllocator::new();
            let mut live = Vec::with_capacity(count);
            b.iter(|| {
                for _ in 0..count {
                    live.push(allocator.generate().unwrap());
                }
                for e in live.drain(..) {
                    allocator.release(e).unwrap();
                }
                black_box(allocator.reusable())
            });
        });
    }

    group.finish();
}

fn bench_swap(c: &mut Criterion) {
    c.bench_function("allocator_swap", |b| {
        b.iter_batched_ref(
            || {
                let mut allocator = EntityAllocator::new();
                let count = EntityAllocator::FIXED_CAPACITY * 3;
                let live: Vec<_> = (0..count).map(|_| allocator.generate().unwrap()).collect();
                for e in live {
                    allocator.release(e).unwrap();
                }
                for _ in 0..EntityAllocator::FIXED_CAPACITY {
                    allocator.generate().unwrap();
                }
                allocator
            },
            |allocator| {
                allocator.swap();
                allocator.shrink_to_fit();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_churn, bench_swap);
criterion_main!(benches);
