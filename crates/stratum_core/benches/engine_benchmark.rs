//! # Engine Benchmark
//!
//! Creation, destruction, iteration and random lookup over a catalog of
//! three archetypes.
//!
//! Run with: `cargo bench --package stratum_core`

// Benchmarks don't need docs
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stratum_core::{CatalogBuilder, Engine, Entity};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default)]
struct Color {
    r: u8,
    g: u8,
    b: u8,
}

fn engine() -> Engine {
    let catalog = CatalogBuilder::new()
        .archetype::<()>()
        .archetype::<(Position,)>()
        .archetype::<(Position, Velocity)>()
        .archetype::<(Position, Velocity, Color)>()
        .build()
        .unwrap();
    Engine::new(catalog)
}

fn position(i: usize) -> Position {
    let v = i as f32;
    Position { x: v, y: v, z: v }
}

/// Generate deterministic "random" indices
fn generate_random_indices(count: usize, max: usize, seed: u64) -> Vec<usize> {
    let mut indices = Vec::with_capacity(count);
    let mut state = seed;

    for _ in 0..count {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        indices.push((state as usize) % max);
    }

    indices
}

// =============================================================================
// CREATION / DESTRUCTION
// =============================================================================

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    group.bench_function("no_components", |b| {
        b.iter_batched_ref(
            engine,
            |engine| {
                for _ in 0..ENTITY_COUNT {
                    black_box(engine.create(()).unwrap());
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.bench_function("two_components", |b| {
        b.iter_batched_ref(
            engine,
            |engine| {
                for i in 0..ENTITY_COUNT {
                    black_box(engine.create((position(i), Velocity::default())).unwrap());
                }
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

fn bench_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("destroy");

    for narrowed in [true, false] {
        group.bench_with_input(
            BenchmarkId::new("three_components", if narrowed { "exact" } else { "any" }),
            &narrowed,
            |b, &narrowed| {
                b.iter_batched_ref(
                    || {
                        let mut engine = engine();
                        let entities: Vec<Entity> = (0..ENTITY_COUNT)
                            .map(|i| {
                                engine
                                    .create((position(i), Velocity::default(), Color::default()))
                                    .unwrap()
                            })
                            .collect();
                        (engine, entities)
                    },
                    |(engine, entities)| {
                        for &e in entities.iter() {
                            if narrowed {
                                engine.destroy::<(Position, Velocity, Color)>(e).unwrap();
                            } else {
                                engine.destroy::<()>(e).unwrap();
                            }
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

// =============================================================================
// ITERATION / LOOKUP
// =============================================================================

fn bench_iterate(c: &mut Criterion) {
    let mut engine = engine();
    for i in 0..ENTITY_COUNT {
        match i % 3 {
            0 => engine.create((position(i),)).unwrap(),
            1 => engine.create((position(i), Velocity { x: 0.1, y: 0.2, z: 0.3 })).unwrap(),
            _ => engine
                .create((position(i), Velocity::default(), Color { r: 1, g: 2, b: 3 }))
                .unwrap(),
        };
    }

    c.bench_function("for_each_position_velocity", |b| {
        b.iter(|| {
            engine
                .for_each::<(&mut Position, &Velocity), _>(|_, (pos, vel)| {
                    pos.x += vel.x * 0.016;
                    pos.y += vel.y * 0.016;
                    pos.z += vel.z * 0.016;
                })
                .unwrap();
        });
    });

    c.bench_function("for_each_color", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            engine
                .for_each::<&Color, _>(|_, color| {
                    sum += u64::from(color.r) + u64::from(color.g) + u64::from(color.b);
                })
                .unwrap();
            black_box(sum)
        });
    });
}

fn bench_random_get(c: &mut Criterion) {
    let mut engine = engine();
    let entities: Vec<Entity> = (0..ENTITY_COUNT)
        .map(|i| engine.create((position(i), Velocity::default())).unwrap())
        .collect();
    let random_indices = generate_random_indices(ENTITY_COUNT, ENTITY_COUNT, 0xDEAD_BEEF);

    c.bench_function("random_get_position", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for &idx in &random_indices {
                if let Ok(pos) = engine.get::<Position>(entities[idx]) {
                    sum += pos.x;
                }
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_destroy,
    bench_iterate,
    bench_random_get
);
criterion_main!(benches);
