use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nonceling_core::creature::Creature;
use nonceling_core::force::{generate_matrix, ForceModel};
use nonceling_core::rng::SeededRng;
use nonceling_core::spatial_hash::SpatialHash;
use nonceling_data::DVec3;

fn positions() -> Vec<DVec3> {
    let mut rng = SeededRng::new(42);
    (0..500)
        .map(|_| {
            DVec3::new(
                rng.range(-24.0, 24.0),
                rng.range(-24.0, 24.0),
                rng.range(-24.0, 24.0),
            )
        })
        .collect()
}

fn bench_spatial_hash_build(c: &mut Criterion) {
    let positions = positions();
    c.bench_function("spatial_hash_build_500", |b| {
        b.iter(|| {
            let mut spatial = SpatialHash::new(8.0);
            spatial.build_parallel(&positions);
            black_box(spatial)
        })
    });
}

fn bench_force_accumulation(c: &mut Criterion) {
    let creature = Creature::new(0x1234_5678);
    let particles = creature.particles().to_vec();
    let matrix = generate_matrix(&mut SeededRng::new(1));
    let model = ForceModel::new(8.0, 0.5);

    c.bench_function("forces_naive_500", |b| {
        b.iter(|| black_box(model.accumulate_naive(&particles, &matrix)))
    });

    let mut grid = SpatialHash::new(8.0);
    c.bench_function("forces_partitioned_500", |b| {
        b.iter(|| black_box(model.accumulate_partitioned(&particles, &matrix, &mut grid, false)))
    });
    c.bench_function("forces_partitioned_parallel_500", |b| {
        b.iter(|| black_box(model.accumulate_partitioned(&particles, &matrix, &mut grid, true)))
    });
}

fn bench_creature_step(c: &mut Criterion) {
    let mut creature = Creature::new(0x1234_5678);
    c.bench_function("creature_step_500", |b| b.iter(|| creature.step()));
}

criterion_group!(
    benches,
    bench_spatial_hash_build,
    bench_force_accumulation,
    bench_creature_step
);
criterion_main!(benches);
