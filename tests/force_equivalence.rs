mod common;

use nonceling_core::force::ForceModel;
use nonceling_core::spatial_hash::SpatialHash;

#[test]
fn test_partitioned_forces_equal_naive_on_live_creature() {
    for (seed, steps) in [(1u32, 0u64), (12_345, 45), (0xFEED_F00D, 120)] {
        let creature = common::stepped(seed, steps);
        let config = &creature.config().physics;
        let model = ForceModel::from_config(config);
        let particles = creature.particles();
        let matrix = creature.force_matrix();

        let naive = model.accumulate_naive(particles, matrix);
        let mut grid = SpatialHash::new(config.interaction_cutoff);
        let serial = model.accumulate_partitioned(particles, matrix, &mut grid, false);
        let parallel = model.accumulate_partitioned(particles, matrix, &mut grid, true);

        assert_eq!(naive, serial, "serial grid differs for seed {seed:#x}");
        assert_eq!(naive, parallel, "parallel grid differs for seed {seed:#x}");
    }
}

#[test]
fn test_grid_reuse_across_creatures() {
    let a = common::stepped(10, 20);
    let b = common::stepped(11, 20);
    let model = ForceModel::from_config(&a.config().physics);
    let mut grid = SpatialHash::new(model.cutoff);

    let first = model.accumulate_partitioned(a.particles(), a.force_matrix(), &mut grid, true);
    let second = model.accumulate_partitioned(b.particles(), b.force_matrix(), &mut grid, true);
    assert_eq!(first, model.accumulate_naive(a.particles(), a.force_matrix()));
    assert_eq!(second, model.accumulate_naive(b.particles(), b.force_matrix()));
}
