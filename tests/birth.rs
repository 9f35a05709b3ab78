use nonceling_core::creature::Creature;
use nonceling_data::ParticleRole;

#[test]
fn test_seed_12345_birth() {
    let creature = Creature::new(12_345);
    assert_eq!(creature.particles().len(), 500);
    assert_eq!(creature.groups().len(), 5);
    assert_eq!(creature.confirmations(), 0);
    for (group, role) in creature.groups().iter().zip(ParticleRole::ALL) {
        assert_eq!(group.role, role);
        assert!(group.count >= 40, "{} has only {} particles", role, group.count);
    }
}

#[test]
fn test_population_sums_to_500_for_every_seed() {
    for seed in (0..500u32).map(|s| s.wrapping_mul(2_654_435_761)) {
        let creature = Creature::new(seed);
        let total: usize = creature.groups().iter().map(|g| g.count).sum();
        assert_eq!(total, 500, "seed {seed:#x}");
        assert_eq!(creature.particles().len(), 500);
    }
}

#[test]
fn test_particle_ids_and_group_membership() {
    let creature = Creature::new(8);
    for (i, p) in creature.particles().iter().enumerate() {
        assert_eq!(p.id, i as u64);
        let group = &creature.groups()[p.group_id];
        assert_eq!(p.role, group.role);
        assert_eq!(p.mass, group.scale);
    }
    for group in creature.groups() {
        let members = creature
            .particles()
            .iter()
            .filter(|p| p.group_id == group.id)
            .count();
        assert_eq!(members, group.count);
    }
}

#[test]
fn test_matrix_bounded_and_not_symmetric() {
    let mut asymmetric = false;
    for seed in 0..20u32 {
        let creature = Creature::new(seed);
        let m = creature.force_matrix();
        for a in ParticleRole::ALL {
            for b in ParticleRole::ALL {
                assert!((-1.0..=1.0).contains(&m.get(a, b)));
            }
        }
        if m.get(ParticleRole::Core, ParticleRole::Attack)
            != m.get(ParticleRole::Attack, ParticleRole::Core)
        {
            asymmetric = true;
        }
    }
    assert!(asymmetric, "Core/Attack entries never differed");
}

#[test]
fn test_group_interactions_mirror_matrix_rows() {
    let creature = Creature::new(55);
    for group in creature.groups() {
        assert_eq!(group.interactions, creature.force_matrix().row(group.role));
    }
}

#[test]
fn test_field_hierarchy() {
    let creature = Creature::new(3);
    let fields = creature.fields();
    assert_eq!(fields.len(), 5);
    let core = ParticleRole::Core.index();
    let control = ParticleRole::Control.index();
    assert_eq!(fields[core].parent, None);
    assert_eq!(fields[control].parent, Some(core));
    for role in [ParticleRole::Movement, ParticleRole::Defense, ParticleRole::Attack] {
        let field = &fields[role.index()];
        assert_eq!(field.parent, Some(control));
        assert_eq!(field.center, fields[control].center + field.offset);
    }
    for field in fields {
        assert!(field.inner_radius > 0.0);
        assert!(field.inner_radius < field.bounding_radius);
    }
}
