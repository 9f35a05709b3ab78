use nonceling_core::creature::Creature;

/// Creature for `seed` after `steps` fixed steps.
#[allow(dead_code)]
pub fn stepped(seed: u32, steps: u64) -> Creature {
    let mut creature = Creature::new(seed);
    for _ in 0..steps {
        creature.step();
    }
    creature
}

/// Largest distance of any particle from its field's center, relative to
/// that field's bounding radius.
#[allow(dead_code)]
pub fn worst_excursion(creature: &Creature) -> f64 {
    creature
        .particles()
        .iter()
        .filter_map(|p| {
            let group = creature.groups().get(p.group_id)?;
            let field = creature.fields().get(group.field)?;
            Some(p.position.distance(field.center) / field.bounding_radius)
        })
        .fold(0.0, f64::max)
}
