//! Confirmation milestones and the mutations they trigger.
//!
//! Each configured milestone is consumed exactly once, the first time the
//! reported confirmation count reaches its threshold. Consuming a milestone
//! rolls against its probability; on success a [`Mutation`] record is queued
//! and then applied to the creature. All draws come from the `mutation`
//! purpose stream, and every input to a roll is fixed by the milestone itself,
//! so the outcome does not depend on how the confirmation updates were batched.

use crate::config::{MilestoneConfig, MutationConfig};
use crate::error::{CoreError, Result};
use crate::field::{sample_in_ball, ForceFieldSystem};
use crate::rng::SeededRng;
use crate::traits::{roll_rarity, TraitCatalog};
use nonceling_data::{
    ForceRuleMatrix, Mutation, MutationType, Particle, ParticleGroup, ParticleRole, Rarity,
    TraitCategory,
};

/// Effect multiplier of a mutation tier.
pub fn rarity_multiplier(rarity: Rarity) -> f64 {
    match rarity {
        Rarity::Common => 1.0,
        Rarity::Uncommon => 1.25,
        Rarity::Rare => 1.5,
        Rarity::Epic => 2.0,
        Rarity::Legendary => 3.0,
        Rarity::Mythic => 4.0,
    }
}

/// Largest number of groups one mutation of this tier can touch.
pub fn max_affected_groups(rarity: Rarity) -> usize {
    match rarity {
        Rarity::Common => 1,
        Rarity::Uncommon | Rarity::Rare => 2,
        Rarity::Epic => 3,
        Rarity::Legendary => 4,
        Rarity::Mythic => 5,
    }
}

/// Creature state a mutation may change.
pub struct MutationTarget<'a> {
    pub groups: &'a mut Vec<ParticleGroup>,
    pub particles: &'a mut Vec<Particle>,
    pub matrix: &'a mut ForceRuleMatrix,
    pub fields: &'a ForceFieldSystem,
    pub catalog: &'a TraitCatalog,
    /// Id handed to the next particle created.
    pub next_particle_id: &'a mut u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationEngine {
    config: MutationConfig,
    seed: u32,
    confirmations: u64,
    /// Index of the first milestone not yet consumed.
    next_milestone: usize,
    pending: Vec<Mutation>,
    history: Vec<Mutation>,
    issued: u64,
}

impl MutationEngine {
    pub fn new(seed: u32, config: &MutationConfig) -> Self {
        Self {
            config: config.clone(),
            seed,
            confirmations: 0,
            next_milestone: 0,
            pending: Vec::new(),
            history: Vec::new(),
            issued: 0,
        }
    }

    /// Highest confirmation count seen so far.
    pub fn confirmations(&self) -> u64 {
        self.confirmations
    }

    pub fn history(&self) -> &[Mutation] {
        &self.history
    }

    pub fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    /// Milestones already consumed, in threshold order.
    pub fn consumed_milestones(&self) -> &[MilestoneConfig] {
        &self.config.milestones[..self.next_milestone]
    }

    /// Consumes the next milestone crossed by `confirmations`, if any.
    ///
    /// Returns `false` once every milestone at or below `confirmations` has
    /// been consumed. A successful roll leaves one mutation in the pending queue.
    pub fn check_milestones(
        &mut self,
        confirmations: u64,
        groups: &[ParticleGroup],
        rng: &mut SeededRng,
    ) -> bool {
        let Some(milestone) = self.config.milestones.get(self.next_milestone).cloned() else {
            return false;
        };
        if milestone.threshold > confirmations {
            return false;
        }
        self.next_milestone += 1;

        match self.roll(&milestone, confirmations, groups, rng) {
            Some(mutation) => {
                tracing::info!(
                    id = %mutation.id,
                    milestone = %milestone.name,
                    mutation_type = %mutation.mutation_type,
                    rarity = %mutation.rarity,
                    groups = ?mutation.affected_groups,
                    "Mutation triggered"
                );
                self.pending.push(mutation);
            }
            None => {
                tracing::info!(milestone = %milestone.name, "Milestone passed without mutation");
            }
        }
        true
    }

    fn roll(
        &mut self,
        milestone: &MilestoneConfig,
        confirmations: u64,
        groups: &[ParticleGroup],
        rng: &mut SeededRng,
    ) -> Option<Mutation> {
        if rng.next_f64() >= milestone.probability {
            return None;
        }
        let rarity = roll_rarity(rng, &milestone.rarities);

        let types: Vec<MutationType> = milestone
            .types
            .iter()
            .copied()
            .filter(|t| self.config.type_weights.get(*t) > 0.0)
            .collect();
        let type_weights: Vec<f64> = types
            .iter()
            .map(|t| self.config.type_weights.get(*t))
            .collect();
        let mutation_type = types[rng.weighted_index(&type_weights)?];

        let cap = max_affected_groups(rarity).min(groups.len());
        if cap == 0 {
            return None;
        }
        let wanted = 1 + rng.index(cap);

        // Weights grow with the milestone's threshold, never with the live count.
        let growth = milestone.threshold as f64 / 100_000.0;
        let mut pool: Vec<(usize, f64)> = groups
            .iter()
            .map(|g| {
                let base = self.config.group_weights.get(g.role).get(mutation_type);
                let w = base * (1.0 + growth * self.config.role_growth.get(g.role));
                (g.id, w)
            })
            .collect();
        let mut affected = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            let weights: Vec<f64> = pool.iter().map(|(_, w)| *w).collect();
            let Some(k) = rng.weighted_index(&weights) else {
                break;
            };
            affected.push(pool.remove(k).0);
        }
        if affected.is_empty() {
            return None;
        }

        let id = format!(
            "{:08x}-{}-{}",
            self.seed,
            milestone.name.to_lowercase(),
            self.issued
        );
        self.issued += 1;
        Some(Mutation {
            id,
            confirmations,
            milestone: milestone.name.clone(),
            mutation_type,
            rarity,
            affected_groups: affected,
            applied: false,
        })
    }

    /// Applies and drains the pending queue, returning the applied records.
    ///
    /// Effects that cannot take place (growth cap reached, group too small to
    /// split) are skipped with a log line; the mutation still counts as applied.
    pub fn apply_pending_mutations(
        &mut self,
        target: &mut MutationTarget<'_>,
        rng: &mut SeededRng,
        root: &mut SeededRng,
    ) -> Result<Vec<Mutation>> {
        let pending = std::mem::take(&mut self.pending);
        let mut applied = Vec::with_capacity(pending.len());
        for mut mutation in pending {
            for &group_id in &mutation.affected_groups {
                self.apply_effect(&mutation, group_id, target, rng, root)?;
            }
            mutation.applied = true;
            self.history.push(mutation.clone());
            applied.push(mutation);
        }
        Ok(applied)
    }

    /// Consumes every milestone crossed by `confirmations` in ascending order.
    ///
    /// Each milestone's mutation is applied before the next milestone is
    /// rolled. Counts lower than one already seen are ignored.
    pub fn on_confirmations_updated(
        &mut self,
        confirmations: u64,
        target: &mut MutationTarget<'_>,
        rng: &mut SeededRng,
        root: &mut SeededRng,
    ) -> Result<Vec<Mutation>> {
        if confirmations < self.confirmations {
            tracing::debug!(
                reported = confirmations,
                seen = self.confirmations,
                "Ignoring stale confirmation count"
            );
            return Ok(Vec::new());
        }
        self.confirmations = confirmations;

        let mut applied = Vec::new();
        while self.check_milestones(confirmations, target.groups, rng) {
            applied.extend(self.apply_pending_mutations(target, rng, root)?);
        }
        Ok(applied)
    }

    fn apply_effect(
        &self,
        mutation: &Mutation,
        group_id: usize,
        target: &mut MutationTarget<'_>,
        rng: &mut SeededRng,
        root: &mut SeededRng,
    ) -> Result<()> {
        let idx = target
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or(CoreError::UnknownGroup(group_id))?;
        let mult = rarity_multiplier(mutation.rarity);

        match mutation.mutation_type {
            MutationType::AttributeBoost => self.boost(idx, mult, target, rng),
            MutationType::TypeChange => {
                let category = TraitCategory::ALL[rng.index(TraitCategory::ALL.len())];
                let group = &mut target.groups[idx];
                target
                    .catalog
                    .draw_into(group, category, mutation.rarity, rng)?;
                group.rarity = group.rarity.max(mutation.rarity);
                tracing::debug!(group = group_id, %category, "Trait redrawn");
                Ok(())
            }
            MutationType::CountIncrease => self.grow(idx, mult, target, rng),
            MutationType::GroupSplit => self.split(idx, mult, target, root),
        }
    }

    fn boost(
        &self,
        idx: usize,
        mult: f64,
        target: &mut MutationTarget<'_>,
        rng: &mut SeededRng,
    ) -> Result<()> {
        let hue_sign = if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
        let scale_sign = if rng.next_f64() < 0.5 { -1.0 } else { 1.0 };
        let other = ParticleRole::ALL[rng.index(ParticleRole::COUNT)];
        let nudge = rng.signed_unit() * self.config.matrix_nudge;

        let group = &mut target.groups[idx];
        let (group_id, role) = (group.id, group.role);
        group.color = group
            .color
            .hue_shifted(hue_sign * self.config.hue_shift_degrees * mult);
        group.scale = (group.scale * (1.0 + scale_sign * 0.1 * mult)).clamp(0.25, 4.0);
        let scale = group.scale;
        for p in target.particles.iter_mut().filter(|p| p.group_id == group_id) {
            p.scale = scale;
            p.mass = scale;
        }

        let current = target.matrix.get(role, other);
        let stored = target.matrix.set(role, other, current + nudge);
        let row = target.matrix.row(role);
        for g in target.groups.iter_mut().filter(|g| g.role == role) {
            g.interactions = row;
        }
        tracing::debug!(
            group = group_id,
            %other,
            from = current,
            to = stored,
            scale,
            "Attributes boosted"
        );
        Ok(())
    }

    fn grow(
        &self,
        idx: usize,
        mult: f64,
        target: &mut MutationTarget<'_>,
        rng: &mut SeededRng,
    ) -> Result<()> {
        let group = &target.groups[idx];
        let cap = (group.birth_count as f64 * self.config.max_growth_fraction).floor() as usize;
        let allowed = cap.saturating_sub(group.grown);
        let wanted = (group.count as f64 * 0.1 * mult).ceil() as usize;
        let added = wanted.min(allowed);
        if added == 0 {
            tracing::debug!(group = group.id, "Growth cap reached; count increase skipped");
            return Ok(());
        }

        let field = target
            .fields
            .get(group.field)
            .ok_or(CoreError::UnknownGroup(group.id))?;
        let (group_id, role, scale) = (group.id, group.role, group.scale);
        let spawn_radius = 0.5 * field.inner_radius;
        for _ in 0..added {
            let position = sample_in_ball(rng, field.center, spawn_radius);
            let mut p = Particle::new(*target.next_particle_id, role, group_id, position);
            p.scale = scale;
            p.mass = scale;
            target.particles.push(p);
            *target.next_particle_id += 1;
        }

        let group = &mut target.groups[idx];
        group.count += added;
        group.grown += added;
        tracing::debug!(group = group_id, added, count = group.count, "Group grew");
        Ok(())
    }

    fn split(
        &self,
        idx: usize,
        mult: f64,
        target: &mut MutationTarget<'_>,
        root: &mut SeededRng,
    ) -> Result<()> {
        let group = &target.groups[idx];
        if target.groups.len() >= self.config.max_groups
            || group.count < 2 * self.config.min_split_size
        {
            tracing::debug!(
                group = group.id,
                count = group.count,
                groups = target.groups.len(),
                "Group split skipped"
            );
            return Ok(());
        }

        let new_id = target.groups.len();
        let mut sub = root
            .sub_stream(new_id as u64, group.role.name())
            .ok_or_else(|| {
                CoreError::InvalidConfig(format!("rehash entry {new_id} was already evicted"))
            })?;
        let hue_sign = if sub.next_f64() < 0.5 { -1.0 } else { 1.0 };

        let old_id = group.id;
        let mut members: Vec<usize> = target
            .particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.group_id == old_id)
            .map(|(i, _)| i)
            .collect();
        members.sort_by_key(|&i| target.particles[i].id);
        let moved = members.split_off(members.len() / 2);
        for &i in &moved {
            target.particles[i].group_id = new_id;
        }

        let mut child = group.clone();
        child.id = new_id;
        child.count = moved.len();
        child.birth_count = moved.len();
        child.grown = 0;
        child.color = child
            .color
            .hue_shifted(hue_sign * self.config.hue_shift_degrees * mult);

        let parent = &mut target.groups[idx];
        parent.count -= moved.len();
        tracing::debug!(
            group = old_id,
            new_group = new_id,
            moved = moved.len(),
            "Group split"
        );
        target.groups.push(child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, TypeWeights};
    use nonceling_data::DVec3;

    struct Fixture {
        groups: Vec<ParticleGroup>,
        particles: Vec<Particle>,
        matrix: ForceRuleMatrix,
        fields: ForceFieldSystem,
        catalog: TraitCatalog,
        next_id: u64,
    }

    impl Fixture {
        fn new(per_group: usize) -> Self {
            let groups: Vec<ParticleGroup> = ParticleRole::ALL
                .iter()
                .enumerate()
                .map(|(i, r)| ParticleGroup::new(i, *r, per_group))
                .collect();
            let mut particles = Vec::new();
            let mut next_id = 0;
            for g in &groups {
                for _ in 0..per_group {
                    particles.push(Particle::new(next_id, g.role, g.id, DVec3::ZERO));
                    next_id += 1;
                }
            }
            Self {
                groups,
                particles,
                matrix: ForceRuleMatrix::default(),
                fields: ForceFieldSystem::build(&FieldConfig::default(), &mut SeededRng::new(1))
                    .expect("valid fields"),
                catalog: TraitCatalog::default(),
                next_id,
            }
        }

        fn target(&mut self) -> MutationTarget<'_> {
            MutationTarget {
                groups: &mut self.groups,
                particles: &mut self.particles,
                matrix: &mut self.matrix,
                fields: &self.fields,
                catalog: &self.catalog,
                next_particle_id: &mut self.next_id,
            }
        }
    }

    fn only(t: MutationType) -> MutationConfig {
        let mut config = MutationConfig::default();
        for ms in &mut config.milestones {
            ms.probability = 1.0;
            ms.types = vec![t];
        }
        config
    }

    #[test]
    fn test_milestones_consumed_once() {
        let mut fx = Fixture::new(40);
        let mut engine = MutationEngine::new(7, &MutationConfig::default());
        let mut rng = SeededRng::new(1);
        let mut root = SeededRng::new(7);

        engine
            .on_confirmations_updated(100_000, &mut fx.target(), &mut rng, &mut root)
            .expect("mutations apply");
        let after_first = engine.history().len();
        assert_eq!(engine.consumed_milestones().len(), 4);

        let again = engine
            .on_confirmations_updated(100_000, &mut fx.target(), &mut rng, &mut root)
            .expect("mutations apply");
        assert!(again.is_empty());
        assert_eq!(engine.history().len(), after_first);
    }

    #[test]
    fn test_stale_count_is_ignored() {
        let mut fx = Fixture::new(40);
        let mut engine = MutationEngine::new(7, &MutationConfig::default());
        let mut rng = SeededRng::new(1);
        let mut root = SeededRng::new(7);
        engine
            .on_confirmations_updated(30_000, &mut fx.target(), &mut rng, &mut root)
            .expect("mutations apply");
        engine
            .on_confirmations_updated(5, &mut fx.target(), &mut rng, &mut root)
            .expect("mutations apply");
        assert_eq!(engine.confirmations(), 30_000);
        assert_eq!(engine.consumed_milestones().len(), 2);
    }

    #[test]
    fn test_batching_does_not_change_outcome() {
        let config = only(MutationType::GroupSplit);
        let run = |steps: &[u64]| {
            let mut fx = Fixture::new(60);
            let mut engine = MutationEngine::new(3, &config);
            let mut rng = SeededRng::new(11);
            let mut root = SeededRng::new(3);
            for &c in steps {
                engine
                    .on_confirmations_updated(c, &mut fx.target(), &mut rng, &mut root)
                    .expect("mutations apply");
            }
            (engine.history().to_vec(), fx.groups, fx.particles)
        };
        let (h1, g1, p1) = run(&[600_000]);
        let (h2, g2, p2) = run(&[10_000, 49_999, 120_000, 600_000]);
        let ids = |h: &[Mutation]| h.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&h1), ids(&h2));
        assert_eq!(g1, g2);
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_mutation_ids_are_stable_and_unique() {
        let mut fx = Fixture::new(40);
        let mut engine = MutationEngine::new(0xAB, &only(MutationType::AttributeBoost));
        let applied = engine
            .on_confirmations_updated(
                1_000_000,
                &mut fx.target(),
                &mut SeededRng::new(2),
                &mut SeededRng::new(0xAB),
            )
            .expect("mutations apply");
        assert_eq!(applied.len(), 6);
        assert_eq!(applied[0].id, "000000ab-awakening-0");
        assert_eq!(applied[5].id, "000000ab-apotheosis-5");
        assert!(applied.iter().all(|m| m.applied));
        assert!(applied
            .iter()
            .all(|m| (1..=max_affected_groups(m.rarity)).contains(&m.affected_groups.len())));
    }

    #[test]
    fn test_count_increase_respects_cap() {
        let mut fx = Fixture::new(40);
        let mut engine = MutationEngine::new(1, &only(MutationType::CountIncrease));
        engine
            .on_confirmations_updated(
                1_000_000,
                &mut fx.target(),
                &mut SeededRng::new(5),
                &mut SeededRng::new(1),
            )
            .expect("mutations apply");
        for g in &fx.groups {
            assert!(g.grown <= 20, "group {} grew by {}", g.id, g.grown);
            let live = fx.particles.iter().filter(|p| p.group_id == g.id).count();
            assert_eq!(live, g.count);
        }
        let mut ids: Vec<u64> = fx.particles.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), fx.particles.len());
        assert_eq!(fx.next_id, fx.particles.len() as u64);
    }

    #[test]
    fn test_split_moves_upper_half_by_id() {
        let mut fx = Fixture::new(40);
        let engine = MutationEngine::new(1, &MutationConfig::default());
        let mut root = SeededRng::new(1);
        engine
            .split(4, 1.0, &mut fx.target(), &mut root)
            .expect("split applies");
        assert_eq!(fx.groups.len(), 6);
        assert_eq!(fx.groups[4].count, 20);
        assert_eq!(fx.groups[5].count, 20);
        assert_eq!(fx.groups[5].role, ParticleRole::Attack);
        let moved: Vec<u64> = fx
            .particles
            .iter()
            .filter(|p| p.group_id == 5)
            .map(|p| p.id)
            .collect();
        assert_eq!(moved, (180..200).collect::<Vec<u64>>());
    }

    #[test]
    fn test_split_skipped_when_too_small() {
        let mut fx = Fixture::new(15);
        let engine = MutationEngine::new(1, &MutationConfig::default());
        engine
            .split(0, 1.0, &mut fx.target(), &mut SeededRng::new(1))
            .expect("skip is not an error");
        assert_eq!(fx.groups.len(), 5);
    }

    #[test]
    fn test_boost_keeps_matrix_in_range_and_syncs_interactions() {
        let mut fx = Fixture::new(10);
        fx.matrix = ForceRuleMatrix::from_values([[0.99; 5]; 5]);
        let engine = MutationEngine::new(1, &MutationConfig::default());
        let mut rng = SeededRng::new(21);
        for _ in 0..50 {
            engine
                .boost(2, 4.0, &mut fx.target(), &mut rng)
                .expect("boost applies");
        }
        assert!(fx.matrix.values().iter().flatten().all(|v| (-1.0..=1.0).contains(v)));
        assert_eq!(fx.groups[2].interactions, fx.matrix.row(ParticleRole::Movement));
        assert!((0.25..=4.0).contains(&fx.groups[2].scale));
        assert!(fx
            .particles
            .iter()
            .filter(|p| p.group_id == 2)
            .all(|p| p.scale == fx.groups[2].scale));
    }

    #[test]
    fn test_zero_weight_types_are_never_picked() {
        let mut config = MutationConfig::default();
        config.type_weights = TypeWeights {
            attribute_boost: 0.0,
            type_change: 1.0,
            count_increase: 0.0,
            group_split: 0.0,
        };
        for ms in &mut config.milestones {
            ms.probability = 1.0;
            ms.types = MutationType::ALL.to_vec();
        }
        let mut fx = Fixture::new(40);
        let mut engine = MutationEngine::new(9, &config);
        let applied = engine
            .on_confirmations_updated(
                1_000_000,
                &mut fx.target(),
                &mut SeededRng::new(3),
                &mut SeededRng::new(9),
            )
            .expect("mutations apply");
        assert!(applied
            .iter()
            .all(|m| m.mutation_type == MutationType::TypeChange));
    }
}
