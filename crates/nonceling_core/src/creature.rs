//! The creature: one seed, five particle groups, their fields and their history.
//!
//! Birth consumes the random streams in a fixed order (population weights,
//! traits, interaction matrix and field spin, then per-group positions) so
//! two creatures built from the same seed and configuration are identical,
//! and stay identical through any sequence of steps and confirmation updates.

use crate::config::{AppConfig, PopulationConfig};
use crate::error::{CoreError, Result};
use crate::field::{sample_in_ball, ForceFieldSystem};
use crate::force::generate_matrix;
use crate::mutation::{MutationEngine, MutationTarget};
use crate::physics::{FixedTimestep, PhysicsIntegrator, StepContext};
use crate::rng::{RehashChain, SeededRng};
use crate::traits::{assign_traits, TraitCatalog};
use nonceling_data::{
    ForceField, ForceRuleMatrix, Mutation, MutationCheckpoint, Particle, ParticleGroup,
    ParticleRole, PersistedState,
};
use std::sync::Arc;

/// Fraction of a field's inner radius that newborn particles spawn within.
const SPAWN_FRACTION: f64 = 0.6;

/// Splits `config.total` particles across the five roles.
///
/// Every role gets the baseline; the rest is shared by weights drawn from
/// `rng` (one draw per role). Leftovers from rounding go to the largest
/// fractional parts, ties to the earlier role, so the counts always sum to
/// exactly `config.total`.
pub fn distribute_population(
    rng: &mut SeededRng,
    config: &PopulationConfig,
) -> [usize; ParticleRole::COUNT] {
    let weights: [f64; ParticleRole::COUNT] =
        std::array::from_fn(|_| rng.range(config.weight_min, config.weight_max));
    let sum: f64 = weights.iter().sum();
    let extra = config
        .total
        .saturating_sub(config.baseline_per_role * ParticleRole::COUNT);

    let exact: [f64; ParticleRole::COUNT] =
        std::array::from_fn(|i| extra as f64 * weights[i] / sum);
    let mut counts: [usize; ParticleRole::COUNT] =
        std::array::from_fn(|i| exact[i].floor() as usize);
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..ParticleRole::COUNT).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa)
    });
    for &i in order.iter().take(extra.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    for c in &mut counts {
        *c += config.baseline_per_role;
    }
    counts
}

#[derive(Debug, Clone)]
pub struct Creature {
    seed: u32,
    config: AppConfig,
    catalog: Arc<TraitCatalog>,
    rng: SeededRng,
    particles: Vec<Particle>,
    groups: Vec<ParticleGroup>,
    matrix: ForceRuleMatrix,
    fields: ForceFieldSystem,
    integrator: PhysicsIntegrator,
    clock: FixedTimestep,
    mutations: MutationEngine,
    checkpoints: Vec<MutationCheckpoint>,
    next_particle_id: u64,
    time: f64,
    steps: u64,
}

impl Creature {
    /// Creature for `seed` with the default configuration and trait catalog.
    ///
    /// # Panics
    ///
    /// Panics if the built-in configuration cannot produce a creature, which
    /// means the defaults themselves are broken.
    pub fn new(seed: u32) -> Self {
        Self::build(seed, AppConfig::default(), Arc::new(TraitCatalog::default()))
            .unwrap_or_else(|e| panic!("creature {seed:#010x} cannot be born: {e}"))
    }

    pub fn with_config(seed: u32, config: AppConfig) -> Result<Self> {
        Self::build(seed, config, Arc::new(TraitCatalog::default()))
    }

    /// Builds the creature for `seed`, failing on invalid configuration or catalog.
    pub fn build(seed: u32, config: AppConfig, catalog: Arc<TraitCatalog>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CoreError::invalid_config(&e))?;
        catalog.validate()?;

        let mut rng = SeededRng::with_rehash(
            seed,
            config.rng.rehash_interval,
            config.rng.rehash_capacity,
        );

        let counts = distribute_population(rng.purpose_stream("population"), &config.population);
        let mut groups: Vec<ParticleGroup> = ParticleRole::ALL
            .iter()
            .zip(counts)
            .enumerate()
            .map(|(i, (role, count))| ParticleGroup::new(i, *role, count))
            .collect();

        assign_traits(&mut groups, &catalog, rng.purpose_stream("traits"))?;

        let physics_rng = rng.purpose_stream("physics");
        let matrix = generate_matrix(physics_rng);
        let fields = ForceFieldSystem::build(&config.fields, physics_rng)?;
        for group in &mut groups {
            group.interactions = matrix.row(group.role);
        }

        let mut particles = Vec::with_capacity(config.population.total);
        let mut next_particle_id = 0u64;
        for group in &groups {
            let field = fields
                .get(group.field)
                .ok_or(CoreError::UnknownGroup(group.id))?;
            let mut sub = rng
                .sub_stream(group.id as u64, group.role.name())
                .ok_or_else(|| {
                    CoreError::InvalidConfig(format!(
                        "rehash entry {} was already evicted",
                        group.id
                    ))
                })?;
            let radius = SPAWN_FRACTION * field.inner_radius;
            for _ in 0..group.count {
                let position = sample_in_ball(&mut sub, field.center, radius);
                let mut p = Particle::new(next_particle_id, group.role, group.id, position);
                p.scale = group.scale;
                p.mass = group.scale;
                particles.push(p);
                next_particle_id += 1;
            }
        }

        tracing::info!(
            seed = %format!("{seed:#010x}"),
            particles = particles.len(),
            counts = ?counts,
            config = %config.fingerprint(),
            "Creature born"
        );

        Ok(Self {
            seed,
            integrator: PhysicsIntegrator::new(&config.physics),
            clock: FixedTimestep::new(
                config.physics.fixed_dt,
                config.physics.max_steps_per_update,
            ),
            mutations: MutationEngine::new(seed, &config.mutation),
            checkpoints: Vec::new(),
            config,
            catalog,
            rng,
            particles,
            groups,
            matrix,
            fields,
            next_particle_id,
            time: 0.0,
            steps: 0,
        })
    }

    /// Advances exactly one fixed step.
    pub fn step(&mut self) {
        let dt = self.config.physics.fixed_dt;
        self.fields.rotate_all(dt);
        self.time += dt;
        self.steps += 1;
        let ctx = StepContext {
            matrix: &self.matrix,
            fields: &self.fields,
            groups: &self.groups,
            time: self.time,
        };
        self.integrator.step(&mut self.particles, &ctx);
    }

    /// Feeds `frame_dt` seconds into the fixed-step accumulator and runs the
    /// steps it yields, at most `max_steps_per_update`. Returns the step count.
    pub fn tick(&mut self, frame_dt: f64) -> usize {
        let steps = self.clock.advance(frame_dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    /// Same as [`tick`](Self::tick).
    pub fn update(&mut self, frame_dt: f64) -> usize {
        self.tick(frame_dt)
    }

    /// Reports the current confirmation count and returns the mutations it applied.
    ///
    /// # Panics
    ///
    /// Panics if a mutation cannot be applied; see
    /// [`try_on_confirmations_updated`](Self::try_on_confirmations_updated).
    pub fn on_confirmations_updated(&mut self, confirmations: u64) -> Vec<Mutation> {
        self.try_on_confirmations_updated(confirmations)
            .unwrap_or_else(|e| panic!("mutation at {confirmations} confirmations failed: {e}"))
    }

    pub fn try_on_confirmations_updated(&mut self, confirmations: u64) -> Result<Vec<Mutation>> {
        let Self {
            rng,
            groups,
            particles,
            matrix,
            fields,
            catalog,
            next_particle_id,
            mutations,
            ..
        } = self;
        let mut target = MutationTarget {
            groups,
            particles,
            matrix,
            fields,
            catalog: &**catalog,
            next_particle_id,
        };
        let applied = rng.with_purpose_stream("mutation", |stream, root| {
            mutations.on_confirmations_updated(confirmations, &mut target, stream, root)
        })?;
        if !applied.is_empty() {
            self.checkpoints.push(MutationCheckpoint {
                step: self.steps,
                confirmations,
            });
            tracing::info!(
                confirmations,
                applied = applied.len(),
                particles = self.particles.len(),
                groups = self.groups.len(),
                "Mutations applied"
            );
        }
        Ok(applied)
    }

    /// Minimal state from which a replay from the seed reconstructs this creature.
    ///
    /// Replaying the checkpointed confirmation updates at their step counts,
    /// then the final count, then the remaining steps reproduces particles,
    /// groups and mutation history exactly.
    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            seed: self.seed,
            confirmations: self.mutations.confirmations(),
            rehash_chain: self.rng.chain().to_vec(),
            applied_mutation_ids: self.mutations.history().iter().map(|m| m.id.clone()).collect(),
            steps: self.steps,
            checkpoints: self.checkpoints.clone(),
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TraitCatalog {
        &self.catalog
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn groups(&self) -> &[ParticleGroup] {
        &self.groups
    }

    pub fn force_matrix(&self) -> &ForceRuleMatrix {
        &self.matrix
    }

    pub fn fields(&self) -> &[ForceField] {
        self.fields.fields()
    }

    pub fn field_system(&self) -> &ForceFieldSystem {
        &self.fields
    }

    pub fn mutation_history(&self) -> &[Mutation] {
        self.mutations.history()
    }

    pub fn mutation_engine(&self) -> &MutationEngine {
        &self.mutations
    }

    /// Confirmation updates that applied mutations, with the step they arrived at.
    pub fn checkpoints(&self) -> &[MutationCheckpoint] {
        &self.checkpoints
    }

    pub fn rehash_chain(&self) -> &RehashChain {
        self.rng.chain()
    }

    pub fn confirmations(&self) -> u64 {
        self.mutations.confirmations()
    }

    /// Simulated seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}
