use super::error::{DriverError, Result};
use nonceling_core::config::AppConfig;
use nonceling_core::creature::Creature;
use nonceling_core::metrics::Metrics;
use nonceling_core::traits::TraitCatalog;
use nonceling_data::{Formation, Mutation, ParticleRole, Rarity};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Headless host for one creature.
///
/// The driver owns the creature, feeds it frame time and confirmation counts,
/// and reports timings to [`Metrics`]. It never touches the simulation's
/// random streams, so stepping through a driver is bit-identical to stepping
/// the creature directly.
pub struct Driver {
    creature: Creature,
    metrics: Metrics,
}

/// Per-group line of a [`Summary`].
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: usize,
    pub role: ParticleRole,
    pub count: usize,
    pub rarity: Rarity,
    pub formation: Formation,
    pub color: String,
    pub scale: f64,
}

/// What the binary prints after a run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub seed: String,
    pub steps: u64,
    pub time: f64,
    pub confirmations: u64,
    pub particles: usize,
    /// Largest distance of any particle from the core field's center.
    pub extent: f64,
    pub groups: Vec<GroupSummary>,
    pub mutations: Vec<String>,
    pub config: String,
}

impl Driver {
    pub fn new(creature: Creature) -> Self {
        Self {
            creature,
            metrics: Metrics::new(),
        }
    }

    pub fn from_seed(seed: u32, config: AppConfig) -> Result<Self> {
        let creature = Creature::build(seed, config, Arc::new(TraitCatalog::default()))?;
        Ok(Self::new(creature))
    }

    /// Reads and validates a TOML configuration file.
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DriverError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        AppConfig::from_toml(&content).map_err(|e| DriverError::ConfigParse {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })
    }

    /// Rebuilds the creature stored at `path` and wraps it in a driver.
    pub fn restore<P: AsRef<Path>>(path: P, config: AppConfig) -> Result<Self> {
        let state = nonceling_io::load_state(path)?;
        let creature =
            nonceling_io::restore_with(&state, config, Arc::new(TraitCatalog::default()))?;
        Ok(Self::new(creature))
    }

    pub fn creature(&self) -> &Creature {
        &self.creature
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Feeds one frame of `frame_dt` wall-clock seconds through the fixed-step
    /// accumulator. Returns the number of fixed steps it ran.
    pub fn frame(&mut self, frame_dt: f64) -> usize {
        let start = Instant::now();
        let steps = self.creature.tick(frame_dt);
        self.record(steps as u64, start);
        steps
    }

    /// Runs exactly `steps` fixed steps.
    pub fn run_steps(&mut self, steps: u64) {
        let start = Instant::now();
        for _ in 0..steps {
            self.creature.step();
        }
        self.record(steps, start);
    }

    /// Reports a confirmation count and returns the mutations it applied.
    pub fn confirm(&mut self, confirmations: u64) -> Result<Vec<Mutation>> {
        let applied = self.creature.try_on_confirmations_updated(confirmations)?;
        self.metrics.record_mutations(applied.len());
        for m in &applied {
            self.metrics.increment_counter(&format!("mutation.{}", m.mutation_type));
            self.metrics.log_event(
                "mutation",
                &format!(
                    "{} {} {} groups {:?}",
                    m.id, m.rarity, m.mutation_type, m.affected_groups
                ),
            );
        }
        Ok(applied)
    }

    /// Runs `steps` fixed steps with the confirmation updates spread evenly
    /// between them, in the order given.
    pub fn run_schedule(&mut self, steps: u64, confirmations: &[u64]) -> Result<Vec<Mutation>> {
        let mut applied = Vec::new();
        let segments = confirmations.len() as u64 + 1;
        let mut done = 0;
        for (k, &c) in confirmations.iter().enumerate() {
            let until = steps * (k as u64 + 1) / segments;
            self.run_steps(until - done);
            done = until;
            applied.extend(self.confirm(c)?);
        }
        self.run_steps(steps - done);
        Ok(applied)
    }

    /// Writes the creature's persisted state; the format follows the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        nonceling_io::save_state(&self.creature.snapshot(), path)?;
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        let c = &self.creature;
        let center = c.fields().first().map(|f| f.center).unwrap_or_default();
        let extent = c
            .particles()
            .iter()
            .map(|p| p.position.distance(center))
            .fold(0.0, f64::max);
        Summary {
            seed: format!("{:#010x}", c.seed()),
            steps: c.steps(),
            time: c.time(),
            confirmations: c.confirmations(),
            particles: c.particles().len(),
            extent,
            groups: c
                .groups()
                .iter()
                .map(|g| GroupSummary {
                    id: g.id,
                    role: g.role,
                    count: g.count,
                    rarity: g.rarity,
                    formation: g.formation,
                    color: g.color.to_hex(),
                    scale: g.scale,
                })
                .collect(),
            mutations: c.mutation_history().iter().map(|m| m.id.clone()).collect(),
            config: c.config().fingerprint(),
        }
    }

    fn record(&self, steps: u64, start: Instant) {
        let c = &self.creature;
        self.metrics
            .record_steps(steps, start.elapsed(), c.particles().len(), c.groups().len());
    }
}
