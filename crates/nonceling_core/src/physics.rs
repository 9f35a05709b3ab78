//! Fixed-step particle integrator.
//!
//! One step gathers pairwise and field forces, integrates velocities and
//! positions with semi-implicit Euler, then resolves overlaps. Steps are
//! always `fixed_dt` long; [`FixedTimestep`] turns variable frame times into
//! a whole number of steps.

use crate::config::PhysicsConfig;
use crate::field::ForceFieldSystem;
use crate::force::ForceModel;
use crate::spatial_hash::SpatialHash;
use nonceling_data::{DVec3, ForceRuleMatrix, Particle, ParticleGroup};
use rayon::prelude::*;

/// Everything a step reads besides the particles themselves.
pub struct StepContext<'a> {
    pub matrix: &'a ForceRuleMatrix,
    pub fields: &'a ForceFieldSystem,
    /// Indexed by `Particle::group_id`.
    pub groups: &'a [ParticleGroup],
    /// Simulation time at the end of the step.
    pub time: f64,
}

/// Accumulates frame time and hands out fixed steps.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    dt: f64,
    max_steps: usize,
    accumulator: f64,
}

impl FixedTimestep {
    pub fn new(dt: f64, max_steps: usize) -> Self {
        Self {
            dt,
            max_steps,
            accumulator: 0.0,
        }
    }

    /// Adds `frame_dt` and returns how many fixed steps to run now.
    ///
    /// At most `max_steps` are returned; time beyond that is dropped so a
    /// long stall does not snowball into ever longer catch-up frames.
    pub fn advance(&mut self, frame_dt: f64) -> usize {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt;
        }
        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.dt {
            tracing::debug!(
                dropped = self.accumulator,
                "Frame time exceeded step budget"
            );
            self.accumulator = 0.0;
        }
        steps
    }

    /// Unconsumed time, always below one step after `advance`.
    pub fn remainder(&self) -> f64 {
        self.accumulator
    }
}

/// Deterministic unit vector for separating two coincident particles.
fn separation_axis(a: u64, b: u64) -> DVec3 {
    let mut h = a.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ b.wrapping_add(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 31;
    h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 29;
    let theta = (h & 0xFFFF) as f64 / 65_536.0 * std::f64::consts::TAU;
    let y = ((h >> 16) & 0xFFFF) as f64 / 65_536.0 * 2.0 - 1.0;
    let s = (1.0 - y * y).max(0.0).sqrt();
    DVec3::new(s * theta.cos(), y, s * theta.sin())
}

#[derive(Debug, Clone)]
pub struct PhysicsIntegrator {
    config: PhysicsConfig,
    model: ForceModel,
    grid: SpatialHash,
    neighbors: Vec<usize>,
}

impl PhysicsIntegrator {
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            config: config.clone(),
            model: ForceModel::from_config(config),
            grid: SpatialHash::new(config.interaction_cutoff),
            neighbors: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn force_model(&self) -> &ForceModel {
        &self.model
    }

    /// Net force on every particle: pairwise plus containment and formation.
    pub fn accumulate_forces(
        &mut self,
        particles: &[Particle],
        ctx: &StepContext<'_>,
    ) -> Vec<DVec3> {
        let mut forces = if self.config.spatial_partitioning {
            self.model.accumulate_partitioned(
                particles,
                ctx.matrix,
                &mut self.grid,
                self.config.parallel,
            )
        } else {
            self.model.accumulate_naive(particles, ctx.matrix)
        };

        let field_force = |p: &Particle| -> DVec3 {
            if !p.active {
                return DVec3::ZERO;
            }
            ctx.groups
                .get(p.group_id)
                .map_or(DVec3::ZERO, |g| ctx.fields.field_force(p, g, ctx.time))
        };
        if self.config.parallel {
            forces
                .par_iter_mut()
                .zip(particles.par_iter())
                .for_each(|(f, p)| *f += field_force(p));
        } else {
            for (f, p) in forces.iter_mut().zip(particles) {
                *f += field_force(p);
            }
        }
        forces
    }

    /// Runs one fixed step.
    pub fn step(&mut self, particles: &mut [Particle], ctx: &StepContext<'_>) {
        let forces = self.accumulate_forces(particles, ctx);
        let damping = 1.0 - self.config.viscosity;
        let dt = self.config.fixed_dt;
        let time_scale = self.config.time_scale;
        let max_speed = self.config.max_speed;

        for (p, force) in particles.iter_mut().zip(forces) {
            if !p.active {
                continue;
            }
            let mass = if p.mass > 0.0 { p.mass } else { 1.0 };
            p.acceleration = force / mass;
            p.velocity = (p.velocity * damping + p.acceleration * time_scale)
                .clamp_length_max(max_speed);
            p.position += p.velocity * dt;
            p.age += 1;
        }

        self.resolve_collisions(particles);
    }

    /// Pushes overlapping pairs apart, weighted by mass.
    ///
    /// Pairs are visited in ascending `(i, j)` order and each correction is
    /// applied immediately, so later pairs see earlier corrections.
    ///
    /// Candidates come from a grid built over the pre-correction positions
    /// and queried at 1.5 times the contact distance. A pair pushed into
    /// contact from farther than that margin by this pass is left for the
    /// next step, as is a pair reopened after it was visited.
    pub fn resolve_collisions(&mut self, particles: &mut [Particle]) {
        let radius = self.config.collision_radius;
        if radius <= 0.0 || particles.len() < 2 {
            return;
        }
        let contact = 2.0 * radius;
        let positions: Vec<DVec3> = particles.iter().map(|p| p.position).collect();
        self.grid.build_parallel(&positions);

        let mut neighbors = std::mem::take(&mut self.neighbors);
        for i in 0..particles.len() {
            if !particles[i].active {
                continue;
            }
            // Wider than contact so candidates survive earlier corrections
            self.grid
                .query_into(particles[i].position, contact * 1.5, &mut neighbors);
            for &j in neighbors.iter().filter(|&&j| j > i) {
                let (a, b) = (&particles[i], &particles[j]);
                if !b.active {
                    continue;
                }
                let delta = a.position - b.position;
                let dist = delta.length();
                if dist.is_nan() || dist >= contact {
                    continue;
                }
                let axis = if dist > 1e-9 {
                    delta / dist
                } else {
                    separation_axis(a.id, b.id)
                };
                let (ma, mb) = (a.mass.max(f64::EPSILON), b.mass.max(f64::EPSILON));
                let overlap = contact - dist;
                let share_a = mb / (ma + mb);
                let share_b = ma / (ma + mb);
                particles[i].position += axis * (overlap * share_a);
                particles[j].position -= axis * (overlap * share_b);
            }
        }
        self.neighbors = neighbors;
    }
}
