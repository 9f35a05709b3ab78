//! Pairwise role-to-role forces.
//!
//! A positive matrix entry `m[a][b]` pushes a particle of role `a` away from a
//! particle of role `b`; a negative entry pulls it closer. The magnitude falls
//! off with the inverse of the (clamped) distance and vanishes beyond the
//! interaction cutoff.

use crate::config::PhysicsConfig;
use crate::rng::SeededRng;
use crate::spatial_hash::SpatialHash;
use nonceling_data::{DVec3, ForceRuleMatrix, Particle, ParticleRole};
use rayon::prelude::*;

/// Fixed per-role force scaling.
pub fn role_modifier(role: ParticleRole) -> f64 {
    match role {
        ParticleRole::Core => 1.5,
        ParticleRole::Control => 1.2,
        ParticleRole::Attack => 1.0,
        ParticleRole::Defense => 0.8,
        ParticleRole::Movement => 0.6,
    }
}

/// Draws a full 5x5 matrix in row-major role order, one draw per entry.
///
/// Entries are independent, so the result is almost never symmetric.
pub fn generate_matrix(rng: &mut SeededRng) -> ForceRuleMatrix {
    let mut values = [[0.0; ParticleRole::COUNT]; ParticleRole::COUNT];
    for row in values.iter_mut() {
        for cell in row.iter_mut() {
            *cell = rng.signed_unit();
        }
    }
    ForceRuleMatrix::from_values(values)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceModel {
    pub cutoff: f64,
    pub min_distance: f64,
}

impl ForceModel {
    pub fn new(cutoff: f64, min_distance: f64) -> Self {
        Self {
            cutoff,
            min_distance,
        }
    }

    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.interaction_cutoff, config.min_distance)
    }

    /// Force exerted on `a` by `b`.
    ///
    /// Zero for the same particle, for inactive particles and beyond the
    /// cutoff. Coincident particles exert no force on each other; the
    /// collision pass separates them.
    #[inline]
    pub fn compute_force(&self, a: &Particle, b: &Particle, matrix: &ForceRuleMatrix) -> DVec3 {
        if a.id == b.id || !a.active || !b.active {
            return DVec3::ZERO;
        }
        let delta = a.position - b.position;
        let dist_sq = delta.length_squared();
        if dist_sq.is_nan() || dist_sq > self.cutoff * self.cutoff {
            return DVec3::ZERO;
        }
        let dist = dist_sq.sqrt();
        if dist == 0.0 {
            return DVec3::ZERO;
        }
        let magnitude =
            matrix.get(a.role, b.role) * role_modifier(a.role) / dist.max(self.min_distance);
        delta / dist * magnitude
    }

    /// Net force on particle `i` from an ascending list of candidate indices.
    #[inline]
    fn sum_over(
        &self,
        i: usize,
        candidates: impl Iterator<Item = usize>,
        particles: &[Particle],
        matrix: &ForceRuleMatrix,
    ) -> DVec3 {
        let a = &particles[i];
        candidates.fold(DVec3::ZERO, |acc, j| {
            acc + self.compute_force(a, &particles[j], matrix)
        })
    }

    /// O(n²) reference accumulation over every ordered pair.
    pub fn accumulate_naive(&self, particles: &[Particle], matrix: &ForceRuleMatrix) -> Vec<DVec3> {
        (0..particles.len())
            .map(|i| self.sum_over(i, 0..particles.len(), particles, matrix))
            .collect()
    }

    /// Grid-accelerated accumulation.
    ///
    /// Produces the same forces as [`accumulate_naive`](Self::accumulate_naive):
    /// candidates are summed in ascending index order and every skipped pair
    /// lies beyond the cutoff. With `parallel` set, particles are processed on
    /// the Rayon pool while each particle's own sum stays sequential.
    pub fn accumulate_partitioned(
        &self,
        particles: &[Particle],
        matrix: &ForceRuleMatrix,
        grid: &mut SpatialHash,
        parallel: bool,
    ) -> Vec<DVec3> {
        let positions: Vec<DVec3> = particles.iter().map(|p| p.position).collect();
        grid.build_parallel(&positions);
        let grid = &*grid;

        if parallel {
            (0..particles.len())
                .into_par_iter()
                .map_init(Vec::new, |buf, i| {
                    grid.query_into(particles[i].position, self.cutoff, buf);
                    self.sum_over(i, buf.iter().copied(), particles, matrix)
                })
                .collect()
        } else {
            let mut buf = Vec::new();
            (0..particles.len())
                .map(|i| {
                    grid.query_into(particles[i].position, self.cutoff, &mut buf);
                    self.sum_over(i, buf.iter().copied(), particles, matrix)
                })
                .collect()
        }
    }
}
