use super::role::ParticleRole;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A single simulated point mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Monotonic id, unique within a creature.
    pub id: u64,
    pub role: ParticleRole,
    pub group_id: usize,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Acceleration applied during the last step.
    pub acceleration: DVec3,
    pub mass: f64,
    pub scale: f64,
    /// Age in fixed steps.
    pub age: u64,
    pub active: bool,
}

impl Particle {
    pub fn new(id: u64, role: ParticleRole, group_id: usize, position: DVec3) -> Self {
        Self {
            id,
            role,
            group_id,
            position,
            velocity: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            mass: 1.0,
            scale: 1.0,
            age: 0,
            active: true,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}
