use super::role::ParticleRole;
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Rotating convex polytope that contains one role's particles.
///
/// `vertices` is always `base_vertices` rotated about `center` by the
/// accumulated `rotation` angles; `base_vertices` never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceField {
    pub id: usize,
    pub role: ParticleRole,
    pub center: DVec3,
    /// Offset from the parent field's center.
    pub offset: DVec3,
    pub vertices: Vec<DVec3>,
    pub base_vertices: Vec<DVec3>,
    /// Radius of the bounding sphere around `center`.
    pub bounding_radius: f64,
    /// Radius of the largest sphere inside the polytope.
    pub inner_radius: f64,
    /// Accumulated rotation angles (radians) about X, Y and Z.
    pub rotation: DVec3,
    /// Angular speed per axis in radians per second.
    pub rotation_speed: Option<DVec3>,
    pub strength: f64,
    /// Index of the parent field in the owning field list.
    pub parent: Option<usize>,
}
