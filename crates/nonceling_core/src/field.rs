//! Rotating polytope force fields.
//!
//! Each role owns one convex polytope. Fields form a hierarchy (Core, then
//! Control, then the three outer roles) and every child is centered at its
//! parent's center plus a fixed offset. A field does two things to the
//! particles it holds: it pushes back those that stray past the containment
//! threshold, and it pulls each one toward a formation target that turns with
//! the field.

use crate::config::FieldConfig;
use crate::error::{CoreError, Result};
use crate::rng::SeededRng;
use glam::DMat3;
use nonceling_data::{Behavior, DVec3, ForceField, Formation, Particle, ParticleGroup, ParticleRole};
use std::f64::consts::{PI, TAU};

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
/// Hexagonal prism half-height relative to its circumradius.
const PRISM_HALF_HEIGHT: f64 = 0.4;
/// Formation targets stay within this fraction of a field's inner radius.
const FORMATION_EXTENT: f64 = 0.75;

/// Polytope template of each role's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polytope {
    Icosahedron,
    Octahedron,
    HexagonalPrism,
    Cube,
    Tetrahedron,
}

impl Polytope {
    pub fn for_role(role: ParticleRole) -> Self {
        match role {
            ParticleRole::Core => Polytope::Icosahedron,
            ParticleRole::Control => Polytope::Octahedron,
            ParticleRole::Movement => Polytope::HexagonalPrism,
            ParticleRole::Defense => Polytope::Cube,
            ParticleRole::Attack => Polytope::Tetrahedron,
        }
    }

    /// Vertices on the unit sphere.
    pub fn unit_vertices(self) -> Vec<DVec3> {
        match self {
            Polytope::Icosahedron => {
                let p = GOLDEN_RATIO;
                let mut v = Vec::with_capacity(12);
                for a in [-1.0, 1.0] {
                    for b in [-p, p] {
                        v.push(DVec3::new(0.0, a, b));
                        v.push(DVec3::new(a, b, 0.0));
                        v.push(DVec3::new(b, 0.0, a));
                    }
                }
                v.into_iter().map(DVec3::normalize).collect()
            }
            Polytope::Octahedron => vec![
                DVec3::X,
                DVec3::NEG_X,
                DVec3::Y,
                DVec3::NEG_Y,
                DVec3::Z,
                DVec3::NEG_Z,
            ],
            Polytope::HexagonalPrism => {
                let ring = (1.0 - PRISM_HALF_HEIGHT * PRISM_HALF_HEIGHT).sqrt();
                let mut v = Vec::with_capacity(12);
                for y in [-PRISM_HALF_HEIGHT, PRISM_HALF_HEIGHT] {
                    for k in 0..6 {
                        let a = f64::from(k) * PI / 3.0;
                        v.push(DVec3::new(ring * a.cos(), y, ring * a.sin()));
                    }
                }
                v
            }
            Polytope::Cube => {
                let mut v = Vec::with_capacity(8);
                for x in [-1.0, 1.0] {
                    for y in [-1.0, 1.0] {
                        for z in [-1.0, 1.0] {
                            v.push(DVec3::new(x, y, z).normalize());
                        }
                    }
                }
                v
            }
            Polytope::Tetrahedron => [
                DVec3::new(1.0, 1.0, 1.0),
                DVec3::new(1.0, -1.0, -1.0),
                DVec3::new(-1.0, 1.0, -1.0),
                DVec3::new(-1.0, -1.0, 1.0),
            ]
            .into_iter()
            .map(DVec3::normalize)
            .collect(),
        }
    }

    /// Inradius of the unit-circumradius polytope.
    pub fn inradius_ratio(self) -> f64 {
        match self {
            Polytope::Icosahedron => {
                let p2 = GOLDEN_RATIO * GOLDEN_RATIO;
                p2 / (3.0f64.sqrt() * (p2 + 1.0).sqrt())
            }
            Polytope::Octahedron | Polytope::Cube => 1.0 / 3.0f64.sqrt(),
            Polytope::HexagonalPrism => {
                let ring = (1.0 - PRISM_HALF_HEIGHT * PRISM_HALF_HEIGHT).sqrt();
                PRISM_HALF_HEIGHT.min(ring * (PI / 6.0).cos())
            }
            Polytope::Tetrahedron => 1.0 / 3.0,
        }
    }
}

/// Rotation applying X, then Y, then Z.
pub fn rotation_matrix(angles: DVec3) -> DMat3 {
    DMat3::from_rotation_z(angles.z)
        * DMat3::from_rotation_y(angles.y)
        * DMat3::from_rotation_x(angles.x)
}

/// Advances a field's rotation by `dt` and recomputes its vertices from the base shape.
pub fn rotate_field(field: &mut ForceField, dt: f64) {
    let Some(speed) = field.rotation_speed else {
        return;
    };
    field.rotation += speed * dt;
    let m = rotation_matrix(field.rotation);
    let center = field.center;
    field.vertices = field
        .base_vertices
        .iter()
        .map(|v| center + m * (*v - center))
        .collect();
}

/// Distance from the center to the polytope boundary along unit direction `dir`.
pub fn support_radius(field: &ForceField, dir: DVec3) -> f64 {
    field
        .vertices
        .iter()
        .map(|v| (*v - field.center).dot(dir))
        .fold(f64::MIN, f64::max)
}

/// Restoring force on a particle at `position`.
///
/// Zero while the particle is inside `threshold` times the polytope's extent
/// in its direction, then quadratic in the overshoot, pointing at the center.
pub fn containment_force(field: &ForceField, position: DVec3, threshold: f64) -> DVec3 {
    let to_center = field.center - position;
    let dist = to_center.length();
    if !dist.is_finite() || dist <= threshold * field.inner_radius {
        return DVec3::ZERO;
    }
    let outward = -to_center / dist;
    let effective = support_radius(field, outward).max(field.inner_radius);
    let start = threshold * effective;
    if dist <= start {
        return DVec3::ZERO;
    }
    let excess = (dist - start) / effective;
    to_center / dist * (field.strength * excess * excess)
}

#[inline]
fn frac(x: f64) -> f64 {
    x - x.floor()
}

/// Point on the unit sphere for two uniform coordinates.
#[inline]
fn sphere_point(u: f64, v: f64) -> DVec3 {
    let y = 1.0 - 2.0 * u;
    let s = (1.0 - y * y).max(0.0).sqrt();
    let phi = TAU * v;
    DVec3::new(s * phi.cos(), y, s * phi.sin())
}

/// Uniform point in the ball of `radius` around `center`. Takes three draws.
pub fn sample_in_ball(rng: &mut SeededRng, center: DVec3, radius: f64) -> DVec3 {
    let dir = sphere_point(rng.next_f64(), rng.next_f64());
    center + dir * radius * rng.next_f64().cbrt()
}

/// Formation slot of particle `id`, relative to an unrotated field centered at the origin.
fn formation_slot(
    formation: Formation,
    id: u64,
    radius: f64,
    time: f64,
    field: &ForceField,
) -> DVec3 {
    let k = id as f64;
    // Additive recurrence sequences keep neighboring ids apart.
    let u = frac(0.5 + k * 0.618_033_988_749_895);
    let v = frac(0.5 + k * 0.754_877_666_246_693);
    let w = frac(0.5 + k * 0.569_840_290_998_053);

    match formation {
        Formation::Cluster => sphere_point(u, v) * radius * 0.45 * w.cbrt(),
        Formation::Ring => {
            let a = k * GOLDEN_ANGLE;
            DVec3::new(a.cos() * 0.85, (w - 0.5) * 0.15, a.sin() * 0.85) * radius
        }
        Formation::Shell => sphere_point(u, v) * radius * 0.9,
        Formation::Spiral => {
            let a = u * 3.0 * TAU;
            DVec3::new(a.cos() * u, (v - 0.5) * 0.1, a.sin() * u) * radius
        }
        Formation::Fins => {
            let n = field.base_vertices.len().max(1);
            let fin = (id % n as u64) as usize;
            let dir = field
                .base_vertices
                .get(fin)
                .map(|b| (*b - field.center).normalize_or_zero())
                .unwrap_or(DVec3::Y);
            dir * radius * (0.3 + 0.7 * u) + sphere_point(v, w) * radius * 0.05
        }
        Formation::Lattice => {
            let side = 5u64;
            let idx = [id % side, (id / side) % side, (id / (side * side)) % side];
            let step = radius / (2.0 * 3.0f64.sqrt());
            DVec3::new(
                idx[0] as f64 - 2.0,
                idx[1] as f64 - 2.0,
                idx[2] as f64 - 2.0,
            ) * step
        }
        Formation::Helix => {
            let a = u * 4.0 * TAU;
            DVec3::new(a.cos() * 0.6, u - 0.5, a.sin() * 0.6) * radius
        }
        Formation::Vortex => {
            let a = u * TAU + time * (0.4 + 0.6 * (1.0 - v));
            let r = 0.2 + 0.7 * v;
            DVec3::new(a.cos() * r, (w - 0.5) * 0.2 * (1.0 - v), a.sin() * r) * radius
        }
    }
}

/// Angular speed about the field's Y axis and radial breathing for a behavior.
fn behavior_motion(behavior: Behavior, id: u64, time: f64) -> (f64, f64) {
    let phase = frac(id as f64 * 0.618_033_988_749_895) * TAU;
    match behavior {
        Behavior::Drift => (0.05, 1.0),
        Behavior::Orbit => (0.5, 1.0),
        Behavior::Pulse => (0.0, 0.85 + 0.15 * (2.0 * time).sin()),
        Behavior::Swarm => (0.3, 0.9 + 0.1 * (3.0 * time + phase).sin()),
        Behavior::Patrol => (0.2, 1.0),
        Behavior::Guard => (0.0, 1.0),
        Behavior::Strike => (0.1, 0.8 + 0.2 * (0.5 * time + phase).cos().abs()),
        Behavior::Phase => (0.15, 0.9 + 0.1 * (time + phase).cos()),
    }
}

/// World-space formation target of particle `id` in `group` at `time`.
///
/// The target turns with the field and never lies farther than
/// three quarters of the field's inner radius from its center.
pub fn formation_target(group: &ParticleGroup, field: &ForceField, id: u64, time: f64) -> DVec3 {
    let limit = FORMATION_EXTENT * field.inner_radius;
    let radius = (limit * group.force_profile.reach).min(limit);
    let (spin, breathe) = behavior_motion(group.behavior, id, time);
    let local = formation_slot(group.formation, id, radius, time, field);
    let local = DMat3::from_rotation_y(spin * time) * local * breathe;
    let local = local.clamp_length_max(limit);
    field.center + rotation_matrix(field.rotation) * local
}

/// Owns one field per role.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceFieldSystem {
    fields: Vec<ForceField>,
    containment_threshold: f64,
    formation_strength: f64,
}

impl ForceFieldSystem {
    /// Builds the field hierarchy in role order.
    ///
    /// Consumes three draws per field from `rng` for the rotation speeds.
    pub fn build(config: &FieldConfig, rng: &mut SeededRng) -> Result<Self> {
        let mut fields: Vec<ForceField> = Vec::with_capacity(ParticleRole::COUNT);
        for role in ParticleRole::ALL {
            let radius = config.radius.get(role);
            if !radius.is_finite() || radius <= 0.0 {
                return Err(CoreError::malformed_field(
                    role,
                    format!("radius {radius} is not a positive number"),
                ));
            }
            let offset = config.offset_of(role);
            let parent = role.parent().map(ParticleRole::index);
            let parent_center = match parent {
                Some(p) => fields
                    .get(p)
                    .map(|f| f.center)
                    .ok_or_else(|| CoreError::malformed_field(role, "parent field not built"))?,
                None => DVec3::ZERO,
            };
            let center = parent_center + offset;
            if !center.is_finite() {
                return Err(CoreError::malformed_field(role, "center is not finite"));
            }

            let polytope = Polytope::for_role(role);
            let vertices: Vec<DVec3> = polytope
                .unit_vertices()
                .into_iter()
                .map(|v| center + v * radius)
                .collect();
            if vertices.len() < 4 {
                return Err(CoreError::malformed_field(role, "fewer than four vertices"));
            }
            let bounding_radius = vertices
                .iter()
                .map(|v| v.distance(center))
                .fold(0.0, f64::max);
            let inner_radius = radius * polytope.inradius_ratio();

            let speed = DVec3::new(rng.signed_unit(), rng.signed_unit(), rng.signed_unit())
                * config.max_rotation_speed;
            let rotation_speed = (config.max_rotation_speed > 0.0).then_some(speed);

            fields.push(ForceField {
                id: role.index(),
                role,
                center,
                offset,
                base_vertices: vertices.clone(),
                vertices,
                bounding_radius,
                inner_radius,
                rotation: DVec3::ZERO,
                rotation_speed,
                strength: config.containment_strength,
                parent,
            });
        }

        tracing::debug!(fields = fields.len(), "Force fields built");
        Ok(Self {
            fields,
            containment_threshold: config.containment_threshold,
            formation_strength: config.formation_strength,
        })
    }

    pub fn fields(&self) -> &[ForceField] {
        &self.fields
    }

    pub fn get(&self, id: usize) -> Option<&ForceField> {
        self.fields.get(id)
    }

    pub fn for_role(&self, role: ParticleRole) -> Option<&ForceField> {
        self.fields.iter().find(|f| f.role == role)
    }

    pub fn rotate_all(&mut self, dt: f64) {
        for field in &mut self.fields {
            rotate_field(field, dt);
        }
    }

    /// Containment plus formation pull on `particle`, which belongs to `group`.
    pub fn field_force(&self, particle: &Particle, group: &ParticleGroup, time: f64) -> DVec3 {
        let Some(field) = self.fields.get(group.field) else {
            return DVec3::ZERO;
        };
        let contain = containment_force(field, particle.position, self.containment_threshold);
        let target = formation_target(group, field, particle.id, time);
        let pull = (target - particle.position)
            * (self.formation_strength * group.force_profile.strength);
        contain + pull
    }
}
