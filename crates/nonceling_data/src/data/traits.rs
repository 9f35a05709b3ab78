use super::role::{ParticleRole, Rarity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait categories drawn for every group, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitCategory {
    Shape,
    Color,
    Formation,
    Behavior,
    ForceProfile,
}

impl TraitCategory {
    pub const ALL: [TraitCategory; 5] = [
        TraitCategory::Shape,
        TraitCategory::Color,
        TraitCategory::Formation,
        TraitCategory::Behavior,
        TraitCategory::ForceProfile,
    ];
}

impl fmt::Display for TraitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraitCategory::Shape => "shape",
            TraitCategory::Color => "color",
            TraitCategory::Formation => "formation",
            TraitCategory::Behavior => "behavior",
            TraitCategory::ForceProfile => "force_profile",
        };
        f.write_str(name)
    }
}

/// Particle mesh shape, consumed by the renderer only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Sphere,
    Cube,
    Tetrahedron,
    Octahedron,
    Icosahedron,
    Torus,
    Crystal,
    Star,
}

/// Spatial layout a group's particles are pulled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    Cluster,
    Ring,
    Shell,
    Spiral,
    Fins,
    Lattice,
    Helix,
    Vortex,
}

/// Motion character of a group; modulates how formation targets move over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    Drift,
    Orbit,
    Pulse,
    Swarm,
    Patrol,
    Guard,
    Strike,
    Phase,
}

/// Named multiplier pair applied to a group's formation pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceProfile {
    pub name: String,
    /// Multiplier on the formation spring.
    pub strength: f64,
    /// Multiplier on the formation target radius.
    pub reach: f64,
}

impl Default for ForceProfile {
    fn default() -> Self {
        Self {
            name: "neutral".to_string(),
            strength: 1.0,
            reach: 1.0,
        }
    }
}

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Hue in degrees, saturation and value in [0, 1].
    pub fn to_hsv(self) -> (f64, f64, f64) {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let sat = if max == 0.0 { 0.0 } else { delta / max };
        (hue, sat, max)
    }

    pub fn from_hsv(hue: f64, sat: f64, val: f64) -> Self {
        let h = hue.rem_euclid(360.0);
        let c = val * sat;
        let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = val - c;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self {
            r: to_u8(r),
            g: to_u8(g),
            b: to_u8(b),
        }
    }

    /// Rotates the hue, keeping saturation and value.
    pub fn hue_shifted(self, degrees: f64) -> Self {
        let (h, s, v) = self.to_hsv();
        Self::from_hsv(h + degrees, s, v)
    }
}

/// All particles sharing one role and one set of traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleGroup {
    pub id: usize,
    pub role: ParticleRole,
    /// Live particle count.
    pub count: usize,
    /// Count at creation (or at split, for groups born from a split).
    pub birth_count: usize,
    /// Particles added by mutations so far.
    pub grown: usize,
    pub rarity: Rarity,
    pub shape: Shape,
    pub color: Color,
    pub scale: f64,
    pub formation: Formation,
    pub behavior: Behavior,
    pub force_profile: ForceProfile,
    /// Index of the force field containing this group.
    pub field: usize,
    /// Attraction/repulsion toward every role, indexed by `ParticleRole::index`.
    pub interactions: [f64; ParticleRole::COUNT],
}

impl ParticleGroup {
    /// A group with neutral placeholder traits, awaiting trait assignment.
    pub fn new(id: usize, role: ParticleRole, count: usize) -> Self {
        Self {
            id,
            role,
            count,
            birth_count: count,
            grown: 0,
            rarity: Rarity::Common,
            shape: Shape::Sphere,
            color: Color::rgb(255, 255, 255),
            scale: 1.0,
            formation: Formation::Cluster,
            behavior: Behavior::Drift,
            force_profile: ForceProfile::default(),
            field: role.index(),
            interactions: [0.0; ParticleRole::COUNT],
        }
    }
}
