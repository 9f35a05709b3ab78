use super::role::ParticleRole;
use serde::{Deserialize, Serialize};

/// Role x role interaction strengths in [-1, 1].
///
/// `get(a, b)` is the push `a` feels from `b`: positive values drive the two
/// apart, negative values draw them together. The matrix is not symmetric.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForceRuleMatrix {
    values: [[f64; ParticleRole::COUNT]; ParticleRole::COUNT],
}

impl ForceRuleMatrix {
    pub fn from_values(values: [[f64; ParticleRole::COUNT]; ParticleRole::COUNT]) -> Self {
        let mut m = Self { values };
        for row in m.values.iter_mut() {
            for v in row.iter_mut() {
                *v = v.clamp(-1.0, 1.0);
            }
        }
        m
    }

    #[inline]
    pub fn get(&self, a: ParticleRole, b: ParticleRole) -> f64 {
        self.values[a.index()][b.index()]
    }

    /// Stores `value` clamped to [-1, 1] and returns what was stored.
    pub fn set(&mut self, a: ParticleRole, b: ParticleRole, value: f64) -> f64 {
        let clamped = value.clamp(-1.0, 1.0);
        self.values[a.index()][b.index()] = clamped;
        clamped
    }

    pub fn row(&self, a: ParticleRole) -> [f64; ParticleRole::COUNT] {
        self.values[a.index()]
    }

    pub fn values(&self) -> &[[f64; ParticleRole::COUNT]; ParticleRole::COUNT] {
        &self.values
    }
}
