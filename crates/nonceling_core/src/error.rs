//! Error types for creature construction.
//!
//! Every variant is a configuration or programming error. None of them is
//! recoverable at runtime: a creature that cannot be built exactly as its seed
//! dictates must not be built at all.

use nonceling_data::{ParticleRole, Rarity, TraitCategory};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A (role, rarity, category) cell of the trait catalog has no entries.
    #[error("trait catalog has no {category} entries for {role} at rarity {rarity}")]
    EmptyCatalog {
        role: ParticleRole,
        rarity: Rarity,
        category: TraitCategory,
    },

    /// A force field definition cannot produce a valid polytope.
    #[error("malformed force field for {role}: {reason}")]
    MalformedField { role: ParticleRole, reason: String },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A group index that does not exist.
    #[error("unknown particle group {0}")]
    UnknownGroup(usize),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    #[must_use]
    pub fn malformed_field<S: Into<String>>(role: ParticleRole, reason: S) -> Self {
        Self::MalformedField {
            role,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_config(err: &anyhow::Error) -> Self {
        Self::InvalidConfig(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_catalog_display() {
        let err = CoreError::EmptyCatalog {
            role: ParticleRole::Attack,
            rarity: Rarity::Mythic,
            category: TraitCategory::Shape,
        };
        assert_eq!(
            err.to_string(),
            "trait catalog has no shape entries for attack at rarity mythic"
        );
    }

    #[test]
    fn test_invalid_config_keeps_context() {
        let inner = anyhow::anyhow!("viscosity must be in [0.0, 1.0)").context("physics");
        let err = CoreError::invalid_config(&inner);
        assert!(err.to_string().contains("physics"));
        assert!(err.to_string().contains("viscosity"));
    }
}
