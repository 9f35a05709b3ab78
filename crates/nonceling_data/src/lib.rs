//! Plain data types shared by the nonceling engine and its persistence layer.
//!
//! Nothing in this crate draws random numbers or advances time; it only
//! describes the state a creature is made of.

pub mod data;

pub use data::field::ForceField;
pub use data::matrix::ForceRuleMatrix;
pub use data::mutation::{Mutation, MutationType};
pub use data::particle::Particle;
pub use data::role::{ParticleRole, Rarity};
pub use data::snapshot::{MutationCheckpoint, PersistedState};
pub use data::traits::{
    Behavior, Color, ForceProfile, Formation, ParticleGroup, Shape, TraitCategory,
};
pub use glam::DVec3;
