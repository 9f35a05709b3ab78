//! # Nonceling Core
//!
//! The deterministic simulation engine behind a nonceling: a creature of five
//! hundred particles grown from a single 32-bit block nonce.
//!
//! This crate contains:
//! - Seeded random streams with a rehash chain
//! - Trait assignment from a rarity-tiered catalog
//! - Role-to-role pairwise forces with grid acceleration
//! - Rotating polytope force fields for containment and formations
//! - A fixed-step integrator with collision resolution
//! - Confirmation milestones and the mutations they trigger
//! - Metrics collection and structured logging
//!
//! ## Determinism
//!
//! Every random decision is drawn from a stream derived from the seed, each
//! consumer owns its own stream, and floating-point reductions run in a fixed
//! order even when the work is spread over the Rayon pool. Two creatures with
//! the same seed, configuration, steps and confirmation updates are
//! bit-identical.
//!
//! ## Example
//!
//! ```
//! use nonceling_core::creature::Creature;
//!
//! let mut creature = Creature::new(0x00C0_FFEE);
//! assert_eq!(creature.particles().len(), 500);
//!
//! // A 60 Hz frame runs exactly one fixed step
//! assert_eq!(creature.tick(1.0 / 60.0), 1);
//!
//! // Confirmations arrive from outside; milestones are consumed once
//! let applied = creature.on_confirmations_updated(10_000);
//! assert!(applied.len() <= 1);
//! assert!(creature.on_confirmations_updated(10_000).is_empty());
//! ```

/// Configuration management for creature parameters
pub mod config;
/// The creature facade: birth, stepping, mutations and snapshots
pub mod creature;
/// Error types
pub mod error;
/// Rotating polytope force fields
pub mod field;
/// Pairwise role-to-role forces
pub mod force;
/// Metrics collection and logging setup
pub mod metrics;
/// Confirmation milestones and mutation effects
pub mod mutation;
/// Fixed-step integration and collisions
pub mod physics;
/// Deterministic random streams
pub mod rng;
/// Uniform grid for neighbor queries
pub mod spatial_hash;
/// Rarity rolls and trait catalogs
pub mod traits;

pub use creature::Creature;
pub use error::{CoreError, Result};
