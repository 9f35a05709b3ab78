//! Core data structures for the nonceling simulation.

pub mod field;
pub mod matrix;
pub mod mutation;
pub mod particle;
pub mod role;
pub mod snapshot;
pub mod traits;
