use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// A confirmation update that applied mutations, and the step count it arrived at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct MutationCheckpoint {
    pub step: u64,
    pub confirmations: u64,
}

/// Everything needed to rebuild a creature by replaying from its seed.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct PersistedState {
    pub seed: u32,
    pub confirmations: u64,
    /// Retained tail of the root generator's rehash chain.
    pub rehash_chain: Vec<u32>,
    pub applied_mutation_ids: Vec<String>,
    /// Fixed steps taken so far.
    #[serde(default)]
    pub steps: u64,
    /// Updates that changed the creature, in the order they were applied.
    #[serde(default)]
    pub checkpoints: Vec<MutationCheckpoint>,
}
