//! Saving, loading and restoring creatures.
//!
//! A creature is never written out particle by particle. What gets saved is a
//! [`PersistedState`]: the seed, the confirmation count, the step count, the
//! tail of the root rehash chain, the ids of the applied mutations and the
//! step at which each mutating update arrived. Restoring replays birth, the
//! updates and the steps from the seed and then checks that the replay
//! reached the same chain and the same mutations.

use crate::error::{IoError, Result};
use crate::serialization::{from_gz_json, from_json, to_gz_json, to_json_pretty};
use nonceling_core::config::AppConfig;
use nonceling_core::creature::Creature;
use nonceling_core::traits::TraitCatalog;
use nonceling_data::PersistedState;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{Archive, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Version written into JSON save files.
pub const SAVE_FORMAT_VERSION: u32 = 1;

pub fn to_rkyv_bytes<T>(data: &T) -> Result<Vec<u8>>
where
    T: Serialize<AllocSerializer<4096>>,
    T: Archive,
{
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(data)
        .map_err(|e| IoError::rkyv(format!("Rkyv serialization error: {:?}", e)))?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}

pub fn from_rkyv_bytes<T>(bytes: &[u8]) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>
        + for<'a> rkyv::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>,
{
    // Archived roots need aligned storage
    let mut aligned = rkyv::AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let archived = rkyv::check_archived_root::<T>(&aligned)
        .map_err(|e| IoError::rkyv(format!("Rkyv validation error: {:?}", e)))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::rkyv(format!("Rkyv deserialization error: {:?}", e)))
}

pub fn save_rkyv<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize<AllocSerializer<4096>>,
    T: Archive,
    P: AsRef<Path>,
{
    let bytes = to_rkyv_bytes(data)?;
    std::fs::write(&path, bytes).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing rkyv to {:?}", path.as_ref()))
    })
}

pub fn load_rkyv<T, P>(path: P) -> Result<T>
where
    T: Archive,
    T::Archived: Deserialize<T, SharedDeserializeMap>
        + for<'a> rkyv::CheckBytes<rkyv::validation::validators::DefaultValidator<'a>>,
    P: AsRef<Path>,
{
    let bytes = std::fs::read(&path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("reading rkyv from {:?}", path.as_ref()))
    })?;
    from_rkyv_bytes(&bytes)
}

/// On-disk encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// `.json`: pretty JSON with a checksum
    Json,
    /// `.gz`: the same document, gzip-compressed
    GzJson,
    /// `.rkyv`: the bare state as a validated rkyv archive
    Rkyv,
}

impl SaveFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("gz") => Ok(Self::GzJson),
            Some("rkyv") => Ok(Self::Rkyv),
            _ => Err(IoError::validation(format!(
                "unknown save format for {:?}; expected .json, .gz or .rkyv",
                path.as_ref()
            ))),
        }
    }
}

/// JSON save document: the state plus a checksum over its canonical JSON.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub checksum: String,
    pub state: PersistedState,
}

/// Hex SHA-256 of the compact JSON form of `state`.
pub fn state_checksum(state: &PersistedState) -> Result<String> {
    let json = crate::serialization::to_json(state)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

impl SaveFile {
    pub fn new(state: PersistedState) -> Result<Self> {
        Ok(Self {
            version: SAVE_FORMAT_VERSION,
            checksum: state_checksum(&state)?,
            state,
        })
    }

    /// Checks version and checksum, returning the state.
    pub fn into_verified_state(self) -> Result<PersistedState> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(IoError::validation(format!(
                "unsupported save version {} (expected {})",
                self.version, SAVE_FORMAT_VERSION
            )));
        }
        let actual = state_checksum(&self.state)?;
        if actual != self.checksum {
            return Err(IoError::validation(format!(
                "checksum mismatch: file says {}, content hashes to {}",
                self.checksum, actual
            )));
        }
        Ok(self.state)
    }
}

/// Writes `state` as a checksummed, pretty-printed JSON save file.
pub fn save_json<P: AsRef<Path>>(state: &PersistedState, path: P) -> Result<()> {
    let json = to_json_pretty(&SaveFile::new(state.clone())?)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })
}

/// Reads a JSON save file, rejecting it if the checksum does not match.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<PersistedState> {
    let json = std::fs::read_to_string(&path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("reading JSON from {:?}", path.as_ref()))
    })?;
    from_json::<SaveFile>(&json)?.into_verified_state()
}

/// Writes `state` to `path` in the format its extension names.
pub fn save_state<P: AsRef<Path>>(state: &PersistedState, path: P) -> Result<()> {
    let path = path.as_ref();
    match SaveFormat::from_path(path)? {
        SaveFormat::Json => save_json(state, path)?,
        SaveFormat::GzJson => {
            let bytes = to_gz_json(&SaveFile::new(state.clone())?)?;
            std::fs::write(path, bytes).map_err(|e| {
                IoError::FileSystem(e).with_context(format!("writing gzip to {:?}", path))
            })?;
        }
        SaveFormat::Rkyv => save_rkyv(state, path)?,
    }
    tracing::info!(path = ?path, seed = state.seed, "Creature state saved");
    Ok(())
}

/// Reads a state written by [`save_state`].
pub fn load_state<P: AsRef<Path>>(path: P) -> Result<PersistedState> {
    let path = path.as_ref();
    let state = match SaveFormat::from_path(path)? {
        SaveFormat::Json => load_json(path)?,
        SaveFormat::GzJson => {
            let bytes = std::fs::read(path).map_err(|e| {
                IoError::FileSystem(e).with_context(format!("reading gzip from {:?}", path))
            })?;
            from_gz_json::<SaveFile>(&bytes)?.into_verified_state()?
        }
        SaveFormat::Rkyv => load_rkyv(path)?,
    };
    Ok(state)
}

/// Rebuilds a creature from `state` with the default configuration and catalog.
pub fn restore(state: &PersistedState) -> Result<Creature> {
    restore_with(state, AppConfig::default(), Arc::new(TraitCatalog::default()))
}

/// Rebuilds a creature by replaying birth, its confirmation updates and its steps.
///
/// Each checkpointed update is replayed at the step count it originally
/// arrived at, then the final confirmation count is reported and the
/// remaining fixed steps are run. The restored creature matches the saved
/// one in particles, groups, time and step count. The replay must reproduce
/// the persisted mutation ids and checkpoints exactly and agree with the
/// persisted rehash chain, otherwise the state was produced under a
/// different configuration or has been tampered with.
pub fn restore_with(
    state: &PersistedState,
    config: AppConfig,
    catalog: Arc<TraitCatalog>,
) -> Result<Creature> {
    validate_checkpoints(state)?;
    let mut creature = Creature::build(state.seed, config, catalog)?;

    for checkpoint in &state.checkpoints {
        advance_to(&mut creature, checkpoint.step);
        creature.try_on_confirmations_updated(checkpoint.confirmations)?;
    }
    creature.try_on_confirmations_updated(state.confirmations)?;
    advance_to(&mut creature, state.steps);

    if creature.checkpoints() != state.checkpoints.as_slice() {
        return Err(IoError::replay(format!(
            "checkpoints differ: persisted {:?}, replayed {:?}",
            state.checkpoints,
            creature.checkpoints()
        )));
    }

    let replayed: Vec<&str> = creature
        .mutation_history()
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    if replayed != state.applied_mutation_ids {
        return Err(IoError::replay(format!(
            "mutations differ: persisted {:?}, replayed {:?}",
            state.applied_mutation_ids, replayed
        )));
    }

    let chain = creature.rehash_chain().to_vec();
    if chain != state.rehash_chain {
        return Err(IoError::replay(format!(
            "rehash chain differs: persisted {} entries, replayed {}",
            state.rehash_chain.len(),
            chain.len()
        )));
    }

    tracing::info!(
        seed = state.seed,
        confirmations = state.confirmations,
        steps = state.steps,
        mutations = replayed.len(),
        "Creature restored"
    );
    Ok(creature)
}

fn advance_to(creature: &mut Creature, step: u64) {
    while creature.steps() < step {
        creature.step();
    }
}

/// Checkpoints must be ordered and lie within the persisted steps and confirmations.
fn validate_checkpoints(state: &PersistedState) -> Result<()> {
    let mut last = (0u64, 0u64);
    for cp in &state.checkpoints {
        if cp.step < last.0 || cp.confirmations <= last.1 {
            return Err(IoError::validation(format!(
                "checkpoint {:?} is out of order",
                cp
            )));
        }
        if cp.step > state.steps || cp.confirmations > state.confirmations {
            return Err(IoError::validation(format!(
                "checkpoint {:?} lies beyond step {} at {} confirmations",
                cp, state.steps, state.confirmations
            )));
        }
        last = (cp.step, cp.confirmations);
    }
    Ok(())
}
