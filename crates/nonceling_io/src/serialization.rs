//! Serialization utilities with robust error handling.
//!
//! JSON is the canonical text form of a persisted creature. Gzip-compressed
//! JSON and a hex share code are layered on top of it.

use crate::error::{IoError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Serializes data to JSON.
pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Serializes data to pretty-printed JSON.
pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Deserializes data from a JSON string.
///
/// # Returns
/// Deserialized data on success, `IoError::Validation` for blank input.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {}", e)))
}

/// Gzip-compressed JSON bytes.
pub fn to_gz_json<T>(data: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let json = to_json(data)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json.as_bytes())
        .map_err(|e| IoError::compression(format!("gzip write failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| IoError::compression(format!("gzip finish failed: {}", e)))
}

/// Inverse of [`to_gz_json`].
pub fn from_gz_json<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let mut decoder = GzDecoder::new(bytes);
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|e| IoError::compression(format!("gzip read failed: {}", e)))?;
    from_json(&json)
}

/// Serializes data to a share code (hex-encoded JSON).
pub fn to_share_code<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    let json = to_json(data)?;
    Ok(hex::encode(json.as_bytes()))
}

/// Deserializes data from a share code.
pub fn from_share_code<T>(code: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if code.trim().is_empty() {
        return Err(IoError::validation("Empty share code"));
    }

    let bytes = hex::decode(code.trim())
        .map_err(|e| IoError::validation(format!("Invalid hex encoding: {}", e)))?;

    let json = String::from_utf8(bytes)
        .map_err(|e| IoError::validation(format!("Invalid UTF-8 in share code: {}", e)))?;

    from_json(&json)
}

/// Writes pretty JSON to a file.
pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })?;
    Ok(())
}

/// Reads JSON from a file.
pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let json = std::fs::read_to_string(&path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("reading JSON from {:?}", path.as_ref()))
    })?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonceling_data::PersistedState;

    fn state() -> PersistedState {
        PersistedState {
            seed: 0xDEAD_BEEF,
            confirmations: 123_456,
            rehash_chain: vec![1, 2, 3],
            applied_mutation_ids: vec!["deadbeef-evolution-0".to_string()],
            steps: 99,
            checkpoints: vec![],
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let json = to_json(&state()).expect("serialize");
        let restored: PersistedState = from_json(&json).expect("deserialize");
        assert_eq!(restored, state());
    }

    #[test]
    fn test_missing_steps_defaults_to_zero() {
        let json = r#"{"seed":1,"confirmations":0,"rehash_chain":[],"applied_mutation_ids":[]}"#;
        let restored: PersistedState = from_json(json).expect("deserialize");
        assert_eq!(restored.steps, 0);
    }

    #[test]
    fn test_empty_json_rejected() {
        let result: Result<PersistedState> = from_json("   ");
        assert!(matches!(result, Err(IoError::Validation(_))));
    }

    #[test]
    fn test_gz_roundtrip_and_garbage() {
        let bytes = to_gz_json(&state()).expect("compress");
        let restored: PersistedState = from_gz_json(&bytes).expect("decompress");
        assert_eq!(restored, state());

        let result: Result<PersistedState> = from_gz_json(b"not gzip");
        assert!(matches!(result, Err(IoError::Compression(_))));
    }

    #[test]
    fn test_share_code() {
        let code = to_share_code(&state()).expect("encode");
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        let restored: PersistedState = from_share_code(&code).expect("decode");
        assert_eq!(restored, state());
        assert!(from_share_code::<PersistedState>("zz").is_err());
        assert!(from_share_code::<PersistedState>("").is_err());
    }

    #[test]
    fn test_json_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("nonceling_io_{}.json", std::process::id()));
        write_json_file(&state(), &path).expect("write");
        let restored: PersistedState = read_json_file(&path).expect("read");
        assert_eq!(restored, state());
        let _ = std::fs::remove_file(&path);
    }
}
