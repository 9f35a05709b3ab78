//! # Nonceling IO
//!
//! Persistence layer for nonceling creatures.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - Serialization helpers (JSON, gzip JSON, hex share codes, rkyv)
//! - Checksummed save files and replay-based restore

/// Error types and result aliases for I/O operations
pub mod error;
/// Save files, rkyv archives and replay from a persisted state
pub mod persistence;
/// Validated serialization helpers for JSON, gzip and share codes
pub mod serialization;

pub use error::{IoError, Result};
pub use persistence::{
    load_json, load_rkyv, load_state, restore, restore_with, save_json, save_rkyv, save_state,
    SaveFile, SaveFormat,
};
pub use serialization::{
    from_gz_json, from_json, from_share_code, read_json_file, to_gz_json, to_json, to_json_pretty,
    to_share_code, write_json_file,
};
