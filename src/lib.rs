//! # Nonceling
//!
//! Headless host for nonceling creatures. The simulation lives in
//! `nonceling_core` and persistence in `nonceling_io`; this crate wires them
//! into a [`app::Driver`] that the `nonceling` binary runs from the command
//! line.

pub mod app;
