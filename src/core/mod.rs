//! core
//!
//! Core domain types, configuration and locking for shipsync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Side, BranchName, ChangesetId
//! - [`config`] - Configuration schema and loading
//! - [`lock`] - Per-checkout exclusive locks
//! - [`tempdir`] - Scoped scratch directories
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Configuration is resolved once and read-only afterwards

pub mod config;
pub mod lock;
pub mod tempdir;
pub mod types;
