//! shipsync - Phase-based synchronization between two checkouts
//!
//! shipsync copies changes from a source checkout to a destination checkout
//! by running an ordered pipeline of phases against one configuration. Each
//! side is a Git or Mercurial working copy guarded by its own lock.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`pipeline`] - The `Phase` contract, the runner and the LFS phase
//! - [`repo`] - Repository abstraction over Git (`git2`) and Mercurial
//! - [`core`] - Domain types, configuration and checkout locks
//! - [`auth`] - Forge credentials and credential-bearing URLs
//! - [`secrets`] - Secret storage abstraction
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Exactly one configuration exists per run; every phase sees the same
//!    side-to-checkout mapping
//! 2. A checkout is only touched while its side's lock is held
//! 3. Changed paths are reported byte-for-byte, whitespace included
//! 4. A skipped phase has no side effects
//! 5. Credentials never reach logs, errors or `Debug` output

pub mod auth;
pub mod cli;
pub mod core;
pub mod pipeline;
pub mod repo;
pub mod secrets;
pub mod ui;
