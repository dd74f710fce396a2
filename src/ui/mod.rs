//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Commands print through this module so quiet mode and JSON output behave
//! the same everywhere. Logs go through `tracing`, not here.

pub mod output;
