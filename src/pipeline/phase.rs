//! pipeline::phase
//!
//! The contract every synchronization step satisfies.
//!
//! # Lifecycle
//!
//! ```text
//! construct --(skip() | CLI write-effects)*--> run(&Config) --> done
//! ```
//!
//! All CLI write-effects run before any phase's `run`. A skipped phase's
//! `run` returns `Ok(())` without touching a repository.
//!
//! # Invariants
//!
//! - `cli_arguments()` only describes options. Nothing changes until a
//!   write-effect is applied.
//! - `skip()` is idempotent and cannot be undone.
//! - `readable_name()` never contains credentials.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::auth::CredentialError;
use crate::core::config::{Config, SideConfig};
use crate::core::types::{BranchName, Side};
use crate::repo::RepoError;

/// Shared "this phase is inert" flag.
///
/// Clones observe the same flag, so a CLI write-effect holding a clone can
/// skip the phase it belongs to.
#[derive(Debug, Clone, Default)]
pub struct SkipSwitch(Arc<AtomicBool>);

impl SkipSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as skipped. Calling again has no further effect.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Whether an option takes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// `--name`
    Flag,
    /// `--name <value>`
    Value,
}

/// Write-effect invoked with the parsed value (`None` for flags).
pub type WriteEffect = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// A command-line option contributed by a phase.
#[derive(Clone)]
pub struct CliArgument {
    long_name: String,
    description: String,
    kind: ArgKind,
    write: WriteEffect,
}

impl CliArgument {
    /// A boolean `--long-name` option; `write` runs when it is present.
    pub fn flag(
        long_name: impl Into<String>,
        description: impl Into<String>,
        write: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            long_name: long_name.into(),
            description: description.into(),
            kind: ArgKind::Flag,
            write: Arc::new(move |_: Option<&str>| write()),
        }
    }

    /// A `--long-name <value>` option; `write` receives the value.
    pub fn value(
        long_name: impl Into<String>,
        description: impl Into<String>,
        write: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            long_name: long_name.into(),
            description: description.into(),
            kind: ArgKind::Value,
            write: Arc::new(move |v: Option<&str>| write(v.unwrap_or_default())),
        }
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    /// Invoke the write-effect.
    pub fn apply(&self, value: Option<&str>) {
        (self.write)(value)
    }
}

impl fmt::Debug for CliArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliArgument")
            .field("long_name", &self.long_name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The checkout a phase was working on when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTarget {
    pub side: Side,
    pub path: PathBuf,
    pub branch: BranchName,
}

impl PhaseTarget {
    pub fn new(side: Side, config: &SideConfig) -> Self {
        Self {
            side,
            path: config.path().to_path_buf(),
            branch: config.branch().clone(),
        }
    }
}

impl fmt::Display for PhaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checkout {} on branch {}",
            self.side,
            self.path.display(),
            self.branch
        )
    }
}

/// A phase failure, with enough context to diagnose it from the message.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A repository operation failed.
    #[error("{phase}: {target}: {source}")]
    Repo {
        phase: String,
        target: PhaseTarget,
        source: RepoError,
    },

    /// Credentials could not be resolved or embedded.
    #[error("{phase}: {target}: {source}")]
    Credentials {
        phase: String,
        target: PhaseTarget,
        source: CredentialError,
    },

    /// Any other failure.
    #[error("{phase}: {message}")]
    Failed { phase: String, message: String },
}

impl PhaseError {
    /// Readable name of the failing phase.
    pub fn phase(&self) -> &str {
        match self {
            PhaseError::Repo { phase, .. }
            | PhaseError::Credentials { phase, .. }
            | PhaseError::Failed { phase, .. } => phase,
        }
    }

    /// The checkout involved, when there was one.
    pub fn target(&self) -> Option<&PhaseTarget> {
        match self {
            PhaseError::Repo { target, .. } | PhaseError::Credentials { target, .. } => {
                Some(target)
            }
            PhaseError::Failed { .. } => None,
        }
    }
}

/// One step of a synchronization run.
///
/// Implementors provide [`Phase::run_impl`]; [`Phase::run`] wraps it with
/// the skip check and must not be overridden.
pub trait Phase: Send {
    /// Whether the phase belongs to one project's configuration rather
    /// than to the shared pipeline.
    fn is_project_specific(&self) -> bool;

    /// Stable human-readable label. Must name the side the phase acts on,
    /// if any.
    fn readable_name(&self) -> String;

    /// Options this phase adds to the command line.
    fn cli_arguments(&self) -> Vec<CliArgument> {
        Vec::new()
    }

    /// The phase's skip flag.
    fn skip_switch(&self) -> &SkipSwitch;

    /// Make the phase inert.
    fn skip(&self) {
        self.skip_switch().set();
    }

    fn is_skipped(&self) -> bool {
        self.skip_switch().is_set()
    }

    /// Run unless skipped.
    fn run(&self, config: &Config) -> Result<(), PhaseError> {
        if self.is_skipped() {
            return Ok(());
        }
        self.run_impl(config)
    }

    /// The phase's work. Only called when not skipped.
    fn run_impl(&self, config: &Config) -> Result<(), PhaseError>;
}
