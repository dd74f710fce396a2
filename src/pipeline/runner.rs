//! pipeline::runner
//!
//! Ordered, sequential execution of phases against one [`Config`].
//!
//! # Architecture
//!
//! ```text
//! declare args -> parse + apply write-effects -> run phase 1 -> ... -> run phase N
//! ```
//!
//! Every write-effect has been applied before the first phase runs. Phases
//! run one at a time in insertion order; the first failure stops the run.
//!
//! # Example
//!
//! ```ignore
//! use shipsync::pipeline::{Pipeline, PushLfsPhase};
//!
//! let pipeline = Pipeline::new().with_phase(PushLfsPhase::new(
//!     Side::Destination, "acme", "widget", true, credentials,
//! ));
//! pipeline.parse_args(&["--skip-lfs".to_string()])?;
//! let report = pipeline.run(&config)?;
//! assert_eq!(report.skipped(), 1);
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use thiserror::Error;

use super::phase::{ArgKind, CliArgument, Phase, PhaseError};
use crate::core::config::Config;

/// Errors from building or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Two phases (or a phase and the host command) declare the same option.
    #[error("option --{name} is declared by both '{first}' and '{second}'")]
    DuplicateArgument {
        name: String,
        first: String,
        second: String,
    },

    /// Phase arguments did not parse. Includes `--help`.
    #[error(transparent)]
    Args(#[from] clap::Error),

    /// A phase failed; later phases did not run.
    #[error("phase {index} failed: {source}")]
    Phase { index: usize, source: PhaseError },
}

/// How one phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Ran,
    Skipped,
}

/// One entry of a [`PipelineReport`].
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub name: String,
    pub status: PhaseStatus,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Result of a successful run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub phases: Vec<PhaseOutcome>,
}

impl PipelineReport {
    pub fn ran(&self) -> usize {
        self.count(PhaseStatus::Ran)
    }

    pub fn skipped(&self) -> usize {
        self.count(PhaseStatus::Skipped)
    }

    fn count(&self, status: PhaseStatus) -> usize {
        self.phases.iter().filter(|p| p.status == status).count()
    }
}

/// An ordered list of phases.
#[derive(Default)]
pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.phases.iter().map(|p| p.readable_name()).collect();
        f.debug_struct("Pipeline").field("phases", &names).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a phase.
    pub fn with_phase(mut self, phase: impl Phase + 'static) -> Self {
        self.phases.push(Box::new(phase));
        self
    }

    /// Append a boxed phase.
    pub fn push(&mut self, phase: Box<dyn Phase>) {
        self.phases.push(phase);
    }

    pub fn phases(&self) -> &[Box<dyn Phase>] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Every declared option, paired with the name of the phase declaring it.
    pub fn cli_arguments(&self) -> Vec<(String, CliArgument)> {
        self.phases
            .iter()
            .flat_map(|phase| {
                let name = phase.readable_name();
                phase
                    .cli_arguments()
                    .into_iter()
                    .map(move |arg| (name.clone(), arg))
            })
            .collect()
    }

    /// Add every phase option to `cmd`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DuplicateArgument`] if an option name is declared
    /// twice, or collides with an option `cmd` already has.
    pub fn augment(&self, mut cmd: Command) -> Result<Command, PipelineError> {
        let mut owners: HashMap<String, String> = cmd
            .get_arguments()
            .filter_map(|a| a.get_long())
            .map(|long| (long.to_string(), format!("{} itself", cmd.get_name())))
            .collect();

        for (phase, arg) in self.cli_arguments() {
            if let Some(first) = owners.get(arg.long_name()) {
                return Err(PipelineError::DuplicateArgument {
                    name: arg.long_name().to_string(),
                    first: first.clone(),
                    second: phase,
                });
            }
            owners.insert(arg.long_name().to_string(), phase);

            let action = match arg.kind() {
                ArgKind::Flag => ArgAction::SetTrue,
                ArgKind::Value => ArgAction::Set,
            };
            let name = arg.long_name().to_string();
            cmd = cmd.arg(
                Arg::new(name.clone())
                    .long(name)
                    .help(arg.description().to_string())
                    .action(action),
            );
        }
        Ok(cmd)
    }

    /// A standalone command holding just the phase options.
    pub fn command(&self) -> Result<Command, PipelineError> {
        self.augment(
            Command::new("shipsync run")
                .no_binary_name(true)
                .about("Phase options"),
        )
    }

    /// Invoke the write-effect of every option present in `matches`.
    ///
    /// `matches` must come from a command built by [`Pipeline::augment`].
    pub fn apply_matches(&self, matches: &ArgMatches) {
        for (phase, arg) in self.cli_arguments() {
            match arg.kind() {
                ArgKind::Flag => {
                    if matches.get_flag(arg.long_name()) {
                        tracing::debug!(phase = %phase, option = arg.long_name(), "applying option");
                        arg.apply(None);
                    }
                }
                ArgKind::Value => {
                    if let Some(value) = matches.get_one::<String>(arg.long_name()) {
                        tracing::debug!(phase = %phase, option = arg.long_name(), "applying option");
                        arg.apply(Some(value));
                    }
                }
            }
        }
    }

    /// Parse `args` (without a program name) and apply the write-effects.
    pub fn parse_args(&self, args: &[String]) -> Result<(), PipelineError> {
        let matches = self.command()?.try_get_matches_from(args)?;
        self.apply_matches(&matches);
        Ok(())
    }

    /// Run every phase in order.
    ///
    /// Skipped phases are reported, not treated as failures.
    pub fn run(&self, config: &Config) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();
        let total = self.phases.len();

        for (index, phase) in self.phases.iter().enumerate() {
            let name = phase.readable_name();
            let span = tracing::info_span!("phase", index = index + 1, total, name = %name);
            let _enter = span.enter();

            if phase.is_skipped() {
                tracing::info!("skipped");
                report.phases.push(PhaseOutcome {
                    name,
                    status: PhaseStatus::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            tracing::info!("starting");
            let started = Instant::now();
            let result = phase.run(config);
            let elapsed = started.elapsed();

            match result {
                Ok(()) => {
                    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "finished");
                    report.phases.push(PhaseOutcome {
                        name,
                        status: PhaseStatus::Ran,
                        elapsed,
                    });
                }
                Err(source) => {
                    tracing::error!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %source,
                        "failed"
                    );
                    return Err(PipelineError::Phase {
                        index: index + 1,
                        source,
                    });
                }
            }
        }

        Ok(report)
    }
}
