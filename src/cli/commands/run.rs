//! run command - Run the sync pipeline

use anyhow::{Context as _, Result};

use super::{credential_provider, Context};
use crate::core::config::Overrides;
use crate::pipeline::{self, PipelineError};
use crate::ui::output;

/// Build the pipeline from the configuration, apply phase options, run.
pub fn run(ctx: &Context, overrides: &Overrides, json: bool, phase_args: &[String]) -> Result<()> {
    let config = ctx.load_config(overrides)?;
    let pipeline = pipeline::build(&config, credential_provider(&config)?);

    match pipeline.parse_args(phase_args) {
        // clap prints help or the usage error itself.
        Err(PipelineError::Args(e)) => e.exit(),
        other => other.context("Invalid phase options")?,
    }

    if pipeline.is_empty() {
        output::warn("no phases configured; nothing to do", ctx.verbosity);
    }

    let report = pipeline.run(&config)?;

    if json {
        output::json(&report)?;
        return Ok(());
    }
    for phase in &report.phases {
        output::print(
            format!(
                "{:<8} {} ({} ms)",
                format!("{:?}", phase.status).to_lowercase(),
                phase.name,
                phase.elapsed.as_millis()
            ),
            ctx.verbosity,
        );
    }
    output::print(
        format!("{} ran, {} skipped", report.ran(), report.skipped()),
        ctx.verbosity,
    );
    Ok(())
}
