//! phases command - List configured phases and their options

use anyhow::Result;

use super::{credential_provider, Context};
use crate::core::config::Overrides;
use crate::pipeline::{self, ArgKind, Pipeline};

/// Print each phase of the configured pipeline with its options.
pub fn phases(ctx: &Context) -> Result<()> {
    let config = ctx.load_config(&Overrides::default())?;
    // Listing never resolves credentials.
    let pipeline = pipeline::build(&config, credential_provider(&config)?);

    print!("{}", describe(&pipeline));
    Ok(())
}

/// Human-readable listing of `pipeline`.
pub fn describe(pipeline: &Pipeline) -> String {
    if pipeline.is_empty() {
        return "No phases configured.\n".to_string();
    }

    let mut out = String::new();
    for phase in pipeline.phases() {
        let state = if phase.is_skipped() { "skipped" } else { "enabled" };
        out.push_str(&format!("{} ({})\n", phase.readable_name(), state));
        for arg in phase.cli_arguments() {
            let flag = match arg.kind() {
                ArgKind::Flag => format!("--{}", arg.long_name()),
                ArgKind::Value => format!("--{} <VALUE>", arg.long_name()),
            };
            out.push_str(&format!("    {:<24} {}\n", flag, arg.description()));
        }
    }
    out
}
