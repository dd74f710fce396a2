//! head command - Show the head changeset of one side

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::Context;
use crate::core::config::Overrides;
use crate::core::types::Side;
use crate::repo::{self, Changeset};
use crate::ui::output;

#[derive(Serialize)]
struct HeadReport {
    side: Side,
    vcs: String,
    path: PathBuf,
    branch: String,
    changeset: Option<Changeset>,
}

/// Open `side`'s checkout under its lock and print its head changeset.
pub fn head(ctx: &Context, side: Side, overrides: &Overrides, json: bool) -> Result<()> {
    let config = ctx.load_config(overrides)?;
    let target = config.side(side);

    let handle = repo::open(target.lock(), target.path(), target.branch())
        .with_context(|| format!("Failed to open {} checkout", side))?;
    let changeset = handle.head_changeset()?;
    let vcs = handle.kind().to_string();
    handle.release()?;

    if json {
        output::json(&HeadReport {
            side,
            vcs,
            path: target.path().to_path_buf(),
            branch: target.branch().to_string(),
            changeset,
        })?;
        return Ok(());
    }

    match changeset {
        Some(changeset) => print!("{}", output::format_changeset(&changeset)),
        None => output::print(
            format!(
                "{} ({}) has no commits on {}",
                target.path().display(),
                vcs,
                target.branch()
            ),
            ctx.verbosity,
        ),
    }
    Ok(())
}
