//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--config <path>`: config file (else `$SHIPSYNC_CONFIG`, then the
//!   default locations)
//! - `--debug`: debug logging
//! - `--quiet` / `-q`: minimal output
//!
//! Phase options are not part of this static surface: `run` collects
//! everything after its own flags and hands it to the pipeline, which
//! knows which options its phases declare.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::Overrides;
use crate::core::types::Side;

/// shipsync - phase-based sync between Git and Mercurial repositories
#[derive(Parser, Debug)]
#[command(name = "shipsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Per-side path and branch overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct SideOverrides {
    /// Source checkout (overrides [source] path)
    #[arg(long, value_name = "PATH")]
    pub source_path: Option<PathBuf>,

    /// Source branch (overrides [source] branch)
    #[arg(long, value_name = "BRANCH")]
    pub source_branch: Option<String>,

    /// Destination checkout (overrides [destination] path)
    #[arg(long, value_name = "PATH")]
    pub destination_path: Option<PathBuf>,

    /// Destination branch (overrides [destination] branch)
    #[arg(long, value_name = "BRANCH")]
    pub destination_branch: Option<String>,
}

impl From<SideOverrides> for Overrides {
    fn from(o: SideOverrides) -> Self {
        Overrides {
            source_path: o.source_path,
            source_branch: o.source_branch,
            destination_path: o.destination_path,
            destination_branch: o.destination_branch,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the sync pipeline
    #[command(
        name = "run",
        long_about = "Run every configured phase in order.\n\n\
            Options after the run flags belong to the phases (for example \
            --skip-lfs). Use 'shipsync phases' to list them.",
        after_help = "\
EXAMPLES:
    # Run with the config file's settings
    shipsync run

    # Skip the LFS phase for this run
    shipsync run --skip-lfs

    # Point the destination at another checkout
    shipsync run --destination-path /srv/export --skip-lfs"
    )]
    Run {
        #[command(flatten)]
        overrides: SideOverrides,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Phase options
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "PHASE_OPTIONS"
        )]
        phase_args: Vec<String>,
    },

    /// Show the head changeset of one side
    #[command(name = "head")]
    Head {
        /// Side to inspect (source or destination)
        side: Side,

        #[command(flatten)]
        overrides: SideOverrides,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured phases and the options they accept
    #[command(name = "phases")]
    Phases,

    /// Store forge credentials
    #[command(
        name = "auth",
        after_help = "\
Credentials are looked up per project, then per organization, then globally.

EXAMPLES:
    # Token for every project of an organization (prompts)
    shipsync auth --org acme

    # Token for one project, non-interactively
    echo \"$TOKEN\" | shipsync auth --org acme --project widget

    # Check or remove
    shipsync auth --org acme --status
    shipsync auth --org acme --logout"
    )]
    Auth {
        /// Forge organization (omit for the global credential)
        #[arg(long)]
        org: Option<String>,

        /// Forge project (requires --org)
        #[arg(long, requires = "org")]
        project: Option<String>,

        /// Username, for username/password credentials
        #[arg(long)]
        user: Option<String>,

        /// Token or password (prompted for if omitted)
        #[arg(long)]
        token: Option<String>,

        /// Show whether credentials are stored
        #[arg(long, conflicts_with_all = ["logout", "token", "user"])]
        status: bool,

        /// Remove stored credentials
        #[arg(long, conflicts_with_all = ["token", "user"])]
        logout: bool,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
