//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads the configuration it needs through [`Context`]
//! 2. Calls into the library (pipeline, repo, secrets)
//! 3. Formats and displays output
//!
//! Only `auth` writes state of its own (the secret store). Everything else
//! reaches checkouts through [`crate::repo`] under their locks.

mod auth;
mod completion;
mod head;
mod phases;
mod run;

pub use auth::auth;
pub use completion::completion;
pub use head::head;
pub use phases::phases;
pub use run::run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::auth::{CredentialProvider, SecretStoreCredentials};
use crate::cli::args::Command;
use crate::core::config::{Config, ConfigError, Overrides};
use crate::secrets::{self, SecretStore};
use crate::ui::output::Verbosity;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit `--config` path
    pub config: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    /// Load the run configuration.
    pub fn load_config(&self, overrides: &Overrides) -> Result<Config> {
        let config = Config::load(self.config.as_deref(), overrides)
            .context("Failed to load configuration")?;
        if let Some(path) = config.file_path() {
            tracing::debug!(path = %path.display(), "configuration loaded");
        }
        Ok(config)
    }

    /// The secret store the configuration selects.
    ///
    /// Commands that only touch secrets run without a config file; the
    /// default provider is used then.
    pub fn secret_store(&self) -> Result<Box<dyn SecretStore>> {
        let provider = match Config::locate(self.config.as_deref()) {
            Ok(path) => Config::read_file(&path)?
                .secrets
                .and_then(|s| s.provider)
                .unwrap_or_else(|| secrets::DEFAULT_PROVIDER.to_string()),
            Err(ConfigError::NotFound) => secrets::DEFAULT_PROVIDER.to_string(),
            Err(e) => return Err(e.into()),
        };
        secrets::create_store(&provider).context("Failed to initialize secret store")
    }
}

/// Credentials backed by the store `config` selects.
pub fn credential_provider(config: &Config) -> Result<Arc<dyn CredentialProvider>> {
    let store = secrets::create_store(config.secrets_provider())
        .context("Failed to initialize secret store")?;
    Ok(Arc::new(SecretStoreCredentials::new(Arc::from(store))))
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Run {
            overrides,
            json,
            phase_args,
        } => run(ctx, &overrides.into(), json, &phase_args),
        Command::Head {
            side,
            overrides,
            json,
        } => head(ctx, side, &overrides.into(), json),
        Command::Phases => phases(ctx),
        Command::Auth {
            org,
            project,
            user,
            token,
            status,
            logout,
        } => auth(
            ctx,
            org.as_deref(),
            project.as_deref(),
            user.as_deref(),
            token.as_deref(),
            status,
            logout,
        ),
        Command::Completion { shell } => completion(shell),
    }
}
