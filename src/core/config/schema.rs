//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Locations
//!
//! Searched in order (first hit wins):
//! 1. `--config <path>` on the command line
//! 2. `$SHIPSYNC_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/shipsync/config.toml`
//! 4. `~/.shipsync/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing: branch names must be valid, the
//! lock timeout must be positive, and LFS sync needs an organization and
//! project when enabled.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, Side};

/// Top-level configuration file.
///
/// # Example
///
/// ```toml
/// lock_timeout_secs = 60
///
/// [source]
/// path = "/var/sync/internal"
/// branch = "master"
///
/// [destination]
/// path = "/var/sync/github"
/// branch = "main"
///
/// [lfs]
/// enabled = true
/// side = "destination"
/// organization = "myorg"
/// project = "myproj"
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Seconds to wait for a checkout lock before giving up.
    pub lock_timeout_secs: Option<u64>,

    /// Source repository checkout
    pub source: Option<SideSection>,

    /// Destination repository checkout
    pub destination: Option<SideSection>,

    /// Large-file sync settings
    pub lfs: Option<LfsSection>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "lock_timeout_secs must be greater than zero".into(),
            ));
        }

        for (side, section) in [(Side::Source, &self.source), (Side::Destination, &self.destination)] {
            if let Some(section) = section {
                section.validate(side)?;
            }
        }

        if let Some(lfs) = &self.lfs {
            lfs.validate()?;
        }

        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }

        Ok(())
    }

    /// Section for a side, if present.
    pub fn section(&self, side: Side) -> Option<&SideSection> {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Destination => self.destination.as_ref(),
        }
    }
}

/// One side's checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SideSection {
    /// Local checkout path
    pub path: Option<PathBuf>,

    /// Branch to sync from/to
    pub branch: Option<String>,

    /// Explicit lock file (defaults to a file beside the checkout)
    pub lock_file: Option<PathBuf>,
}

impl SideSection {
    fn validate(&self, side: Side) -> Result<(), ConfigError> {
        if let Some(branch) = &self.branch {
            BranchName::new(branch.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid {} branch '{}': {}", side, branch, e))
            })?;
        }
        Ok(())
    }
}

/// Large-file sync settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LfsSection {
    /// Whether LFS sync runs by default (`--skip-lfs` still disables it)
    pub enabled: Option<bool>,

    /// Which side's checkout holds the LFS pointers to push
    pub side: Option<Side>,

    /// Forge organization owning the destination project
    pub organization: Option<String>,

    /// Forge project name
    pub project: Option<String>,
}

impl LfsSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled != Some(true) {
            return Ok(());
        }
        for (field, value) in [("organization", &self.organization), ("project", &self.project)] {
            match value {
                Some(v) if !v.trim().is_empty() && !v.contains('/') => {}
                Some(v) => {
                    return Err(ConfigError::InvalidValue(format!(
                        "invalid lfs.{} '{}'",
                        field, v
                    )))
                }
                None => {
                    return Err(ConfigError::InvalidValue(format!(
                        "lfs.{} is required when lfs.enabled = true",
                        field
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Secret storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider: "file" or "keychain"
    pub provider: Option<String>,
}

impl SecretsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if provider != "file" && provider != "keychain" {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be 'file' or 'keychain'",
                    provider
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_example() {
        let toml = r#"
            lock_timeout_secs = 60

            [source]
            path = "/var/sync/internal"
            branch = "master"

            [destination]
            path = "/var/sync/github"
            branch = "main"

            [lfs]
            enabled = true
            side = "destination"
            organization = "myorg"
            project = "myproj"

            [secrets]
            provider = "file"
        "#;
        let file: ConfigFile = toml::from_str(toml).unwrap();
        file.validate().unwrap();

        assert_eq!(file.lock_timeout_secs, Some(60));
        assert_eq!(
            file.section(Side::Destination).unwrap().branch.as_deref(),
            Some("main")
        );
        let lfs = file.lfs.unwrap();
        assert_eq!(lfs.side, Some(Side::Destination));
        assert_eq!(lfs.project.as_deref(), Some("myproj"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str("bogus = 1");
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let file = ConfigFile {
            lock_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn invalid_branch_rejected() {
        let file = ConfigFile {
            source: Some(SideSection {
                branch: Some("-rf".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn enabled_lfs_requires_project() {
        let file = ConfigFile {
            lfs: Some(LfsSection {
                enabled: Some(true),
                organization: Some("myorg".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("lfs.project"));
    }

    #[test]
    fn disabled_lfs_needs_nothing() {
        let file = ConfigFile {
            lfs: Some(LfsSection {
                enabled: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(file.validate().is_ok());
    }

    #[test]
    fn unknown_secrets_provider_rejected() {
        let file = ConfigFile {
            secrets: Some(SecretsConfig {
                provider: Some("vault".into()),
            }),
            ..Default::default()
        };
        assert!(file.validate().is_err());
    }
}
