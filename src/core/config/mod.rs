//! core::config
//!
//! Per-run configuration and the side resolver.
//!
//! # Overview
//!
//! A [`Config`] is built once per pipeline run and handed to every phase by
//! shared reference. It owns, for each [`Side`], the checkout path, the
//! branch and the [`SharedLock`] guarding that checkout. Phases may acquire
//! the lock but cannot change paths or branches.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (see [`schema`] for locations)
//! 3. Command-line overrides ([`Overrides`])
//!
//! # Example
//!
//! ```no_run
//! use shipsync::core::config::{Config, Overrides};
//! use shipsync::core::types::Side;
//!
//! let config = Config::load(None, &Overrides::default()).unwrap();
//! let dest = config.side(Side::Destination);
//! println!("{} @ {}", dest.path().display(), dest.branch());
//! ```

pub mod schema;

pub use schema::{ConfigFile, LfsSection, SecretsConfig, SideSection};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::lock::{SharedLock, DEFAULT_LOCK_TIMEOUT};
use crate::core::types::{BranchName, Side};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SHIPSYNC_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("no config file found (pass --config or set SHIPSYNC_CONFIG)")]
    NotFound,

    #[error("missing required setting: {0}")]
    MissingValue(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Everything a phase needs to know about one side's checkout.
#[derive(Debug)]
pub struct SideConfig {
    path: PathBuf,
    branch: BranchName,
    lock: SharedLock,
}

impl SideConfig {
    /// Create a side with the default lock beside the checkout.
    pub fn new(path: impl Into<PathBuf>, branch: BranchName) -> Self {
        Self::with_timeout(path, branch, DEFAULT_LOCK_TIMEOUT)
    }

    /// Create a side with the default lock location and a custom timeout.
    pub fn with_timeout(path: impl Into<PathBuf>, branch: BranchName, timeout: Duration) -> Self {
        let path = path.into();
        let lock = SharedLock::for_checkout(&path, timeout);
        Self { path, branch, lock }
    }

    /// Create a side with an explicit lock.
    pub fn with_lock(path: impl Into<PathBuf>, branch: BranchName, lock: SharedLock) -> Self {
        Self {
            path: path.into(),
            branch,
            lock,
        }
    }

    /// Local checkout path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Branch this side syncs.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Lock guarding the checkout.
    pub fn lock(&self) -> &SharedLock {
        &self.lock
    }
}

/// Resolved large-file sync settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsSettings {
    /// Whether the LFS phase starts enabled.
    pub enabled: bool,
    /// Side whose checkout is pushed.
    pub side: Side,
    /// Forge organization.
    pub organization: Option<String>,
    /// Forge project.
    pub project: Option<String>,
}

impl Default for LfsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            side: Side::Destination,
            organization: None,
            project: None,
        }
    }
}

/// Command-line overrides for the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source_path: Option<PathBuf>,
    pub source_branch: Option<String>,
    pub destination_path: Option<PathBuf>,
    pub destination_branch: Option<String>,
}

impl Overrides {
    fn path(&self, side: Side) -> Option<&PathBuf> {
        match side {
            Side::Source => self.source_path.as_ref(),
            Side::Destination => self.destination_path.as_ref(),
        }
    }

    fn branch(&self, side: Side) -> Option<&String> {
        match side {
            Side::Source => self.source_branch.as_ref(),
            Side::Destination => self.destination_branch.as_ref(),
        }
    }
}

/// The configuration shared by every phase of one run.
///
/// Not `Clone`; exactly one exists per run.
#[derive(Debug)]
pub struct Config {
    source: SideConfig,
    destination: SideConfig,
    lfs: LfsSettings,
    secrets_provider: String,
    file_path: Option<PathBuf>,
}

impl Config {
    /// Create a configuration from two sides, with default settings.
    pub fn new(source: SideConfig, destination: SideConfig) -> Self {
        Self {
            source,
            destination,
            lfs: LfsSettings::default(),
            secrets_provider: crate::secrets::DEFAULT_PROVIDER.to_string(),
            file_path: None,
        }
    }

    /// Replace the LFS settings.
    pub fn with_lfs(mut self, lfs: LfsSettings) -> Self {
        self.lfs = lfs;
        self
    }

    /// Resolve a side to its checkout, branch and lock.
    ///
    /// Total over [`Side`]; there is no error case.
    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    /// LFS settings.
    pub fn lfs(&self) -> &LfsSettings {
        &self.lfs
    }

    /// Secret store provider name.
    pub fn secrets_provider(&self) -> &str {
        &self.secrets_provider
    }

    /// The file this config was loaded from, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Locate, read and resolve the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if no config file exists
    /// - [`ConfigError::ParseError`] / [`ConfigError::InvalidValue`] for bad files
    /// - [`ConfigError::MissingValue`] if a side's path or branch is unset
    pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let path = Self::locate(explicit)?;
        let file = Self::read_file(&path)?;
        let mut config = Self::from_file(&file, overrides)?;
        config.file_path = Some(path);
        Ok(config)
    }

    /// Find the config file to use.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("shipsync/config.toml");
            if path.exists() {
                return Ok(path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".shipsync/config.toml");
            if path.exists() {
                return Ok(path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// Read and validate a config file.
    pub fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        file.validate()?;
        Ok(file)
    }

    /// Resolve a parsed file plus overrides into a run configuration.
    pub fn from_file(file: &ConfigFile, overrides: &Overrides) -> Result<Self, ConfigError> {
        let timeout = file
            .lock_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);

        let source = Self::resolve_side(file, overrides, Side::Source, timeout)?;
        let destination = Self::resolve_side(file, overrides, Side::Destination, timeout)?;

        let lfs = file
            .lfs
            .as_ref()
            .map(|section| LfsSettings {
                enabled: section.enabled.unwrap_or(false),
                side: section.side.unwrap_or(Side::Destination),
                organization: section.organization.clone(),
                project: section.project.clone(),
            })
            .unwrap_or_default();

        let secrets_provider = file
            .secrets
            .as_ref()
            .and_then(|s| s.provider.clone())
            .unwrap_or_else(|| crate::secrets::DEFAULT_PROVIDER.to_string());

        Ok(Self {
            source,
            destination,
            lfs,
            secrets_provider,
            file_path: None,
        })
    }

    fn resolve_side(
        file: &ConfigFile,
        overrides: &Overrides,
        side: Side,
        timeout: Duration,
    ) -> Result<SideConfig, ConfigError> {
        let section = file.section(side);

        let path = overrides
            .path(side)
            .cloned()
            .or_else(|| section.and_then(|s| s.path.clone()))
            .ok_or_else(|| ConfigError::MissingValue(format!("{}.path", side)))?;

        let branch = overrides
            .branch(side)
            .cloned()
            .or_else(|| section.and_then(|s| s.branch.clone()))
            .ok_or_else(|| ConfigError::MissingValue(format!("{}.branch", side)))?;
        let branch = BranchName::new(branch)
            .map_err(|e| ConfigError::InvalidValue(format!("{} branch: {}", side, e)))?;

        let lock = match section.and_then(|s| s.lock_file.clone()) {
            Some(lock_file) => SharedLock::new(lock_file, timeout),
            None => SharedLock::for_checkout(&path, timeout),
        };

        Ok(SideConfig::with_lock(path, branch, lock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    fn sample_file() -> ConfigFile {
        toml::from_str(
            r#"
            [source]
            path = "/work/internal"
            branch = "master"

            [destination]
            path = "/work/external"
            branch = "main"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn side_resolves_every_variant() {
        let config = Config::new(
            SideConfig::new("/a/src", branch("master")),
            SideConfig::new("/a/dst", branch("main")),
        );

        for side in Side::ALL {
            let resolved = config.side(side);
            assert!(!resolved.path().as_os_str().is_empty());
            assert!(!resolved.branch().as_str().is_empty());
            assert!(resolved.lock().path().ends_with(format!(
                ".{}.shipsync-lock",
                resolved.path().file_name().unwrap().to_string_lossy()
            )));
        }
    }

    #[test]
    fn sides_are_distinct() {
        let config = Config::new(
            SideConfig::new("/a/src", branch("master")),
            SideConfig::new("/a/dst", branch("main")),
        );
        assert_eq!(config.side(Side::Source).branch().as_str(), "master");
        assert_eq!(config.side(Side::Destination).branch().as_str(), "main");
        assert_ne!(
            config.side(Side::Source).lock(),
            config.side(Side::Destination).lock()
        );
    }

    #[test]
    fn from_file_resolves_sides() {
        let config = Config::from_file(&sample_file(), &Overrides::default()).unwrap();
        assert_eq!(
            config.side(Side::Source).path(),
            Path::new("/work/internal")
        );
        assert_eq!(config.side(Side::Destination).branch().as_str(), "main");
        assert_eq!(config.side(Side::Source).lock().timeout(), DEFAULT_LOCK_TIMEOUT);
        assert!(!config.lfs().enabled);
        assert_eq!(config.secrets_provider(), "file");
    }

    #[test]
    fn overrides_win() {
        let overrides = Overrides {
            destination_branch: Some("release".into()),
            source_path: Some(PathBuf::from("/elsewhere")),
            ..Default::default()
        };
        let config = Config::from_file(&sample_file(), &overrides).unwrap();
        assert_eq!(config.side(Side::Destination).branch().as_str(), "release");
        assert_eq!(config.side(Side::Source).path(), Path::new("/elsewhere"));
    }

    #[test]
    fn missing_branch_is_reported() {
        let file: ConfigFile = toml::from_str(
            r#"
            [source]
            path = "/work/internal"
            branch = "master"

            [destination]
            path = "/work/external"
            "#,
        )
        .unwrap();
        let err = Config::from_file(&file, &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue(ref v) if v == "destination.branch"));
    }

    #[test]
    fn explicit_lock_file_and_timeout() {
        let file: ConfigFile = toml::from_str(
            r#"
            lock_timeout_secs = 5

            [source]
            path = "/work/internal"
            branch = "master"
            lock_file = "/locks/internal"

            [destination]
            path = "/work/external"
            branch = "main"
            "#,
        )
        .unwrap();
        let config = Config::from_file(&file, &Overrides::default()).unwrap();
        let lock = config.side(Side::Source).lock();
        assert_eq!(lock.path(), Path::new("/locks/internal"));
        assert_eq!(lock.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn lfs_section_resolves_with_defaults() {
        let mut file = sample_file();
        file.lfs = Some(LfsSection {
            enabled: Some(true),
            side: None,
            organization: Some("myorg".into()),
            project: Some("myproj".into()),
        });
        let config = Config::from_file(&file, &Overrides::default()).unwrap();
        assert!(config.lfs().enabled);
        assert_eq!(config.lfs().side, Side::Destination);
        assert_eq!(config.lfs().organization.as_deref(), Some("myorg"));
    }

    #[test]
    fn load_reads_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[source]\npath = \"/s\"\nbranch = \"a\"\n[destination]\npath = \"/d\"\nbranch = \"b\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(config.file_path(), Some(path.as_path()));
        assert_eq!(config.side(Side::Destination).branch().as_str(), "b");
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[source\n").unwrap();

        let err = Config::load(Some(&path), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(&temp.path().join("nope.toml")), &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
