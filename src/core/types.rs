//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Side`] - Which end of a sync run a repository plays
//! - [`BranchName`] - Validated, backend-neutral branch name
//! - [`ChangesetId`] - Opaque commit identifier (Git SHA or Mercurial node)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use shipsync::core::types::{BranchName, ChangesetId, Side};
//!
//! let branch = BranchName::new("main").unwrap();
//! let id = ChangesetId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(Side::Source.to_string(), "source");
//!
//! assert!(BranchName::new("").is_err());
//! assert!(ChangesetId::new("not-a-sha").is_err());
//! # let _ = (branch, id);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid changeset id: {0}")]
    InvalidChangesetId(String),

    #[error("invalid side '{0}' (valid: source, destination)")]
    InvalidSide(String),
}

/// The logical role a repository plays in one synchronization run.
///
/// This is a closed set. Every `match` on `Side` in this crate is
/// exhaustive without a wildcard arm, so adding a variant fails to compile
/// until every call site handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The repository changes are read from (usually internal).
    Source,
    /// The repository changes are written to (usually external).
    Destination,
}

impl Side {
    /// All sides, in pipeline order.
    pub const ALL: [Side; 2] = [Side::Source, Side::Destination];

    /// Lowercase name used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Destination => "destination",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "src" => Ok(Side::Source),
            "destination" | "dest" | "dst" => Ok(Side::Destination),
            other => Err(TypeError::InvalidSide(other.to_string())),
        }
    }
}

/// A validated branch name.
///
/// Git and Mercurial disagree on what a branch name may contain (Mercurial
/// allows spaces, Git does not), so only rules shared by both are enforced
/// here. Backend-specific checks happen when a repository is opened.
///
/// - Cannot be empty or only whitespace
/// - Cannot start with `-` (would be read as a flag by the VCS CLIs)
/// - Cannot contain ASCII control characters
///
/// # Example
///
/// ```
/// use shipsync::core::types::BranchName;
///
/// let name = BranchName::new("release/1.x").unwrap();
/// assert_eq!(name.as_str(), "release/1.x");
///
/// assert!(BranchName::new("   ").is_err());
/// assert!(BranchName::new("--force").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name is empty, starts
    /// with `-`, or contains control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.trim().is_empty() {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot be empty".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot start with '-'".into(),
            ));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidBranchName(
                "branch name cannot contain control characters".into(),
            ));
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque changeset identifier.
///
/// Git commit SHAs and Mercurial node hashes are both hex strings of 40
/// (SHA-1) or 64 (SHA-256) characters. IDs are normalized to lowercase.
///
/// # Example
///
/// ```
/// use shipsync::core::types::ChangesetId;
///
/// let id = ChangesetId::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(id.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(id.short(12), "abc123def456");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangesetId(String);

impl ChangesetId {
    /// Create a new validated changeset id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidChangesetId` if the string is not 40 or 64
    /// hex characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into().trim().to_ascii_lowercase();
        if id.len() != 40 && id.len() != 64 {
            return Err(TypeError::InvalidChangesetId(format!(
                "expected 40 or 64 hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidChangesetId(
                "changeset id must be hexadecimal".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Abbreviated form: the first `len` characters.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChangesetId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ChangesetId> for String {
    fn from(id: ChangesetId) -> Self {
        id.0
    }
}

impl AsRef<str> for ChangesetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
