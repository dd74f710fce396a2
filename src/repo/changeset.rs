//! repo::changeset
//!
//! Backend-neutral commit and file-change model.
//!
//! # Invariants
//!
//! - [`Diff::path`] is repository-relative, `/`-separated, and never quoted
//!   or escaped. Whitespace and non-ASCII characters are kept verbatim, so
//!   Git and Mercurial produce the same string for the same file.
//! - A [`Changeset`] is immutable once built; backends construct it in one
//!   go and hand it out by value.
//! - Diffs inside a changeset are sorted by path, which makes the order
//!   identical across backends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::ChangesetId;

/// What happened to a file in a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Single-letter status as printed by `git status --short` / `hg status`.
    pub fn letter(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Modified => 'M',
            ChangeKind::Deleted => 'D',
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One file-level change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Repository-relative path
    pub path: String,
    /// Kind of change
    pub kind: ChangeKind,
    /// Unified diff body as emitted by the backend (hunks only, no header)
    pub body: String,
}

impl Diff {
    /// Create a diff entry.
    pub fn new(path: impl Into<String>, kind: ChangeKind, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            body: body.into(),
        }
    }
}

/// One commit, independent of the VCS it came from.
///
/// # Example
///
/// ```
/// use shipsync::core::types::ChangesetId;
/// use shipsync::repo::{ChangeKind, Changeset, Diff};
///
/// let changeset = Changeset::builder(ChangesetId::new("a".repeat(40)).unwrap())
///     .message("initial commit\n\nwith a body")
///     .diff(Diff::new("z.txt", ChangeKind::Added, ""))
///     .diff(Diff::new("foo bar/herp derp.txt", ChangeKind::Added, ""))
///     .build();
///
/// assert_eq!(changeset.subject(), "initial commit");
/// assert_eq!(changeset.paths(), vec!["foo bar/herp derp.txt", "z.txt"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    id: ChangesetId,
    author: String,
    timestamp: Option<DateTime<Utc>>,
    message: String,
    diffs: Vec<Diff>,
}

impl Changeset {
    /// Start building a changeset.
    pub fn builder(id: ChangesetId) -> ChangesetBuilder {
        ChangesetBuilder {
            id,
            author: String::new(),
            timestamp: None,
            message: String::new(),
            diffs: Vec::new(),
        }
    }

    /// Changeset identifier.
    pub fn id(&self) -> &ChangesetId {
        &self.id
    }

    /// Author in `Name <email>` form.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Commit timestamp, if the backend reported one.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Full commit message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// First line of the message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim_end()
    }

    /// File changes, sorted by path.
    pub fn diffs(&self) -> &[Diff] {
        &self.diffs
    }

    /// Paths touched by this changeset, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.diffs.iter().map(|d| d.path.as_str()).collect()
    }

    /// A changeset that touches no files (e.g. an empty merge).
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }
}

/// Builder for [`Changeset`].
#[derive(Debug)]
pub struct ChangesetBuilder {
    id: ChangesetId,
    author: String,
    timestamp: Option<DateTime<Utc>>,
    message: String,
    diffs: Vec<Diff>,
}

impl ChangesetBuilder {
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn diff(mut self, diff: Diff) -> Self {
        self.diffs.push(diff);
        self
    }

    pub fn diffs(mut self, diffs: impl IntoIterator<Item = Diff>) -> Self {
        self.diffs.extend(diffs);
        self
    }

    /// Finish the changeset. Diffs are sorted by path.
    pub fn build(mut self) -> Changeset {
        sort_diffs(&mut self.diffs);
        Changeset {
            id: self.id,
            author: self.author,
            timestamp: self.timestamp,
            message: self.message,
            diffs: self.diffs,
        }
    }
}

/// Sort diffs by path (byte order), the cross-backend ordering key.
pub fn sort_diffs(diffs: &mut [Diff]) {
    diffs.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
}

/// Strip a unified diff's file header, leaving only the hunks.
///
/// Git and Mercurial disagree on header lines (`diff --git`, `index`,
/// `new file mode`, `---`/`+++` quoting), so bodies are compared from the
/// first `@@` onward. Binary markers are kept.
pub fn hunks_only(raw: &str) -> String {
    let mut out = String::new();
    let mut in_hunks = false;
    for line in raw.split_inclusive('\n') {
        if !in_hunks {
            if line.starts_with("@@") {
                in_hunks = true;
            } else if line.starts_with("Binary files") || line.starts_with("GIT binary patch") {
                out.push_str(line);
                continue;
            } else {
                continue;
            }
        }
        out.push_str(line);
    }
    out
}
