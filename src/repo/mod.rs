//! repo
//!
//! Backend-agnostic repository access.
//!
//! # Architecture
//!
//! Pipeline code never names a concrete VCS. It talks to two traits:
//!
//! - [`Backend`] opens a checkout: it acquires the side's [`SharedLock`],
//!   validates the checkout and branch, and returns a [`RepoHandle`]
//! - [`Repository`] is the capability surface of an open checkout:
//!   head changeset, per-changeset diffs, and LFS push
//!
//! [`VcsBackend`] is the production opener; it detects Git (`.git`) or
//! Mercurial (`.hg`) and dispatches to [`git::GitRepo`] or
//! [`hg::HgRepo`]. Tests substitute [`mock::MockBackend`].
//!
//! # Handle Lifecycle
//!
//! ```text
//! Closed --open()--> Open --(head_changeset / diffs / push_lfs)*--> Released
//! ```
//!
//! The lock is taken before the checkout is inspected and released exactly
//! once when the handle is dropped or [`RepoHandle::release`] is called,
//! including when validation fails half-way through `open`.
//!
//! # Example
//!
//! ```ignore
//! use shipsync::repo::{self, VcsBackend, Backend};
//!
//! let side = config.side(Side::Destination);
//! let handle = VcsBackend.open(side.lock(), side.path(), side.branch())?;
//! if let Some(head) = handle.head_changeset()? {
//!     for diff in head.diffs() {
//!         println!("{} {}", diff.kind.letter(), diff.path);
//!     }
//! }
//! // lock released when `handle` goes out of scope
//! ```

pub mod changeset;
pub mod git;
pub mod hg;
pub mod mock;

pub use changeset::{ChangeKind, Changeset, ChangesetBuilder, Diff};

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::auth::SecretUrl;
use crate::core::lock::{LockError, LockGuard, SharedLock};
use crate::core::types::{BranchName, ChangesetId};

/// Errors from repository operations.
///
/// Messages never contain credentials; endpoints are stored redacted.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The path is not a checkout of a supported VCS.
    #[error("not a repository: {path}")]
    NotARepo {
        /// The path that was inspected
        path: PathBuf,
    },

    /// The checkout exists but the branch does not.
    #[error("branch '{branch}' not found in {path}")]
    BranchNotFound {
        /// The checkout
        path: PathBuf,
        /// The missing branch
        branch: String,
    },

    /// The changeset id does not exist in this checkout.
    #[error("changeset not found: {id}")]
    ChangesetNotFound {
        /// The missing id
        id: String,
    },

    /// The checkout lock could not be taken.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// A VCS subprocess could not be run or exited non-zero.
    #[error("`{program} {args}` failed: {message}")]
    Command {
        /// Executable name
        program: String,
        /// Arguments, space-joined
        args: String,
        /// stderr or spawn error
        message: String,
    },

    /// Large-file transfer failed.
    #[error("LFS transfer via {endpoint} failed: {message}")]
    Transfer {
        /// Redacted endpoint
        endpoint: String,
        /// Redacted failure output
        message: String,
    },

    /// The backend cannot perform this operation.
    #[error("{operation} is not supported for {vcs} repositories")]
    Unsupported {
        /// Backend kind
        vcs: VcsKind,
        /// Operation name
        operation: &'static str,
    },

    /// A VCS printed something we could not parse.
    #[error("unexpected {vcs} output: {message}")]
    InvalidOutput {
        /// Backend kind
        vcs: VcsKind,
        /// What was wrong
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Git {
        /// The error message
        message: String,
    },
}

impl From<git2::Error> for RepoError {
    fn from(err: git2::Error) -> Self {
        RepoError::Git {
            message: err.message().to_string(),
        }
    }
}

/// Supported version-control systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Mercurial,
}

impl VcsKind {
    /// Detect the VCS of a checkout from its metadata directory.
    ///
    /// Returns `None` if the path holds neither `.git` nor `.hg`.
    pub fn detect(path: &Path) -> Option<Self> {
        if path.join(".git").exists() {
            Some(VcsKind::Git)
        } else if path.join(".hg").is_dir() {
            Some(VcsKind::Mercurial)
        } else {
            None
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => f.write_str("git"),
            VcsKind::Mercurial => f.write_str("hg"),
        }
    }
}

/// Capabilities of an open checkout.
///
/// Every implementation must report identical paths for equivalent
/// history, and must return `Ok(None)` rather than an error for a
/// repository with no commits.
pub trait Repository: Send {
    /// Which VCS backs this checkout.
    fn kind(&self) -> VcsKind;

    /// The changeset at the tip of the configured branch, or `None` if the
    /// repository has no commits yet.
    fn head_changeset(&self) -> Result<Option<Changeset>, RepoError>;

    /// File changes introduced by a changeset, sorted by path.
    fn diffs(&self, id: &ChangesetId) -> Result<Vec<Diff>, RepoError>;

    /// Fetch large-file objects referenced by the checkout from `pull` and
    /// upload them to `push`.
    ///
    /// Pointer files in the working copy are never rewritten, so a failed
    /// transfer leaves the checkout as it was.
    fn push_lfs(&self, pull: &str, push: &SecretUrl) -> Result<(), RepoError>;
}

/// Opens checkouts.
pub trait Backend: Send + Sync {
    /// Open a checkout without taking any lock.
    ///
    /// Validates that `path` is a checkout and that `branch` exists (or is
    /// the unborn default branch of an empty repository).
    fn open_unlocked(
        &self,
        path: &Path,
        branch: &BranchName,
    ) -> Result<Box<dyn Repository>, RepoError>;

    /// Acquire `lock`, then open the checkout.
    ///
    /// If validation fails the lock is released before the error is
    /// returned.
    fn open(
        &self,
        lock: &SharedLock,
        path: &Path,
        branch: &BranchName,
    ) -> Result<RepoHandle, RepoError> {
        let guard = lock.acquire()?;
        let repo = self.open_unlocked(path, branch)?;
        Ok(RepoHandle::new(repo, guard, path, branch))
    }
}

/// The production backend: detects Git or Mercurial from the checkout.
#[derive(Debug, Clone, Copy, Default)]
pub struct VcsBackend;

impl Backend for VcsBackend {
    fn open_unlocked(
        &self,
        path: &Path,
        branch: &BranchName,
    ) -> Result<Box<dyn Repository>, RepoError> {
        match VcsKind::detect(path) {
            Some(VcsKind::Git) => Ok(Box::new(git::GitRepo::open(path, branch)?)),
            Some(VcsKind::Mercurial) => Ok(Box::new(hg::HgRepo::open(path, branch)?)),
            None => Err(RepoError::NotARepo {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Open a checkout with the production backend.
pub fn open(lock: &SharedLock, path: &Path, branch: &BranchName) -> Result<RepoHandle, RepoError> {
    VcsBackend.open(lock, path, branch)
}

/// An open checkout holding its side's lock.
///
/// Operations run in the order they are called; nothing is batched.
pub struct RepoHandle {
    // Declared before `guard` so the repository is dropped while the lock
    // is still held.
    repo: Box<dyn Repository>,
    guard: LockGuard,
    path: PathBuf,
    branch: BranchName,
}

impl fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoHandle")
            .field("kind", &self.repo.kind())
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("locked", &self.guard.is_held())
            .finish()
    }
}

impl RepoHandle {
    /// Wrap an opened repository and the guard protecting it.
    pub fn new(repo: Box<dyn Repository>, guard: LockGuard, path: &Path, branch: &BranchName) -> Self {
        tracing::debug!(
            vcs = %repo.kind(),
            path = %path.display(),
            branch = %branch,
            "repository opened"
        );
        Self {
            repo,
            guard,
            path: path.to_path_buf(),
            branch: branch.clone(),
        }
    }

    /// Which VCS backs this checkout.
    pub fn kind(&self) -> VcsKind {
        self.repo.kind()
    }

    /// Checkout path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Branch the handle was opened on.
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    /// Whether the handle still holds its lock.
    pub fn is_locked(&self) -> bool {
        self.guard.is_held()
    }

    /// See [`Repository::head_changeset`].
    pub fn head_changeset(&self) -> Result<Option<Changeset>, RepoError> {
        self.repo.head_changeset()
    }

    /// See [`Repository::diffs`].
    pub fn diffs(&self, id: &ChangesetId) -> Result<Vec<Diff>, RepoError> {
        self.repo.diffs(id)
    }

    /// See [`Repository::push_lfs`].
    pub fn push_lfs(&self, pull: &str, push: &SecretUrl) -> Result<(), RepoError> {
        tracing::info!(
            vcs = %self.repo.kind(),
            path = %self.path.display(),
            pull = pull,
            push = %push,
            "pushing LFS objects"
        );
        self.repo.push_lfs(pull, push)
    }

    /// Close the handle and release the lock now.
    pub fn release(self) -> Result<(), RepoError> {
        let RepoHandle {
            repo, mut guard, ..
        } = self;
        drop(repo);
        guard.release()?;
        Ok(())
    }
}

/// Space-join arguments for error messages.
pub(crate) fn join_args(args: &[&str]) -> String {
    args.join(" ")
}
