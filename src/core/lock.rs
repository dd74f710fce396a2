//! core::lock
//!
//! Exclusive per-checkout lock shared by every phase of a run.
//!
//! # Architecture
//!
//! Each side of a sync run owns one [`SharedLock`], configured once when the
//! [`Config`](crate::core::config::Config) is built. Phases never create
//! locks of their own; they borrow the side's lock and acquire it for the
//! duration of one repository handle.
//!
//! The lock file lives next to the checkout, never inside it:
//!
//! - `/var/sync/internal` → `/var/sync/.internal.shipsync-lock`
//!
//! # Invariants
//!
//! - A single acquisition mode: exclusive
//! - Acquisition blocks, polling until the configured timeout expires
//! - The lock is released when the [`LockGuard`] is dropped (RAII pattern)
//! - Locks are OS-level (`fs2`), so they serialize separate processes too
//!
//! # Example
//!
//! ```ignore
//! use shipsync::core::lock::SharedLock;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let lock = SharedLock::for_checkout(Path::new("/var/sync/internal"), Duration::from_secs(30));
//! let guard = lock.acquire()?;
//!
//! // Mutate the checkout while holding the guard
//! // ...
//!
//! drop(guard);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// Default timeout for lock acquisition (30 seconds).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Polling interval when waiting for the lock (100ms).
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Suffix of the lock file created beside a checkout.
const LOCK_SUFFIX: &str = "shipsync-lock";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock was still held by someone else when the timeout expired.
    #[error("timed out after {waited:?} waiting for lock {path}")]
    Timeout {
        /// The lock file
        path: PathBuf,
        /// How long we waited
        waited: Duration,
    },

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// A lock scoped to one side's on-disk checkout.
///
/// `SharedLock` is only a description of *where* the lock lives and how
/// long to wait for it. Holding the lock is represented by [`LockGuard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLock {
    /// Path to the lock file.
    path: PathBuf,
    /// Maximum time `acquire` waits.
    timeout: Duration,
}

impl SharedLock {
    /// Create a lock at an explicit lock-file path.
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Create the lock for a checkout directory.
    ///
    /// # Example
    ///
    /// ```
    /// use shipsync::core::lock::{SharedLock, DEFAULT_LOCK_TIMEOUT};
    /// use std::path::{Path, PathBuf};
    ///
    /// let lock = SharedLock::for_checkout(Path::new("/var/sync/internal"), DEFAULT_LOCK_TIMEOUT);
    /// assert_eq!(lock.path(), PathBuf::from("/var/sync/.internal.shipsync-lock"));
    /// ```
    pub fn for_checkout(checkout: &Path, timeout: Duration) -> Self {
        Self::new(Self::lock_path_for(checkout), timeout)
    }

    /// Compute the lock file path for a checkout directory.
    pub fn lock_path_for(checkout: &Path) -> PathBuf {
        let name = checkout
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkout".to_string());
        let parent = checkout.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!(".{}.{}", name, LOCK_SUFFIX))
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maximum time [`acquire`](Self::acquire) waits.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock, blocking until it is free or the timeout expires.
    ///
    /// # Errors
    ///
    /// - [`LockError::Timeout`] if another holder kept the lock too long
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails
    pub fn acquire(&self) -> Result<LockGuard, LockError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        loop {
            if let Some(guard) = self.try_acquire()? {
                tracing::debug!(lock = %self.path.display(), "lock acquired");
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    path: self.path.clone(),
                    waited: started.elapsed(),
                });
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        }
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` if someone else holds it.
    pub fn try_acquire(&self) -> Result<Option<LockGuard>, LockError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", self.path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockGuard {
                path: self.path.clone(),
                file: Some(file),
            })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Proof that a [`SharedLock`] is held.
///
/// The lock is released when this guard is dropped, including on early
/// returns and panics.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl LockGuard {
    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly. Calling this more than once is a no-op.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
            tracing::debug!(lock = %self.path.display(), "lock released");
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Best-effort release on drop
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
