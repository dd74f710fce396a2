//! core::tempdir
//!
//! Scoped scratch directories for throwaway checkouts.
//!
//! A [`TempCheckout`] is removed when it goes out of scope, whichever way
//! the scope is left. Call [`TempCheckout::keep`] to leave it on disk, e.g.
//! when debugging a failed sync.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// An ephemeral directory deleted on drop.
#[derive(Debug)]
pub struct TempCheckout {
    dir: TempDir,
}

impl TempCheckout {
    /// Create a new directory under the system temp dir.
    ///
    /// `component` names the owner and shows up in the directory name
    /// (`shipsync_<component>_XXXXXX`).
    ///
    /// # Example
    ///
    /// ```
    /// use shipsync::core::tempdir::TempCheckout;
    ///
    /// let temp = TempCheckout::new("example").unwrap();
    /// let path = temp.path().to_path_buf();
    /// assert!(path.exists());
    /// drop(temp);
    /// assert!(!path.exists());
    /// ```
    pub fn new(component: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("shipsync_{}_", component))
            .tempdir()?;
        Ok(Self { dir })
    }

    /// Path to the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Keep the directory on disk and return its path.
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

impl AsRef<Path> for TempCheckout {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_contains_component() {
        let temp = TempCheckout::new("herp").unwrap();
        let name = temp.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("shipsync_herp_"));
    }

    #[test]
    fn removed_on_panic_unwind() {
        let path = std::panic::catch_unwind(|| {
            let temp = TempCheckout::new("unwind").unwrap();
            let path = temp.path().to_path_buf();
            std::fs::write(path.join("file"), "x").unwrap();
            std::panic::panic_any(path);
        })
        .unwrap_err()
        .downcast::<PathBuf>()
        .unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn keep_leaves_directory() {
        let temp = TempCheckout::new("keep").unwrap();
        let path = temp.keep();
        assert!(path.exists());
        std::fs::remove_dir_all(&path).unwrap();
    }
}
