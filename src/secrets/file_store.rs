//! secrets::file_store
//!
//! TOML-file secret storage at `~/.shipsync/secrets.toml`.
//!
//! The file is a flat table of quoted keys:
//!
//! ```toml
//! "forge.acme.token" = "..."
//! "forge.acme/widget.user" = "release-bot"
//! ```
//!
//! Writes go to a sibling temp file created with mode 0600, are synced,
//! then renamed over the original.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use super::traits::{SecretError, SecretStore};

/// Directory under `$HOME` holding shipsync state.
const STATE_DIR: &str = ".shipsync";
const FILE_NAME: &str = "secrets.toml";

/// File-backed secret store.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at `~/.shipsync/secrets.toml`.
    ///
    /// # Errors
    ///
    /// [`SecretError::Read`] if the home directory cannot be determined.
    pub fn new() -> Result<Self, SecretError> {
        let home = dirs::home_dir()
            .ok_or_else(|| SecretError::Read("cannot determine home directory".into()))?;
        Ok(Self::at(home.join(STATE_DIR).join(FILE_NAME)))
    }

    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SecretError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SecretError::Read(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        // toml's error display quotes the offending line, which may hold a
        // value; only the location is reported.
        toml::from_str(&content).map_err(|e| {
            let at = e
                .span()
                .map(|span| format!(" at byte {}", span.start))
                .unwrap_or_default();
            SecretError::Read(format!("{}: invalid TOML{}", self.path.display(), at))
        })
    }

    fn store(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        let write_err = |what: &str, e: std::io::Error| {
            SecretError::Write(format!("{} {}: {}", what, self.path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err("cannot create directory for", e))?;
        }

        let content = toml::to_string(secrets)
            .map_err(|e| SecretError::Write(format!("cannot serialize secrets: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&temp_path)
            .map_err(|e| write_err("cannot create temp file for", e))?;
        // `mode` only applies on creation; a leftover temp file keeps its bits.
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| write_err("cannot restrict permissions of", e))?;
        file.write_all(content.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| write_err("cannot write", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| write_err("cannot replace", e))
    }

    /// Whether the file is absent or readable only by its owner.
    #[cfg(unix)]
    pub fn has_private_permissions(&self) -> Result<bool, SecretError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.permissions().mode() & 0o077 == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(SecretError::Read(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        let mut secrets = self.load()?;
        Ok(secrets.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        secrets.insert(key.to_string(), value.to_string());
        self.store(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        if secrets.remove(key).is_none() {
            return Ok(());
        }
        self.store(&secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileSecretStore) {
        let temp = TempDir::new().unwrap();
        let store = FileSecretStore::at(temp.path().join("state").join("secrets.toml"));
        (temp, store)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_temp, store) = store();
        assert!(store.get("forge.token").unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn keys_with_dots_and_slashes_round_trip() {
        let (_temp, store) = store();
        store.set("forge.acme/widget.token", "t1").unwrap();
        store.set("forge.acme.token", "t2").unwrap();

        assert_eq!(store.get("forge.acme/widget.token").unwrap().as_deref(), Some("t1"));
        assert_eq!(store.get("forge.acme.token").unwrap().as_deref(), Some("t2"));
        assert!(store.get("forge.acme").unwrap().is_none());
    }

    #[test]
    fn persists_across_instances() {
        let (_temp, store) = store();
        store.set("k", "v").unwrap();

        let reopened = FileSecretStore::at(store.path());
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn delete_missing_key_does_not_create_file() {
        let (_temp, store) = store();
        store.delete("nothing").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn delete_removes_key() {
        let (_temp, store) = store();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.delete("a").unwrap();

        assert!(store.get("a").unwrap().is_none());
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn values_with_quotes_and_newlines() {
        let (_temp, store) = store();
        let value = "line \"one\"\nline = two";
        store.set("k", value).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(value));
    }

    #[test]
    fn parse_error_does_not_echo_content() {
        let (_temp, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "\"forge.token\" = \"hunter2").unwrap();

        let msg = store.get("forge.token").unwrap_err().to_string();
        assert!(msg.contains("invalid TOML"), "{}", msg);
        assert!(!msg.contains("hunter2"), "{}", msg);
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        let (_temp, store) = store();
        assert!(store.has_private_permissions().unwrap());

        store.set("k", "v").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(store.has_private_permissions().unwrap());
    }
}
