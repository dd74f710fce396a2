//! secrets::traits
//!
//! The key-value interface every secret backend implements.
//!
//! Keys are dotted names such as `forge.acme/widget.token`. Stores treat
//! them as opaque strings.

use thiserror::Error;

/// Errors from secret storage.
///
/// Messages name keys and paths but never values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The backing store could not be read or parsed.
    #[error("failed to read secret store: {0}")]
    Read(String),

    /// The backing store could not be written.
    #[error("failed to write secret store: {0}")]
    Write(String),

    /// The requested provider is unknown or not compiled in.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Secret storage backend.
///
/// Implementations must be thread-safe and must never log or return
/// secret values in errors.
pub trait SecretStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    /// The first key in `keys` that has a value, with that value.
    fn get_first(&self, keys: &[String]) -> Result<Option<(String, String)>, SecretError> {
        for key in keys {
            if let Some(value) = self.get(key)? {
                return Ok(Some((key.clone(), value)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;

    #[test]
    fn get_first_walks_keys_in_order() {
        let store = MemorySecretStore::new();
        store.set("b", "2").unwrap();
        store.set("c", "3").unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            store.get_first(&keys).unwrap(),
            Some(("b".to_string(), "2".to_string()))
        );
    }

    #[test]
    fn get_first_none_when_all_missing() {
        let store = MemorySecretStore::new();
        assert!(store.get_first(&["x".to_string()]).unwrap().is_none());
    }

    #[test]
    fn error_display_mentions_operation() {
        assert!(SecretError::Read("bad toml".into())
            .to_string()
            .contains("read"));
        assert!(SecretError::Write("disk full".into())
            .to_string()
            .contains("write"));
        assert!(SecretError::ProviderNotAvailable("vault".into())
            .to_string()
            .contains("vault"));
    }
}
