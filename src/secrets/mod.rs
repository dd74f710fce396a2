//! secrets
//!
//! Where forge credentials are kept.
//!
//! # Architecture
//!
//! Everything goes through the [`SecretStore`] trait:
//!
//! - [`FileSecretStore`]: `~/.shipsync/secrets.toml` (default)
//! - [`KeychainSecretStore`]: OS keychain, behind the `keychain` feature
//! - [`MemorySecretStore`]: process-local, for tests and embedding
//!
//! [`create_store`] maps the `[secrets] provider` setting to a store.
//!
//! # Security
//!
//! Values are never logged and never appear in error messages. The file
//! store writes atomically with mode 0600 on Unix.

mod file_store;
mod keychain_store;
mod memory_store;
mod traits;

pub use file_store::FileSecretStore;
pub use keychain_store::KeychainSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore};

/// Provider used when the configuration names none.
pub const DEFAULT_PROVIDER: &str = "file";

/// Every provider name [`create_store`] understands.
pub const PROVIDERS: &[&str] = &["file", "keychain"];

/// Create the secret store named by `provider`.
///
/// # Errors
///
/// [`SecretError::ProviderNotAvailable`] for an unknown name, or for
/// `"keychain"` when built without the `keychain` feature.
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    tracing::debug!(provider, "opening secret store");
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        "keychain" => Ok(Box::new(KeychainSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown provider '{}' (expected one of: {})",
            other,
            PROVIDERS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_lists_valid_names() {
        match create_store("vault") {
            Err(SecretError::ProviderNotAvailable(msg)) => {
                assert!(msg.contains("vault"));
                assert!(msg.contains("file, keychain"));
            }
            Err(e) => panic!("unexpected error: {:?}", e),
            Ok(_) => panic!("expected error"),
        }
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_needs_feature() {
        let err = create_store("keychain").err().expect("keychain must fail");
        assert!(err.to_string().contains("not enabled"));
    }

    #[test]
    fn default_provider_is_known() {
        assert!(PROVIDERS.contains(&DEFAULT_PROVIDER));
    }
}
