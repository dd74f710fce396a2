//! secrets::keychain_store
//!
//! OS keychain storage through `keyring` (macOS Keychain, Windows
//! Credential Manager, Secret Service on Linux). Entries are filed under
//! the service name `shipsync` with the secret key as the account.
//!
//! Without the `keychain` feature the type still exists but cannot be
//! constructed, so [`super::create_store`] reports a clear error.

use super::traits::{SecretError, SecretStore};

#[cfg(feature = "keychain")]
mod imp {
    use keyring::Entry;

    use super::{SecretError, SecretStore};

    /// Service name for keychain entries.
    pub const SERVICE: &str = "shipsync";

    /// Keychain-backed secret store.
    #[derive(Debug, Clone)]
    pub struct KeychainSecretStore {
        service: String,
    }

    impl KeychainSecretStore {
        pub fn new() -> Result<Self, SecretError> {
            Ok(Self::with_service(SERVICE))
        }

        /// Store under a custom service name, to isolate test entries.
        pub fn with_service(service: impl Into<String>) -> Self {
            Self {
                service: service.into(),
            }
        }

        pub fn service(&self) -> &str {
            &self.service
        }

        fn entry(&self, key: &str) -> Result<Entry, SecretError> {
            Entry::new(&self.service, key)
                .map_err(|e| SecretError::Read(format!("keychain entry '{}': {}", key, e)))
        }
    }

    impl SecretStore for KeychainSecretStore {
        fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
            match self.entry(key)?.get_password() {
                Ok(value) => Ok(Some(value)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(SecretError::Read(format!("keychain entry '{}': {}", key, e))),
            }
        }

        fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
            self.entry(key)?
                .set_password(value)
                .map_err(|e| SecretError::Write(format!("keychain entry '{}': {}", key, e)))
        }

        fn delete(&self, key: &str) -> Result<(), SecretError> {
            match self.entry(key)?.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(SecretError::Write(format!("keychain entry '{}': {}", key, e))),
            }
        }
    }
}

#[cfg(not(feature = "keychain"))]
mod imp {
    use super::{SecretError, SecretStore};

    const DISABLED: &str = "keychain support not enabled (build with --features keychain)";

    /// Placeholder for builds without the `keychain` feature.
    #[derive(Debug)]
    pub struct KeychainSecretStore {
        _private: (),
    }

    impl KeychainSecretStore {
        /// Always fails in this build.
        pub fn new() -> Result<Self, SecretError> {
            Err(SecretError::ProviderNotAvailable(DISABLED.into()))
        }
    }

    impl SecretStore for KeychainSecretStore {
        fn get(&self, _key: &str) -> Result<Option<String>, SecretError> {
            Err(SecretError::ProviderNotAvailable(DISABLED.into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), SecretError> {
            Err(SecretError::ProviderNotAvailable(DISABLED.into()))
        }

        fn delete(&self, _key: &str) -> Result<(), SecretError> {
            Err(SecretError::ProviderNotAvailable(DISABLED.into()))
        }
    }
}

pub use imp::KeychainSecretStore;
#[cfg(feature = "keychain")]
pub use imp::SERVICE;
