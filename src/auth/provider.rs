//! auth::provider
//!
//! Credential lookup for forge projects.
//!
//! # Secret keys
//!
//! [`SecretStoreCredentials`] tries the most specific key first:
//!
//! | Key                          | Scope              |
//! |------------------------------|--------------------|
//! | `forge.<org>/<project>.token`| one project        |
//! | `forge.<org>.token`          | one organization   |
//! | `forge.token`                | every project      |
//!
//! If the same prefix also has a `.user` entry, the pair is used as
//! username/password; otherwise the value is an access token.

use std::fmt;
use std::sync::Arc;

use super::{CredentialError, Credentials};
use crate::secrets::SecretStore;

/// Supplies forge credentials for a project.
pub trait CredentialProvider: Send + Sync {
    /// Credentials authorized to push to `organization/project`.
    fn credentials_for_project(
        &self,
        organization: &str,
        project: &str,
    ) -> Result<Credentials, CredentialError>;
}

/// Secret-key prefix for a credential scope.
///
/// A project without an organization has no scope of its own and maps to
/// the global prefix.
pub fn scope_prefix(organization: Option<&str>, project: Option<&str>) -> String {
    match (organization, project) {
        (Some(org), Some(project)) => format!("forge.{}/{}", org, project),
        (Some(org), None) => format!("forge.{}", org),
        (None, _) => "forge".to_string(),
    }
}

/// Always returns the same credentials.
#[derive(Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials_for_project(&self, _: &str, _: &str) -> Result<Credentials, CredentialError> {
        Ok(self.credentials.clone())
    }
}

/// Reads credentials from a [`SecretStore`].
#[derive(Clone)]
pub struct SecretStoreCredentials {
    store: Arc<dyn SecretStore>,
}

impl SecretStoreCredentials {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Key prefixes from most to least specific.
    pub fn prefixes(organization: &str, project: &str) -> Vec<String> {
        vec![
            scope_prefix(Some(organization), Some(project)),
            scope_prefix(Some(organization), None),
            scope_prefix(None, None),
        ]
    }
}

impl fmt::Debug for SecretStoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStoreCredentials").finish_non_exhaustive()
    }
}

impl CredentialProvider for SecretStoreCredentials {
    fn credentials_for_project(
        &self,
        organization: &str,
        project: &str,
    ) -> Result<Credentials, CredentialError> {
        let token_keys: Vec<String> = Self::prefixes(organization, project)
            .into_iter()
            .map(|prefix| format!("{}.token", prefix))
            .collect();

        let Some((key, secret)) = self.store.get_first(&token_keys)? else {
            return Err(CredentialError::NotFound {
                organization: organization.to_string(),
                project: project.to_string(),
                tried: token_keys.join(", "),
            });
        };

        let prefix = key.trim_end_matches(".token");
        let user_key = format!("{}.user", prefix);
        let credentials = match self.store.get(&user_key)? {
            Some(user) => Credentials::user_password(user, secret)?,
            None => Credentials::access_token(secret)?,
        };

        tracing::debug!(
            key = %key,
            kind = credentials.kind(),
            "resolved forge credentials"
        );
        Ok(credentials)
    }
}
