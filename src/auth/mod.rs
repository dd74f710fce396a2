//! auth
//!
//! Forge credentials and credential-bearing URLs.
//!
//! # Architecture
//!
//! - [`Credentials`]: an access token or a username/password pair. The
//!   value is opaque: `Debug` redacts it and there is no `Display`.
//! - [`CredentialProvider`]: looks up credentials for an
//!   organization/project pair. [`SecretStoreCredentials`] reads them from
//!   a [`crate::secrets::SecretStore`]; [`StaticCredentials`] hands out a
//!   fixed value.
//! - [`SecretUrl`]: a URL with credentials in its userinfo. Only
//!   [`SecretUrl::expose_secret`] returns the real string; `Display`,
//!   `Debug` and error messages use the redacted form.
//!
//! # Security
//!
//! Credential values never reach logs, error messages or readable names.
//!
//! # Example
//!
//! ```
//! use shipsync::auth::{auth_https_remote_url, Credentials};
//!
//! let creds = Credentials::access_token("s3cr3t").unwrap();
//! let url = auth_https_remote_url("https://github.com/acme/widget.git/info/lfs", &creds).unwrap();
//!
//! assert_eq!(url.expose_secret(), "https://s3cr3t@github.com/acme/widget.git/info/lfs");
//! assert_eq!(url.to_string(), "https://***@github.com/acme/widget.git/info/lfs");
//! assert!(!format!("{:?}", creds).contains("s3cr3t"));
//! ```

mod credentials;
mod provider;
mod secret_url;

pub use credentials::Credentials;
pub use provider::{scope_prefix, CredentialProvider, SecretStoreCredentials, StaticCredentials};
pub use secret_url::{auth_https_remote_url, SecretUrl, REDACTED};

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors from credential lookup and URL construction.
///
/// Never contains a credential value.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential is stored for the project.
    #[error("no credentials for {organization}/{project} (tried: {tried})")]
    NotFound {
        organization: String,
        project: String,
        /// Secret keys consulted, comma-separated
        tried: String,
    },

    /// A credential was found but is unusable (e.g. empty).
    #[error("invalid credentials: {0}")]
    Invalid(String),

    /// The URL cannot carry credentials.
    #[error("cannot embed credentials in URL: {0}")]
    InvalidUrl(String),

    /// The secret store failed.
    #[error(transparent)]
    Store(#[from] SecretError),
}
