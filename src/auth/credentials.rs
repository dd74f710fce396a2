//! auth::credentials

use std::fmt;

use super::CredentialError;

/// Forge credentials.
///
/// Construct with [`Credentials::access_token`] or
/// [`Credentials::user_password`]. The secret parts are only reachable
/// from inside the crate, when building a [`super::SecretUrl`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    secret: Secret,
}

#[derive(Clone, PartialEq, Eq)]
enum Secret {
    AccessToken(String),
    UserPassword { user: String, password: String },
}

impl Credentials {
    /// A bearer-style access token, sent as the URL username.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Invalid`] if the token is empty or contains
    /// whitespace.
    pub fn access_token(token: impl Into<String>) -> Result<Self, CredentialError> {
        let token = token.into();
        check_part("access token", &token)?;
        Ok(Self {
            secret: Secret::AccessToken(token),
        })
    }

    /// A username and password pair.
    ///
    /// # Errors
    ///
    /// [`CredentialError::Invalid`] if either part is empty or contains
    /// whitespace.
    pub fn user_password(
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let (user, password) = (user.into(), password.into());
        check_part("username", &user)?;
        check_part("password", &password)?;
        Ok(Self {
            secret: Secret::UserPassword { user, password },
        })
    }

    /// `"access-token"` or `"user-password"`, safe to log.
    pub fn kind(&self) -> &'static str {
        match &self.secret {
            Secret::AccessToken(_) => "access-token",
            Secret::UserPassword { .. } => "user-password",
        }
    }

    /// URL userinfo parts: `(username, password)`.
    pub(crate) fn userinfo(&self) -> (&str, Option<&str>) {
        match &self.secret {
            Secret::AccessToken(token) => (token, None),
            Secret::UserPassword { user, password } => (user, Some(password)),
        }
    }
}

fn check_part(what: &str, value: &str) -> Result<(), CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::Invalid(format!("{} is empty", what)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CredentialError::Invalid(format!(
            "{} contains whitespace or control characters",
            what
        )));
    }
    Ok(())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secret {
            Secret::AccessToken(_) => f
                .debug_tuple("Credentials::AccessToken")
                .field(&super::REDACTED)
                .finish(),
            // The username is not secret on its own but often is a token.
            Secret::UserPassword { .. } => f
                .debug_struct("Credentials::UserPassword")
                .field("user", &super::REDACTED)
                .field("password", &super::REDACTED)
                .finish(),
        }
    }
}
