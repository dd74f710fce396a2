//! cli::commands::auth
//!
//! Store, inspect or remove forge credentials.
//!
//! # Keys
//!
//! Credentials live under a scope prefix (see [`scope_prefix`]):
//! `<prefix>.token` always, `<prefix>.user` for username/password pairs.
//! The LFS phase looks the most specific scope up first.
//!
//! The token value is never printed, logged or echoed back.
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for the token)
//! shipsync auth --org acme
//!
//! # Non-interactive
//! printf '%s\n' "$TOKEN" | shipsync auth --org acme --project widget
//!
//! shipsync auth --org acme --status
//! shipsync auth --org acme --logout
//! ```

use std::io::{self, BufRead, IsTerminal};

use anyhow::{bail, Context as _, Result};

use super::Context;
use crate::auth::{scope_prefix, Credentials};
use crate::secrets::SecretStore;
use crate::ui::output::{self, Verbosity};

/// Run the auth command.
pub fn auth(
    ctx: &Context,
    org: Option<&str>,
    project: Option<&str>,
    user: Option<&str>,
    token: Option<&str>,
    status: bool,
    logout: bool,
) -> Result<()> {
    let store = ctx.secret_store()?;
    let prefix = scope_prefix(org, project);

    if status {
        return show_status(store.as_ref(), &prefix, ctx.verbosity);
    }
    if logout {
        return do_logout(store.as_ref(), &prefix, ctx.verbosity);
    }

    let secret = read_secret(token, user.is_some(), ctx.verbosity)?;
    store_credentials(store.as_ref(), &prefix, user, &secret)?;

    tracing::info!(scope = %prefix, "credentials stored");
    output::print(format!("Credentials stored for {}.", prefix), ctx.verbosity);
    Ok(())
}

/// Validate and write one credential under `prefix`.
///
/// A stale `<prefix>.user` is removed when storing a bare token.
pub fn store_credentials(
    store: &dyn SecretStore,
    prefix: &str,
    user: Option<&str>,
    secret: &str,
) -> Result<()> {
    match user {
        Some(user) => Credentials::user_password(user, secret)?,
        None => Credentials::access_token(secret)?,
    };

    let token_key = format!("{}.token", prefix);
    let user_key = format!("{}.user", prefix);
    store
        .set(&token_key, secret)
        .context("Failed to store credentials")?;
    match user {
        Some(user) => store.set(&user_key, user),
        None => store.delete(&user_key),
    }
    .context("Failed to store credentials")?;
    Ok(())
}

fn show_status(store: &dyn SecretStore, prefix: &str, verbosity: Verbosity) -> Result<()> {
    let token = store.get(&format!("{}.token", prefix))?;
    let user = store.get(&format!("{}.user", prefix))?;

    if verbosity == Verbosity::Quiet {
        // Machine-readable
        println!("{}", if token.is_some() { "stored" } else { "missing" });
        return Ok(());
    }

    match (token, user) {
        (Some(_), Some(user)) => println!("{}: username/password for '{}'", prefix, user),
        (Some(_), None) => println!("{}: access token", prefix),
        (None, _) => {
            println!("{}: no credentials stored", prefix);
            println!("Run 'shipsync auth' to store some.");
        }
    }
    Ok(())
}

fn do_logout(store: &dyn SecretStore, prefix: &str, verbosity: Verbosity) -> Result<()> {
    for key in [format!("{}.token", prefix), format!("{}.user", prefix)] {
        store
            .delete(&key)
            .context("Failed to remove stored credentials")?;
    }
    output::print(format!("Credentials removed for {}.", prefix), verbosity);
    Ok(())
}

/// Token from `--token`, a masked prompt on a terminal, or one line of
/// stdin.
fn read_secret(arg: Option<&str>, password: bool, verbosity: Verbosity) -> Result<String> {
    if let Some(value) = arg {
        return Ok(value.to_string());
    }

    let value = if io::stdin().is_terminal() {
        if verbosity == Verbosity::Quiet {
            bail!("Token required. Use --token or pipe it on stdin.");
        }
        let label = if password { "Password: " } else { "Access token: " };
        rpassword::prompt_password(label).context("Failed to read token")?
    } else {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read token from stdin")?;
        line
    };

    let value = value.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("Token cannot be empty.");
    }
    Ok(value)
}
