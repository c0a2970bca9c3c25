//! Credential collection for the command-line entry points.

use std::sync::Arc;

use dialoguer::{Input, Password};
use memberof_core::{CredentialPrompt, Error, FixedCredentials, Result};
use secrecy::SecretString;

/// Environment key holding a bind password for non-interactive runs.
pub const BIND_PASSWORD: &str = "BIND_PASSWORD";

/// Interactive terminal prompt.
///
/// The password is read without echo. The username prompt defaults to the login name of
/// the current OS user.
#[derive(Debug, Default)]
pub struct TerminalPrompt {
    default_username: Option<String>,
}

impl TerminalPrompt {
    /// Creates a prompt whose username default is the current OS user.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_username: os_username(|key| std::env::var(key).ok()),
        }
    }
}

impl CredentialPrompt for TerminalPrompt {
    fn password(&self) -> Result<SecretString> {
        Password::new()
            .with_prompt("Bind password")
            .interact()
            .map(SecretString::from)
            .map_err(|e| Error::PromptFailed(format!("failed to read password: {e}")))
    }

    fn username(&self) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt("Bind username");
        if let Some(default) = &self.default_username {
            input = input.default(default.clone());
        }
        input
            .interact_text()
            .map(|name| name.trim().to_string())
            .map_err(|e| Error::PromptFailed(format!("failed to read username: {e}")))
    }
}

/// Login name of the current OS user, from `USER` or `USERNAME`.
pub fn os_username<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    ["USER", "USERNAME"]
        .into_iter()
        .filter_map(lookup)
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

/// Picks the credential source: fixed credentials when [`BIND_PASSWORD`] is set, otherwise
/// the interactive terminal prompt.
pub fn credentials_from_lookup<F>(lookup: F) -> Arc<dyn CredentialPrompt>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(BIND_PASSWORD).filter(|value| !value.is_empty()) {
        Some(password) => {
            let mut fixed = FixedCredentials::new(SecretString::from(password));
            if let Some(username) = os_username(&lookup) {
                fixed = fixed.with_username(username);
            }
            Arc::new(fixed)
        }
        None => Arc::new(TerminalPrompt::new()),
    }
}

/// [`credentials_from_lookup`] over the process environment.
#[must_use]
pub fn credentials_from_env() -> Arc<dyn CredentialPrompt> {
    credentials_from_lookup(|key| std::env::var(key).ok())
}
