//! Bind credentials and the credential collaborator contract.
//!
//! The directory layer never prompts by itself. It asks a [`CredentialPrompt`] for a password
//! and, when no bind identity is configured, for a username. Interactive terminals, vaults and
//! fixed values all sit behind this trait.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};

/// Identity/password pair presented to the directory server.
#[derive(Debug)]
pub struct BindCredentials {
    identity: String,
    password: SecretString,
}

impl BindCredentials {
    /// Create new bind credentials.
    ///
    /// # Arguments
    ///
    /// * `identity` - Full DN, user principal name or `DOMAIN\user`
    /// * `password` - The bind password
    #[must_use]
    pub fn new(identity: impl Into<String>, password: SecretString) -> Self {
        Self {
            identity: identity.into(),
            password,
        }
    }

    /// Get the bind identity.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Get the bind password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Source of interactive (or otherwise out-of-band) credentials.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialPrompt: Send + Sync {
    /// Obtain the bind password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PromptFailed`] if no password can be obtained.
    fn password(&self) -> Result<SecretString>;

    /// Obtain a bind username.
    ///
    /// Only asked for when no bind DN or principal name is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PromptFailed`] if no username can be obtained.
    fn username(&self) -> Result<String>;
}

/// Credentials supplied up front, for non-interactive runs.
#[derive(Debug)]
pub struct FixedCredentials {
    username: Option<String>,
    password: SecretString,
}

impl FixedCredentials {
    /// Create fixed credentials with only a password.
    ///
    /// Username requests fail until [`FixedCredentials::with_username`] is used.
    #[must_use]
    pub fn new(password: SecretString) -> Self {
        Self {
            username: None,
            password,
        }
    }

    /// Set the username returned to username requests.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl CredentialPrompt for FixedCredentials {
    fn password(&self) -> Result<SecretString> {
        Ok(SecretString::from(self.password.expose_secret().to_string()))
    }

    fn username(&self) -> Result<String> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::PromptFailed("no bind username available".to_string()))
    }
}
