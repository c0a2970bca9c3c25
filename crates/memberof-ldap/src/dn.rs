//! Distinguished name helpers.
//!
//! The directory layer treats DNs as opaque identifiers. These helpers cover the few places
//! where structure matters: checking that configured DNs are well formed, building a bind DN
//! from a username and a suffix, and comparing DNs as identities.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use memberof_core::error::Error as CoreError;

/// Errors that can occur when checking a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component was not of the form `attribute=value`.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}

/// Case-insensitive identity of a directory entry.
///
/// Servers are free to vary the case of attribute types and values when they hand back a DN,
/// so membership bookkeeping compares DNs through this key rather than as raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DnKey(String);

impl DnKey {
    /// Builds the key for a distinguished name.
    #[must_use]
    pub fn new(dn: &str) -> Self {
        Self(dn.trim().to_lowercase())
    }

    /// Borrows the normalised key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks that `input` is a comma-separated list of `attribute=value` components.
///
/// # Errors
///
/// Returns [`DistinguishedNameError`] if the DN is empty or a component is malformed.
pub fn validate_dn(input: &str) -> Result<(), DistinguishedNameError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(DistinguishedNameError::Empty);
    }

    for component in split_escaped(raw, ',')? {
        let Some((attribute, value)) = component.split_once('=') else {
            return Err(DistinguishedNameError::InvalidComponent(component));
        };
        if attribute.trim().is_empty() || value.trim().is_empty() {
            return Err(DistinguishedNameError::InvalidComponent(component));
        }
    }

    Ok(())
}

/// Builds `CN=<username>,<suffix>` for an interactively entered username.
///
/// # Errors
///
/// Returns [`DistinguishedNameError`] if the suffix is not a well-formed DN.
pub fn compose_bind_dn(username: &str, suffix: &str) -> Result<String, DistinguishedNameError> {
    validate_dn(suffix)?;
    Ok(format!(
        "CN={},{}",
        escape_rdn_value(username.trim()),
        suffix.trim()
    ))
}

/// Escapes a value for use inside a relative distinguished name.
#[must_use]
pub fn escape_rdn_value(value: &str) -> String {
    let count = value.chars().count();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in value.chars().enumerate() {
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (idx == 0 && (ch == ' ' || ch == '#'))
            || (idx + 1 == count && ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    escaped
}

fn split_escaped(input: &str, delimiter: char) -> Result<Vec<String>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            current.push(ch);
            escape = true;
            continue;
        }

        if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
            continue;
        }

        current.push(ch);
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if let Some(empty) = parts.iter().find(|part| part.is_empty()) {
        return Err(DistinguishedNameError::InvalidComponent(empty.clone()));
    }
    Ok(parts)
}
