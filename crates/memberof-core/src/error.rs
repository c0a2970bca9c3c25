//! Error types for directory operations.
//!
//! Every failure the directory-access layer can produce maps onto one variant here. Inner
//! layers propagate these untouched; only the connection negotiator adds context (the bind
//! remediation hint).

use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No candidate directory server could be resolved
    #[error("Server discovery failed: {0}")]
    DiscoveryFailed(String),

    /// The directory server could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication against the directory failed
    #[error("{mechanism} bind as `{identity}` failed: {message}")]
    BindFailed {
        /// Authentication mechanism that was attempted
        mechanism: String,
        /// Bind identity that was presented
        identity: String,
        /// Underlying cause
        message: String,
        /// Remediation hint when the failure points at a missing capability
        hint: Option<String>,
    },

    /// A search was rejected or the session is no longer usable
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// The requested group or user does not exist
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of entry that was looked up (`Group`, `User`)
        kind: String,
        /// Name that was looked up
        name: String,
    },

    /// Operation timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Malformed request input such as a blank group or user name
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The credential collaborator failed to supply a value
    #[error("Credential prompt failed: {0}")]
    PromptFailed(String),

    /// A capability was not compiled into this build
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Low-level LDAP protocol or transport error
    #[error("LDAP error: {0}")]
    Ldap(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a [`Error::NotFound`] for the given entry kind and name.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::DiscoveryFailed(_) => "DISCOVERY_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::BindFailed { .. } => "BIND_FAILED",
            Self::SearchFailed(_) => "SEARCH_FAILED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Timeout(_) => "TIMEOUT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::PromptFailed(_) => "PROMPT_FAILED",
            Self::Unsupported(_) => "UNSUPPORTED",
            Self::Ldap(_) => "LDAP_ERROR",
        }
    }

    /// Returns the remediation hint attached to a bind failure, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::BindFailed { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// Returns true for the expected "entry absent" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::SearchFailed(_) | Self::Ldap(_) | Self::Timeout(_)
        )
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid server address: {err}"))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
