//! Configuration for directory access.
//!
//! [`DirectoryConfig`] is built once at startup (usually from the environment and an optional
//! `.env` file) and handed to the directory client by value. Lower layers never read the
//! environment themselves.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Environment keys understood by [`DirectoryConfig::from_env`].
pub mod keys {
    /// Search root for every query (required).
    pub const BASE_DN: &str = "BASE_DN";
    /// DNS domain used for server discovery and principal names.
    pub const DOMAIN: &str = "DOMAIN";
    /// Explicit server address (`ldap://` or `ldaps://`).
    pub const LDAP_SERVER: &str = "LDAP_SERVER";
    /// Explicit full bind DN.
    pub const BIND_USER_DN: &str = "BIND_USER_DN";
    /// Explicit bind user principal name.
    pub const BIND_USER_UPN: &str = "BIND_USER_UPN";
    /// DN suffix appended to an interactively entered username.
    pub const BIND_USER_DN_SUFFIX: &str = "BIND_USER_DN_SUFFIX";
    /// Opt-in switch that disables TLS certificate validation.
    pub const LDAP_TLS_INSECURE: &str = "LDAP_TLS_INSECURE";
    /// PEM CA bundle used to validate the server certificate.
    pub const LDAP_TLS_CA_CERT: &str = "LDAP_TLS_CA_CERT";
    /// Connection timeout in seconds.
    pub const LDAP_CONNECT_TIMEOUT_SECS: &str = "LDAP_CONNECT_TIMEOUT_SECS";
    /// Per-operation timeout in seconds.
    pub const LDAP_OPERATION_TIMEOUT_SECS: &str = "LDAP_OPERATION_TIMEOUT_SECS";
    /// Deadline for a whole membership resolution in seconds.
    pub const LDAP_RESOLUTION_TIMEOUT_SECS: &str = "LDAP_RESOLUTION_TIMEOUT_SECS";
}

/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;
/// Default deadline for one resolution call (seconds).
pub const DEFAULT_RESOLUTION_TIMEOUT_SECS: u64 = 300;

/// Configuration for a directory session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DirectoryConfig {
    /// Subtree root under which every search is scoped
    #[validate(length(min = 1))]
    pub base_dn: String,

    /// DNS domain, used for discovery and `<user>@<domain>` principal names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Explicit server address, skips discovery when set
    #[validate(url)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Explicit full bind DN
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Explicit bind user principal name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_upn: Option<String>,

    /// DN suffix for interactive usernames (`CN=<user>,<suffix>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn_suffix: Option<String>,

    /// Accept any server certificate on encrypted transports
    #[serde(default)]
    pub tls_insecure: bool,

    /// Optional path to a custom CA certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca_cert: Option<PathBuf>,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Bind/search/unbind timeout in seconds
    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Deadline for one whole resolution in seconds
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_resolution_timeout_secs")]
    pub resolution_timeout_secs: u64,
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

const fn default_resolution_timeout_secs() -> u64 {
    DEFAULT_RESOLUTION_TIMEOUT_SECS
}

impl DirectoryConfig {
    /// Create a configuration with the required base DN and defaults for everything else.
    ///
    /// The result still needs a domain or a server address before it passes
    /// [`DirectoryConfig::ensure_valid`].
    #[must_use]
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            domain: None,
            server_url: None,
            bind_dn: None,
            bind_upn: None,
            bind_dn_suffix: None,
            tls_insecure: false,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            resolution_timeout_secs: DEFAULT_RESOLUTION_TIMEOUT_SECS,
        }
    }

    /// Load configuration from a `.env` file (if present) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if required keys are missing or values are invalid.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if required keys are missing or values are invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_dn = get(keys::BASE_DN)
            .ok_or_else(|| Error::ConfigError(format!("{} must be set", keys::BASE_DN)))?;

        let mut config = Self::new(base_dn);
        config.domain = get(keys::DOMAIN);
        config.server_url = get(keys::LDAP_SERVER);
        config.bind_dn = get(keys::BIND_USER_DN);
        config.bind_upn = get(keys::BIND_USER_UPN);
        config.bind_dn_suffix = get(keys::BIND_USER_DN_SUFFIX);
        config.tls_ca_cert = get(keys::LDAP_TLS_CA_CERT).map(PathBuf::from);

        if let Some(raw) = get(keys::LDAP_TLS_INSECURE) {
            config.tls_insecure = parse_bool(keys::LDAP_TLS_INSECURE, &raw)?;
        }
        if let Some(raw) = get(keys::LDAP_CONNECT_TIMEOUT_SECS) {
            config.connection_timeout_secs = parse_secs(keys::LDAP_CONNECT_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = get(keys::LDAP_OPERATION_TIMEOUT_SECS) {
            config.operation_timeout_secs = parse_secs(keys::LDAP_OPERATION_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = get(keys::LDAP_RESOLUTION_TIMEOUT_SECS) {
            config.resolution_timeout_secs =
                parse_secs(keys::LDAP_RESOLUTION_TIMEOUT_SECS, &raw)?;
        }

        config.ensure_valid()?;
        Ok(config)
    }

    /// Check required fields, ranges and the server address scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first problem found.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.base_dn.trim().is_empty() {
            return Err(Error::ConfigError(format!("{} must be set", keys::BASE_DN)));
        }
        if self.domain.is_none() && self.server_url.is_none() {
            return Err(Error::ConfigError(format!(
                "either {} or {} must be set",
                keys::DOMAIN,
                keys::LDAP_SERVER
            )));
        }

        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;

        if let Some(server) = &self.server_url {
            let url = Url::parse(server)?;
            if !matches!(url.scheme(), "ldap" | "ldaps") {
                return Err(Error::ConfigError(format!(
                    "{} must use ldap:// or ldaps://, got `{server}`",
                    keys::LDAP_SERVER
                )));
            }
        }

        Ok(())
    }

    /// Set the discovery domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set an explicit server address.
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set an explicit bind DN.
    #[must_use]
    pub fn with_bind_dn(mut self, dn: impl Into<String>) -> Self {
        self.bind_dn = Some(dn.into());
        self
    }

    /// Set an explicit bind user principal name.
    #[must_use]
    pub fn with_bind_upn(mut self, upn: impl Into<String>) -> Self {
        self.bind_upn = Some(upn.into());
        self
    }

    /// Set the DN suffix used for interactively entered usernames.
    #[must_use]
    pub fn with_bind_dn_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.bind_dn_suffix = Some(suffix.into());
        self
    }

    /// Opt in to accepting any TLS certificate.
    #[must_use]
    pub const fn with_tls_insecure(mut self, insecure: bool) -> Self {
        self.tls_insecure = insecure;
        self
    }

    /// Set custom CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Set the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Set the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// Set the resolution deadline in seconds.
    #[must_use]
    pub const fn with_resolution_timeout_secs(mut self, seconds: u64) -> Self {
        self.resolution_timeout_secs = seconds;
        self
    }

    /// Get the connection timeout as a Duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the operation timeout as a Duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Get the resolution deadline as a Duration.
    #[must_use]
    pub const fn resolution_timeout(&self) -> Duration {
        Duration::from_secs(self.resolution_timeout_secs)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "{key} must be a boolean, got `{raw}`"
        ))),
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|_| {
        Error::ConfigError(format!("{key} must be a number of seconds, got `{raw}`"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_minimal() {
        let config = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("DOMAIN", "example.com"),
        ]))
        .unwrap();

        assert_eq!(config.base_dn, "DC=example,DC=com");
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert!(config.server_url.is_none());
        assert!(!config.tls_insecure);
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_base_dn() {
        let err = DirectoryConfig::from_lookup(lookup(&[("DOMAIN", "example.com")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("BASE_DN")));
    }

    #[test]
    fn test_empty_base_dn_is_missing() {
        let err = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "  "),
            ("DOMAIN", "example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_missing_domain_and_server() {
        let err =
            DirectoryConfig::from_lookup(lookup(&[("BASE_DN", "DC=example,DC=com")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("DOMAIN")));
    }

    #[test]
    fn test_server_without_domain_is_accepted() {
        let config = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("LDAP_SERVER", "ldaps://dc1.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.server_url.as_deref(), Some("ldaps://dc1.example.com"));
    }

    #[test]
    fn test_rejects_non_ldap_scheme() {
        let err = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("LDAP_SERVER", "https://dc1.example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("ldaps://")));
    }

    #[test]
    fn test_optional_keys_and_overrides() {
        let config = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("DOMAIN", "example.com"),
            ("BIND_USER_UPN", "svc@example.com"),
            ("BIND_USER_DN_SUFFIX", "OU=Users,DC=example,DC=com"),
            ("LDAP_TLS_INSECURE", "yes"),
            ("LDAP_CONNECT_TIMEOUT_SECS", "5"),
            ("LDAP_RESOLUTION_TIMEOUT_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.bind_upn.as_deref(), Some("svc@example.com"));
        assert_eq!(
            config.bind_dn_suffix.as_deref(),
            Some("OU=Users,DC=example,DC=com")
        );
        assert!(config.tls_insecure);
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
        assert_eq!(config.resolution_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_bool_and_number() {
        let err = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("DOMAIN", "example.com"),
            ("LDAP_TLS_INSECURE", "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("LDAP_TLS_INSECURE")));

        let err = DirectoryConfig::from_lookup(lookup(&[
            ("BASE_DN", "DC=example,DC=com"),
            ("DOMAIN", "example.com"),
            ("LDAP_OPERATION_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("LDAP_OPERATION_TIMEOUT_SECS")));
    }

    #[test]
    fn test_timeout_range_validation() {
        let mut config = DirectoryConfig::new("DC=example,DC=com").with_domain("example.com");
        assert!(config.ensure_valid().is_ok());

        config.operation_timeout_secs = 0;
        assert!(config.ensure_valid().is_err());

        config.operation_timeout_secs = 30;
        config.resolution_timeout_secs = 3601;
        assert!(config.ensure_valid().is_err());
    }

    #[test]
    fn test_builder() {
        let config = DirectoryConfig::new("DC=example,DC=com")
            .with_server_url("ldap://10.0.0.5")
            .with_bind_dn("CN=svc,OU=Service,DC=example,DC=com")
            .with_tls_insecure(true)
            .with_operation_timeout_secs(12);

        assert_eq!(config.server_url.as_deref(), Some("ldap://10.0.0.5"));
        assert_eq!(
            config.bind_dn.as_deref(),
            Some("CN=svc,OU=Service,DC=example,DC=com")
        );
        assert!(config.tls_insecure);
        assert_eq!(config.operation_timeout(), Duration::from_secs(12));
        assert!(config.ensure_valid().is_ok());
    }
}
