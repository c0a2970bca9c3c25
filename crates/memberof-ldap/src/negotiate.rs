//! Connection negotiation: server address, bind identity and mechanism, bind.
//!
//! Every decision here is made once per run and never retried. In particular the mechanism is
//! chosen from the shape of the bind identity alone; a failed bind does not fall back to
//! another mechanism.

use crate::client::LdapConnector;
use crate::dn::{compose_bind_dn, validate_dn};
use crate::session::BoundSession;
use crate::Result;
use async_trait::async_trait;
use memberof_core::config::keys;
use memberof_core::{BindCredentials, CredentialPrompt, DirectoryConfig, Error};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Host prefixes probed, in order, before the bare domain.
pub const DISCOVERY_PREFIXES: &[&str] = &["dc", "dc1", "ad", "ldap"];

/// Port used for name resolution probes.
const LDAP_PORT: u16 = 389;

/// Remediation attached to NTLM bind failures caused by a missing MD4 digest.
pub const NTLM_CAPABILITY_HINT: &str = "NTLM authentication needs MD4 digest support, which this \
build does not provide. Rebuild with the `ntlm` feature, or bind with a full DN or a user \
principal name (user@domain) to use simple bind. This is not a credentials problem.";

/// Candidate hostnames for a domain, in probe order.
///
/// `dc.<domain>`, `dc1.<domain>`, `ad.<domain>`, `ldap.<domain>`, then `<domain>` itself. The
/// order is a best-effort heuristic; nothing guarantees the first name that resolves is a
/// directory server.
#[must_use]
pub fn discovery_candidates(domain: &str) -> Vec<String> {
    let domain = domain.trim().trim_end_matches('.');
    DISCOVERY_PREFIXES
        .iter()
        .map(|prefix| format!("{prefix}.{domain}"))
        .chain(std::iter::once(domain.to_string()))
        .collect()
}

/// Address of a directory server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    url: String,
    secure: bool,
}

impl ServerAddress {
    /// Parses an `ldap://` or `ldaps://` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for unparsable addresses or other schemes.
    pub fn parse(address: &str) -> Result<Self> {
        let url = Url::parse(address.trim())?;
        let secure = match url.scheme() {
            "ldaps" => true,
            "ldap" => false,
            other => {
                return Err(Error::ConfigError(format!(
                    "unsupported directory scheme `{other}` in `{address}`"
                )))
            }
        };
        if url.host_str().is_none() {
            return Err(Error::ConfigError(format!(
                "directory address `{address}` has no host"
            )));
        }
        Ok(Self {
            url: address.trim().to_string(),
            secure,
        })
    }

    /// Plain `ldap://` address for a discovered host.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        Self {
            url: format!("ldap://{host}"),
            secure: false,
        }
    }

    /// Address as a URL string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true if the address asks for an encrypted transport.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Authentication mechanism used to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BindMechanism {
    /// LDAP simple bind (DN or user principal name plus password).
    Simple,
    /// NTLM, for `DOMAIN\user` identities.
    Ntlm,
}

impl BindMechanism {
    /// Selects the mechanism from the shape of the bind identity.
    ///
    /// A `\` without any `@` selects NTLM; everything else uses simple bind. Identities with
    /// both separators are ambiguous and fall to simple bind.
    #[must_use]
    pub fn for_identity(identity: &str) -> Self {
        if identity.contains('\\') && !identity.contains('@') {
            Self::Ntlm
        } else {
            Self::Simple
        }
    }

    /// Mechanism name as used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Ntlm => "NTLM",
        }
    }
}

impl fmt::Display for BindMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait HostResolver: Send + Sync {
    async fn resolves(&self, host: &str) -> bool;
}

/// Resolver backed by the platform's name resolution.
pub(crate) struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolves(&self, host: &str) -> bool {
        match tokio::net::lookup_host((host, LDAP_PORT)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(err) => {
                debug!(host, "name resolution failed: {err}");
                false
            }
        }
    }
}

/// Produces one bound session from the run configuration.
pub struct ConnectionNegotiator {
    config: Arc<DirectoryConfig>,
    connector: Box<dyn LdapConnector>,
    resolver: Box<dyn HostResolver>,
    prompt: Arc<dyn CredentialPrompt>,
}

impl ConnectionNegotiator {
    pub(crate) fn new(
        config: Arc<DirectoryConfig>,
        connector: Box<dyn LdapConnector>,
        resolver: Box<dyn HostResolver>,
        prompt: Arc<dyn CredentialPrompt>,
    ) -> Self {
        Self {
            config,
            connector,
            resolver,
            prompt,
        }
    }

    /// Resolves the server address: the configured one, or the first discovery candidate
    /// whose name resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryFailed`] if no candidate resolves, or
    /// [`Error::ConfigError`] if neither an address nor a domain is configured.
    pub async fn resolve_address(&self) -> Result<ServerAddress> {
        if let Some(url) = &self.config.server_url {
            return ServerAddress::parse(url);
        }

        let domain = self.config.domain.as_deref().ok_or_else(|| {
            Error::ConfigError(format!(
                "either {} or {} must be set",
                keys::DOMAIN,
                keys::LDAP_SERVER
            ))
        })?;

        for host in discovery_candidates(domain) {
            debug!(host = %host, "probing discovery candidate");
            if self.resolver.resolves(&host).await {
                info!(host = %host, "discovered directory server");
                return Ok(ServerAddress::for_host(&host));
            }
        }

        Err(Error::DiscoveryFailed(format!(
            "could not discover a directory server for {domain}; set {}",
            keys::LDAP_SERVER
        )))
    }

    /// Resolves the bind identity: configured DN, configured principal name, or a prompted
    /// username turned into `CN=<user>,<suffix>` or `<user>@<domain>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PromptFailed`] if the username prompt fails, or
    /// [`Error::ConfigError`] if no suffix or domain is available to build the identity.
    pub fn resolve_bind_identity(&self) -> Result<String> {
        if let Some(dn) = &self.config.bind_dn {
            return Ok(dn.clone());
        }
        if let Some(upn) = &self.config.bind_upn {
            return Ok(upn.clone());
        }

        let username = self.prompt.username()?;
        if let Some(suffix) = &self.config.bind_dn_suffix {
            return Ok(compose_bind_dn(&username, suffix)?);
        }

        match &self.config.domain {
            Some(domain) => Ok(format!("{username}@{domain}")),
            None => Err(Error::ConfigError(format!(
                "{} is needed to build a principal name; set {}, {} or {}",
                keys::DOMAIN,
                keys::BIND_USER_DN,
                keys::BIND_USER_UPN,
                keys::BIND_USER_DN_SUFFIX
            ))),
        }
    }

    /// Establishes one bound session.
    ///
    /// # Errors
    ///
    /// Returns configuration, discovery, connection or bind errors. Bind errors caused by a
    /// missing NTLM capability carry [`NTLM_CAPABILITY_HINT`].
    pub async fn connect(&self) -> Result<BoundSession> {
        validate_dn(&self.config.base_dn)?;
        let address = self.resolve_address().await?;
        info!(server = %address, "connecting to directory");

        let password = self.prompt.password()?;
        let credentials = BindCredentials::new(self.resolve_bind_identity()?, password);
        let mechanism = BindMechanism::for_identity(credentials.identity());

        let mut session = self.connector.connect(&address).await?;
        let bound = match mechanism {
            BindMechanism::Simple => {
                session
                    .simple_bind(credentials.identity(), credentials.password())
                    .await
            }
            BindMechanism::Ntlm => {
                session
                    .ntlm_bind(credentials.identity(), credentials.password())
                    .await
            }
        };

        if let Err(err) = bound {
            if let Err(unbind_err) = session.unbind().await {
                debug!("unbind after failed bind: {unbind_err}");
            }
            warn!(%mechanism, identity = credentials.identity(), "bind failed: {err}");
            return Err(bind_error(mechanism, credentials.identity(), &err));
        }

        info!(
            server = %address,
            %mechanism,
            identity = credentials.identity(),
            "bound to directory"
        );
        Ok(BoundSession::new(
            session,
            self.config.base_dn.clone(),
            address,
            mechanism,
            credentials.identity(),
        ))
    }
}

fn bind_error(mechanism: BindMechanism, identity: &str, cause: &Error) -> Error {
    let message = match cause {
        Error::Ldap(msg) | Error::Unsupported(msg) => msg.clone(),
        other => other.to_string(),
    };
    let missing_capability = matches!(cause, Error::Unsupported(_))
        || message.to_ascii_uppercase().contains("MD4");
    let hint = (mechanism == BindMechanism::Ntlm && missing_capability)
        .then(|| NTLM_CAPABILITY_HINT.to_string());

    Error::BindFailed {
        mechanism: mechanism.to_string(),
        identity: identity.to_string(),
        message,
        hint,
    }
}
