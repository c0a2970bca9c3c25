//! Directory client and the LDAP transport behind it.

use crate::{
    group::GroupMembers,
    negotiate::{ConnectionNegotiator, ServerAddress, SystemResolver},
    resolver::MembershipResolver,
    session::BoundSession,
    user::UserGroups,
    Result,
};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use memberof_core::error::Error;
use memberof_core::{CredentialPrompt, DirectoryConfig};
use native_tls::{Certificate, TlsConnector};
use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// LDAP entry as returned by a search.
///
/// Attribute names are matched case-insensitively; values keep the order the server sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Creates an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds (or replaces) an attribute.
    #[must_use]
    pub fn with_attribute<I, S>(mut self, attribute: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.insert(
            attribute.to_ascii_lowercase(),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .first()
            .map(String::as_str)
    }

    /// Returns all values for the attribute (empty when absent).
    #[must_use]
    pub fn values(&self, attribute: &str) -> &[String] {
        self.attributes
            .get(&attribute.to_ascii_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// The entry DN, falling back to its `distinguishedName` attribute.
    #[must_use]
    pub fn distinguished_name(&self) -> &str {
        if self.dn.is_empty() {
            self.first("distinguishedName").unwrap_or_default()
        } else {
            &self.dn
        }
    }
}

impl From<SearchEntry> for LdapEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry
                .attrs
                .into_iter()
                .map(|(name, values)| (name.to_ascii_lowercase(), values))
                .collect(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn ntlm_bind(&mut self, identity: &str, password: &str) -> Result<()>;
    /// Subtree search under `base_dn`.
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn LdapSession>>;
}

/// Entry point for membership queries.
///
/// Each call negotiates one bound session, runs one resolution under the configured
/// deadline, and unbinds the session whatever the outcome.
pub struct DirectoryClient {
    config: Arc<DirectoryConfig>,
    negotiator: ConnectionNegotiator,
}

impl DirectoryClient {
    /// Creates a client that talks to a real directory server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the configuration is incomplete or invalid.
    pub fn new(config: DirectoryConfig, prompt: Arc<dyn CredentialPrompt>) -> Result<Self> {
        config.ensure_valid()?;
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(&config));
        let negotiator =
            ConnectionNegotiator::new(config.clone(), connector, Box::new(SystemResolver), prompt);
        Ok(Self { config, negotiator })
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_negotiator(config: DirectoryConfig, negotiator: ConnectionNegotiator) -> Self {
        Self {
            config: Arc::new(config),
            negotiator,
        }
    }

    /// Lists the direct user members of the group with the given common name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such group exists, or the connection, bind or search
    /// error that stopped the run.
    pub async fn group_members(&self, group_name: &str) -> Result<GroupMembers> {
        let mut session = self.negotiator.connect().await?;
        let mut resolver = MembershipResolver::new(&mut session);
        let outcome = self
            .within_deadline(resolver.group_members(group_name))
            .await;
        release(session, outcome).await
    }

    /// Computes the direct and nested groups of the user with the given account name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such user exists, or the connection, bind or search
    /// error that stopped the run. A failure mid-traversal aborts the whole resolution.
    pub async fn user_groups(&self, account_name: &str) -> Result<UserGroups> {
        let mut session = self.negotiator.connect().await?;
        let mut resolver = MembershipResolver::new(&mut session);
        let outcome = self
            .within_deadline(resolver.user_groups(account_name))
            .await;
        release(session, outcome).await
    }

    async fn within_deadline<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = self.config.resolution_timeout();
        timeout(deadline, fut).await.map_err(|_| {
            Error::Timeout(format!(
                "membership resolution exceeded {}s",
                deadline.as_secs()
            ))
        })?
    }
}

async fn release<T>(session: BoundSession, outcome: Result<T>) -> Result<T> {
    if let Err(err) = session.close().await {
        warn!("failed to unbind directory session: {err}");
    }
    outcome
}

#[derive(Debug, Clone)]
struct TlsOptions {
    insecure: bool,
    ca_cert: Option<PathBuf>,
}

/// Real LDAP connector backed by `ldap3`.
pub(crate) struct RealLdapConnector {
    tls: TlsOptions,
    connection_timeout: Duration,
    operation_timeout: Duration,
}

impl RealLdapConnector {
    pub(crate) fn new(config: &DirectoryConfig) -> Self {
        Self {
            tls: TlsOptions {
                insecure: config.tls_insecure,
                ca_cert: config.tls_ca_cert.clone(),
            },
            connection_timeout: config.connection_timeout(),
            operation_timeout: config.operation_timeout(),
        }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(address, &self.tls, self.connection_timeout)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, address.url())
            .await
            .map_err(|err| Error::ConnectionFailed(format!("{address}: {err}")))?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            operation_timeout: self.operation_timeout,
        }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        timeout(self.operation_timeout, self.inner.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
            .and_then(ldap3::LdapResult::success)
            .map_err(map_ldap_error)?;
        Ok(())
    }

    #[cfg(feature = "ntlm")]
    async fn ntlm_bind(&mut self, identity: &str, password: &str) -> Result<()> {
        timeout(
            self.operation_timeout,
            self.inner.sasl_ntlm_bind(identity, password),
        )
        .await
        .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
        .and_then(ldap3::LdapResult::success)
        .map_err(map_ldap_error)?;
        Ok(())
    }

    #[cfg(not(feature = "ntlm"))]
    async fn ntlm_bind(&mut self, _identity: &str, _password: &str) -> Result<()> {
        Err(Error::Unsupported(
            "NTLM bind (MD4 digest) is not compiled into this build".to_string(),
        ))
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        let result = timeout(
            self.operation_timeout,
            self.inner
                .search(base_dn, Scope::Subtree, filter, attributes.to_vec()),
        )
        .await
        .map_err(|_| Error::Timeout(format!("search `{filter}` timed out")))?
        .map_err(|err| Error::SearchFailed(format!("{filter}: {err}")))?;
        let (entries, _) = result
            .success()
            .map_err(|err| Error::SearchFailed(format!("{filter}: {err}")))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from)
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("directory unbind timed out".to_string()))?
            .map_err(map_ldap_error)?;
        Ok(())
    }
}

fn build_ldap_settings(
    address: &ServerAddress,
    tls: &TlsOptions,
    connection_timeout: Duration,
) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(connection_timeout);
    if !address.is_secure() {
        return Ok(settings);
    }

    if tls.insecure {
        warn!(
            server = %address,
            "TLS certificate validation disabled; any certificate will be accepted"
        );
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = &tls.ca_cert {
        debug!("loading directory CA certificate from {}", cert_path.display());
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::ConfigError(format!("failed to load CA certificate: {err}")))?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn map_ldap_error(err: ldap3::LdapError) -> Error {
    Error::Ldap(err.to_string())
}
