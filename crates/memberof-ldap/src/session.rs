//! A bound directory session and the scoped search it offers.

use crate::client::{LdapEntry, LdapSession};
use std::fmt;
use crate::negotiate::{BindMechanism, ServerAddress};
use crate::Result;
use tracing::{debug, info};

/// An authenticated session, scoped to the configured base DN.
///
/// Created by [`crate::ConnectionNegotiator::connect`]; release it with
/// [`BoundSession::close`].
pub struct BoundSession {
    inner: Box<dyn LdapSession>,
    base_dn: String,
    server: ServerAddress,
    mechanism: BindMechanism,
    identity: String,
}

impl fmt::Debug for BoundSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSession")
            .field("base_dn", &self.base_dn)
            .field("server", &self.server)
            .field("mechanism", &self.mechanism)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl BoundSession {
    pub(crate) fn new(
        inner: Box<dyn LdapSession>,
        base_dn: impl Into<String>,
        server: ServerAddress,
        mechanism: BindMechanism,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            base_dn: base_dn.into(),
            server,
            mechanism,
            identity: identity.into(),
        }
    }

    /// Search root used for every query.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Server the session is connected to.
    #[must_use]
    pub const fn server(&self) -> &ServerAddress {
        &self.server
    }

    /// Mechanism the session was bound with.
    #[must_use]
    pub const fn mechanism(&self) -> BindMechanism {
        self.mechanism
    }

    /// Identity the session was bound as.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Runs a subtree search under the base DN.
    ///
    /// The filter is passed to the server as given. No matches yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`memberof_core::Error::SearchFailed`] if the server rejects the filter or the
    /// session is no longer usable.
    pub async fn search(
        &mut self,
        filter: &str,
        attributes: &[&'static str],
    ) -> Result<Vec<LdapEntry>> {
        debug!(base_dn = %self.base_dn, filter, ?attributes, "directory search");
        let entries = self
            .inner
            .search(&self.base_dn, filter, attributes)
            .await?;
        debug!(filter, count = entries.len(), "directory search returned");
        Ok(entries)
    }

    /// Unbinds and releases the session.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the unbind could not be sent.
    pub async fn close(mut self) -> Result<()> {
        self.inner.unbind().await?;
        info!(server = %self.server, "directory session closed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::MockLdapSession;
    use memberof_core::Error;

    pub(crate) fn session_over(mock: MockLdapSession) -> BoundSession {
        BoundSession::new(
            Box::new(mock),
            "DC=example,DC=com",
            ServerAddress::parse("ldap://dc1.example.com").unwrap(),
            BindMechanism::Simple,
            "reader@example.com",
        )
    }

    #[tokio::test]
    async fn search_is_scoped_to_base_dn() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .withf(|base, filter, attributes| {
                base == "DC=example,DC=com"
                    && filter == "(cn=x)"
                    && attributes == ["memberOf"]
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![LdapEntry::new("CN=x,DC=example,DC=com")]));

        let mut session = session_over(mock);
        let entries = session.search("(cn=x)", &["memberOf"]).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(session.mechanism(), BindMechanism::Simple);
    }

    #[tokio::test]
    async fn no_matches_is_empty_not_error() {
        let mut mock = MockLdapSession::new();
        mock.expect_search().returning(|_, _, _| Ok(Vec::new()));

        let mut session = session_over(mock);
        assert!(session.search("(cn=none)", &["cn"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_filter_propagates() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .returning(|_, _, _| Err(Error::SearchFailed("filter parse error".to_string())));

        let mut session = session_over(mock);
        let err = session.search("(cn=", &["cn"]).await.unwrap_err();
        assert!(matches!(err, Error::SearchFailed(_)));
    }

    #[test]
    fn debug_omits_transport() {
        let rendered = format!("{:?}", session_over(MockLdapSession::new()));
        assert!(rendered.contains("reader@example.com"));
        assert!(rendered.contains("Simple"));
    }

    #[tokio::test]
    async fn close_unbinds() {
        let mut mock = MockLdapSession::new();
        mock.expect_unbind().times(1).returning(|| Ok(()));
        session_over(mock).close().await.unwrap();
    }
}
