//! Group membership resolution over a bound session.

use std::collections::{HashSet, VecDeque};

use memberof_core::Error;
use tracing::{debug, info};

use crate::dn::DnKey;
use crate::filter::{
    entry_by_dn, group_by_name, user_by_account_name, users_in_group, GROUP_ATTRIBUTES,
    MEMBER_ATTRIBUTES, PARENT_ATTRIBUTES, USER_ATTRIBUTES,
};
use crate::group::{sort_group_refs, Group, GroupMembers, GroupRef};
use crate::session::BoundSession;
use crate::user::{Member, UserGroups, UserSummary};
use crate::Result;

/// Answers membership questions with the queries of one bound session.
///
/// Queries are issued one at a time. Any search failure aborts the resolution; no partial
/// result is returned.
pub struct MembershipResolver<'a> {
    session: &'a mut BoundSession,
}

impl<'a> MembershipResolver<'a> {
    /// Creates a resolver over an already bound session.
    pub fn new(session: &'a mut BoundSession) -> Self {
        Self { session }
    }

    /// Direct user members of the group whose common name is `group_name`.
    ///
    /// When several groups share the name, the first entry returned by the server wins.
    /// Members are sorted by account name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] without issuing the member query if the group does not
    /// exist, or the search error that stopped the run.
    pub async fn group_members(&mut self, group_name: &str) -> Result<GroupMembers> {
        let entries = self
            .session
            .search(&group_by_name(group_name), GROUP_ATTRIBUTES)
            .await?;
        let Some(entry) = entries.first() else {
            return Err(Error::not_found("Group", group_name));
        };
        if entries.len() > 1 {
            debug!(
                group = group_name,
                matches = entries.len(),
                "several groups share this name, using the first"
            );
        }
        let group = Group::from_entry(entry);

        let mut members: Vec<Member> = self
            .session
            .search(&users_in_group(&group.dn), MEMBER_ATTRIBUTES)
            .await?
            .iter()
            .map(Member::from_entry)
            .collect();
        members.sort_by_cached_key(|member| member.account_name.to_lowercase());

        info!(group = %group.dn, members = members.len(), "resolved group members");
        Ok(GroupMembers { group, members })
    }

    /// Direct and nested groups of the user whose account name is `account_name`.
    ///
    /// Direct groups come from the user's own `memberOf`. Nested groups are found by
    /// following `memberOf` upwards from each direct group until no new group appears; each
    /// group is expanded at most once, so cyclic nesting terminates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user does not exist, or the search error that
    /// stopped the traversal.
    pub async fn user_groups(&mut self, account_name: &str) -> Result<UserGroups> {
        let entries = self
            .session
            .search(&user_by_account_name(account_name), USER_ATTRIBUTES)
            .await?;
        let Some(entry) = entries.first() else {
            return Err(Error::not_found("User", account_name));
        };

        let user = UserSummary {
            dn: entry.distinguished_name().to_string(),
            account_name: account_name.to_string(),
            display_name: entry.first("displayName").map(str::to_owned),
        };

        let mut visited: HashSet<DnKey> = HashSet::new();
        let mut direct = Vec::new();
        for dn in entry.values("memberOf") {
            if visited.insert(DnKey::new(dn)) {
                direct.push(GroupRef::from_dn(dn));
            }
        }

        let nested = self.expand_parents(&direct, &mut visited).await?;

        let mut result = UserGroups {
            user,
            direct,
            nested,
        };
        sort_group_refs(&mut result.direct);
        sort_group_refs(&mut result.nested);

        info!(
            user = account_name,
            direct = result.direct.len(),
            nested = result.nested.len(),
            "resolved user groups"
        );
        Ok(result)
    }

    async fn expand_parents(
        &mut self,
        roots: &[GroupRef],
        visited: &mut HashSet<DnKey>,
    ) -> Result<Vec<GroupRef>> {
        let mut queue: VecDeque<String> = roots.iter().map(|group| group.dn.clone()).collect();
        let mut nested = Vec::new();

        while let Some(dn) = queue.pop_front() {
            let entries = self
                .session
                .search(&entry_by_dn(&dn), PARENT_ATTRIBUTES)
                .await?;
            let Some(entry) = entries.first() else {
                debug!(group = %dn, "group not visible under the base DN, not expanding");
                continue;
            };

            for parent in entry.values("memberOf") {
                if visited.insert(DnKey::new(parent)) {
                    debug!(group = %dn, parent = %parent, "found parent group");
                    nested.push(GroupRef::from_dn(parent));
                    queue.push_back(parent.clone());
                }
            }
        }

        Ok(nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LdapEntry, MockLdapSession};
    use crate::session::tests::session_over;
    use std::collections::HashMap;

    const SALES: &str = "CN=Sales,OU=Groups,DC=example,DC=com";
    const ALL_STAFF: &str = "CN=AllStaff,OU=Groups,DC=example,DC=com";
    const EVERYONE: &str = "CN=Everyone,OU=Groups,DC=example,DC=com";

    /// Mock session answering `(distinguishedName=...)` lookups from a parent table.
    ///
    /// Exactly `expansions` parent lookups must be issued.
    fn directory(
        user: LdapEntry,
        parents: &[(&str, &[&str])],
        expansions: usize,
    ) -> MockLdapSession {
        let table: HashMap<String, Vec<String>> = parents
            .iter()
            .map(|(dn, up)| {
                (
                    entry_by_dn(dn),
                    up.iter().map(|p| (*p).to_string()).collect(),
                )
            })
            .collect();

        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .withf(|_, filter, attributes| {
                filter.contains("sAMAccountName=") && attributes == USER_ATTRIBUTES
            })
            .times(1)
            .return_once(move |_, _, _| Ok(vec![user]));
        mock.expect_search()
            .withf(|_, filter, _| filter.starts_with("(distinguishedName="))
            .times(expansions)
            .returning(move |_, filter, _| {
                Ok(table
                    .get(filter)
                    .map(|up| {
                        vec![LdapEntry::new("").with_attribute("memberOf", up.clone())]
                    })
                    .unwrap_or_default())
            });
        mock
    }

    fn names(groups: &[GroupRef]) -> Vec<&str> {
        groups.iter().map(|g| g.common_name.as_str()).collect()
    }

    #[tokio::test]
    async fn members_sorted_case_insensitively() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .withf(|_, filter, _| filter == "(&(objectClass=group)(cn=Engineering))")
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![LdapEntry::new("CN=Engineering,OU=Groups,DC=example,DC=com")
                    .with_attribute("description", ["Builds things"])])
            });
        mock.expect_search()
            .withf(|_, filter, attributes| {
                filter
                    == "(&(objectClass=user)(memberOf=CN=Engineering,OU=Groups,DC=example,DC=com))"
                    && attributes == MEMBER_ATTRIBUTES
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    LdapEntry::new("CN=bob,OU=People,DC=example,DC=com")
                        .with_attribute("sAMAccountName", ["bob"])
                        .with_attribute("userAccountControl", ["514"]),
                    LdapEntry::new("CN=Alice,OU=People,DC=example,DC=com")
                        .with_attribute("sAMAccountName", ["Alice"])
                        .with_attribute("displayName", ["Alice A"])
                        .with_attribute("mail", ["alice@example.com"])
                        .with_attribute("userAccountControl", ["512"]),
                ])
            });

        let mut session = session_over(mock);
        let result = MembershipResolver::new(&mut session)
            .group_members("Engineering")
            .await
            .unwrap();

        assert_eq!(result.group.name, "Engineering");
        assert_eq!(result.group.description.as_deref(), Some("Builds things"));
        let accounts: Vec<_> = result.members.iter().map(|m| m.account_name.as_str()).collect();
        assert_eq!(accounts, ["Alice", "bob"]);
        assert!(result.members[0].is_enabled());
        assert!(!result.members[1].is_enabled());
        assert_eq!(result.members[1].mail_or_placeholder(), "No email");
    }

    #[tokio::test]
    async fn members_differing_only_by_case_keep_server_order() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .withf(|_, filter, _| filter.starts_with("(&(objectClass=group)"))
            .times(1)
            .returning(|_, _, _| Ok(vec![LdapEntry::new("CN=Team,OU=Groups,DC=example,DC=com")]));
        mock.expect_search()
            .withf(|_, filter, _| filter.starts_with("(&(objectClass=user)"))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    LdapEntry::new("CN=b,DC=example,DC=com").with_attribute("sAMAccountName", ["bob"]),
                    LdapEntry::new("CN=a1,DC=example,DC=com").with_attribute("sAMAccountName", ["alice"]),
                    LdapEntry::new("CN=a2,DC=example,DC=com").with_attribute("sAMAccountName", ["ALICE"]),
                    LdapEntry::new("CN=a3,DC=example,DC=com").with_attribute("sAMAccountName", ["Alice"]),
                ])
            });

        let mut session = session_over(mock);
        let result = MembershipResolver::new(&mut session)
            .group_members("Team")
            .await
            .unwrap();

        let dns: Vec<_> = result.members.iter().map(|m| m.dn.as_str()).collect();
        assert_eq!(
            dns,
            [
                "CN=a1,DC=example,DC=com",
                "CN=a2,DC=example,DC=com",
                "CN=a3,DC=example,DC=com",
                "CN=b,DC=example,DC=com"
            ]
        );
    }

    #[tokio::test]
    async fn missing_group_skips_member_query() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let mut session = session_over(mock);
        let err = MembershipResolver::new(&mut session)
            .group_members("NoSuchGroup")
            .await
            .unwrap_err();
        assert_eq!(err, Error::not_found("Group", "NoSuchGroup"));
    }

    #[tokio::test]
    async fn first_of_duplicate_groups_wins() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .withf(|_, filter, _| filter.starts_with("(&(objectClass=group)"))
            .returning(|_, _, _| {
                Ok(vec![
                    LdapEntry::new("CN=Ops,OU=East,DC=example,DC=com"),
                    LdapEntry::new("CN=Ops,OU=West,DC=example,DC=com"),
                ])
            });
        mock.expect_search()
            .withf(|_, filter, _| filter.contains("OU=East"))
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let mut session = session_over(mock);
        let result = MembershipResolver::new(&mut session)
            .group_members("Ops")
            .await
            .unwrap();
        assert_eq!(result.group.dn, "CN=Ops,OU=East,DC=example,DC=com");
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn cyclic_nesting_terminates() {
        let user = LdapEntry::new("CN=jdoe,OU=People,DC=example,DC=com")
            .with_attribute("displayName", ["Jane Doe"])
            .with_attribute("memberOf", [SALES]);
        let mock = directory(user, &[(SALES, &[ALL_STAFF]), (ALL_STAFF, &[SALES])], 2);

        let mut session = session_over(mock);
        let groups = MembershipResolver::new(&mut session)
            .user_groups("jdoe")
            .await
            .unwrap();

        assert_eq!(names(&groups.direct), ["Sales"]);
        assert_eq!(names(&groups.nested), ["AllStaff"]);
        assert_eq!(groups.total(), 2);
        assert_eq!(groups.user.display_name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn each_group_expanded_once_around_a_cycle() {
        let user = LdapEntry::new("CN=jdoe,OU=People,DC=example,DC=com")
            .with_attribute("memberOf", [SALES]);
        let mock = directory(
            user,
            &[
                (SALES, &[ALL_STAFF]),
                (ALL_STAFF, &[EVERYONE]),
                (EVERYONE, &[SALES]),
            ],
            3,
        );

        let mut session = session_over(mock);
        let groups = MembershipResolver::new(&mut session)
            .user_groups("jdoe")
            .await
            .unwrap();

        assert_eq!(names(&groups.direct), ["Sales"]);
        assert_eq!(names(&groups.nested), ["AllStaff", "Everyone"]);
        assert_eq!(groups.total(), 3);
    }

    #[tokio::test]
    async fn direct_groups_never_reported_as_nested() {
        let user = LdapEntry::new("CN=jdoe,OU=People,DC=example,DC=com")
            .with_attribute("memberOf", [SALES, ALL_STAFF]);
        let mock = directory(
            user,
            &[(SALES, &[ALL_STAFF, EVERYONE]), (ALL_STAFF, &[EVERYONE])],
            3,
        );

        let mut session = session_over(mock);
        let groups = MembershipResolver::new(&mut session)
            .user_groups("jdoe")
            .await
            .unwrap();

        assert_eq!(names(&groups.direct), ["AllStaff", "Sales"]);
        assert_eq!(names(&groups.nested), ["Everyone"]);
        assert_eq!(groups.total(), 3);
    }

    #[tokio::test]
    async fn direct_dns_compared_ignoring_case() {
        let user = LdapEntry::new("CN=jdoe,OU=People,DC=example,DC=com")
            .with_attribute("memberOf", [SALES, "cn=sales,ou=groups,dc=example,dc=com"]);
        let mock = directory(user, &[(SALES, &["CN=SALES,OU=GROUPS,DC=EXAMPLE,DC=COM"])], 1);

        let mut session = session_over(mock);
        let groups = MembershipResolver::new(&mut session)
            .user_groups("jdoe")
            .await
            .unwrap();

        assert_eq!(groups.direct.len(), 1);
        assert!(groups.nested.is_empty());
    }

    #[tokio::test]
    async fn user_without_groups() {
        let user = LdapEntry::new("CN=jdoe,OU=People,DC=example,DC=com");
        let mut session = session_over(directory(user, &[], 0));
        let groups = MembershipResolver::new(&mut session)
            .user_groups("jdoe")
            .await
            .unwrap();

        assert_eq!(groups.total(), 0);
        assert_eq!(groups.user.display_name_or_placeholder(), "No display name");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let mut mock = MockLdapSession::new();
        mock.expect_search()
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));

        let mut session = session_over(mock);
        let err = MembershipResolver::new(&mut session)
            .user_groups("ghost")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
