//! Group representations returned by membership queries.

use serde::Serialize;

use crate::client::LdapEntry;
use crate::decode::extract_common_name;
use crate::dn::DnKey;
use crate::user::Member;

/// A group entry located by common name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Distinguished name of the group.
    pub dn: String,
    /// Common name decoded from the DN.
    pub name: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Group {
    pub(crate) fn from_entry(entry: &LdapEntry) -> Self {
        let dn = entry.distinguished_name().to_string();
        Self {
            name: extract_common_name(&dn).to_string(),
            description: entry.first("description").map(str::to_owned),
            dn,
        }
    }
}

/// A group referenced from a membership list, identified by DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    /// Distinguished name of the group.
    pub dn: String,
    /// Common name decoded from the DN.
    pub common_name: String,
}

impl GroupRef {
    /// Builds a reference from a DN, decoding its common name.
    #[must_use]
    pub fn from_dn(dn: &str) -> Self {
        Self {
            dn: dn.to_string(),
            common_name: extract_common_name(dn).to_string(),
        }
    }

    /// Identity key of the referenced group.
    #[must_use]
    pub fn key(&self) -> DnKey {
        DnKey::new(&self.dn)
    }
}

/// Orders group references by common name (case-insensitive), then by DN.
pub(crate) fn sort_group_refs(groups: &mut [GroupRef]) {
    groups.sort_by(|a, b| {
        a.common_name
            .to_lowercase()
            .cmp(&b.common_name.to_lowercase())
            .then_with(|| a.key().cmp(&b.key()))
    });
}

/// Direct user members of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMembers {
    /// The group that was looked up.
    pub group: Group,
    /// Direct members, sorted by account name (case-insensitive).
    pub members: Vec<Member>,
}

impl GroupMembers {
    /// Returns the number of direct members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no direct user members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_from_entry() {
        let entry = LdapEntry::new("CN=Domain Users,CN=Users,DC=example,DC=com")
            .with_attribute("description", ["All domain users"]);
        let group = Group::from_entry(&entry);

        assert_eq!(group.name, "Domain Users");
        assert_eq!(group.dn, "CN=Domain Users,CN=Users,DC=example,DC=com");
        assert_eq!(group.description.as_deref(), Some("All domain users"));
    }

    #[test]
    fn sort_refs_case_insensitive() {
        let mut refs = vec![
            GroupRef::from_dn("CN=sales,OU=Groups,DC=x"),
            GroupRef::from_dn("CN=AllStaff,OU=Groups,DC=x"),
            GroupRef::from_dn("CN=Engineering,OU=Groups,DC=x"),
        ];
        sort_group_refs(&mut refs);
        let names: Vec<_> = refs.iter().map(|g| g.common_name.as_str()).collect();
        assert_eq!(names, ["AllStaff", "Engineering", "sales"]);
    }

    #[test]
    fn sort_refs_breaks_ties_by_dn() {
        let mut refs = vec![
            GroupRef::from_dn("CN=Admins,OU=Tier1,DC=x"),
            GroupRef::from_dn("CN=Admins,OU=Tier0,DC=x"),
        ];
        sort_group_refs(&mut refs);
        assert_eq!(refs[0].dn, "CN=Admins,OU=Tier0,DC=x");
    }
}
