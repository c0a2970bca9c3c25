//! Search filters and attribute lists used by the membership queries.

/// Attributes requested when looking up a group by name.
pub(crate) const GROUP_ATTRIBUTES: &[&str] = &["distinguishedName", "description"];

/// Attributes requested for each direct member of a group.
pub(crate) const MEMBER_ATTRIBUTES: &[&str] =
    &["sAMAccountName", "displayName", "mail", "userAccountControl"];

/// Attributes requested when looking up a user by account name.
pub(crate) const USER_ATTRIBUTES: &[&str] = &["displayName", "memberOf"];

/// Attributes requested when expanding a group's parents.
pub(crate) const PARENT_ATTRIBUTES: &[&str] = &["memberOf"];

/// `(&(objectClass=group)(cn=<name>))`
pub(crate) fn group_by_name(name: &str) -> String {
    format!("(&(objectClass=group)(cn={}))", escape_filter_value(name))
}

/// `(&(objectClass=user)(memberOf=<group dn>))`
pub(crate) fn users_in_group(group_dn: &str) -> String {
    format!(
        "(&(objectClass=user)(memberOf={}))",
        escape_filter_value(group_dn)
    )
}

/// `(&(objectClass=user)(sAMAccountName=<name>))`
pub(crate) fn user_by_account_name(name: &str) -> String {
    format!(
        "(&(objectClass=user)(sAMAccountName={}))",
        escape_filter_value(name)
    )
}

/// `(distinguishedName=<dn>)`
pub(crate) fn entry_by_dn(dn: &str) -> String {
    format!("(distinguishedName={})", escape_filter_value(dn))
}

/// Escapes a value for interpolation into a search filter (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
