//! Directory access for group-membership queries.
//!
//! This crate negotiates a bound LDAP session against an Active Directory style server and
//! resolves two questions over it: who belongs to a group, and which groups (direct and
//! inherited) a user belongs to.

#![deny(missing_docs)]

mod client;
mod decode;
mod dn;
mod filter;
mod group;
mod negotiate;
mod resolver;
mod session;
mod user;

pub use client::{DirectoryClient, LdapEntry};
pub use decode::{
    extract_common_name, is_account_enabled, parse_account_control, ACCOUNT_DISABLED_FLAG,
};
pub use dn::{compose_bind_dn, escape_rdn_value, validate_dn, DistinguishedNameError, DnKey};
pub use filter::escape_filter_value;
pub use group::{Group, GroupMembers, GroupRef};
pub use negotiate::{
    discovery_candidates, BindMechanism, ConnectionNegotiator, ServerAddress,
    NTLM_CAPABILITY_HINT,
};
pub use resolver::MembershipResolver;
pub use session::BoundSession;
pub use user::{
    AccountStatus, Member, UserGroups, UserSummary, DISPLAY_NAME_PLACEHOLDER, MAIL_PLACEHOLDER,
};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = memberof_core::Result<T>;
