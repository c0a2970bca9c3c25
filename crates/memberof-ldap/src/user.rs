//! User representations returned by membership queries.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::client::LdapEntry;
use crate::decode::{extract_common_name, is_account_enabled, parse_account_control};
use crate::group::GroupRef;

/// Shown in place of a missing `displayName`.
pub const DISPLAY_NAME_PLACEHOLDER: &str = "No display name";
/// Shown in place of a missing `mail`.
pub const MAIL_PLACEHOLDER: &str = "No email";

/// Enabled/disabled state decoded from `userAccountControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// The account can log on.
    Enabled,
    /// The disabled bit is set.
    Disabled,
}

impl AccountStatus {
    /// Decodes the status from an optional account-control bitmask.
    #[must_use]
    pub fn from_account_control(account_control: Option<u32>) -> Self {
        if is_account_enabled(account_control) {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Returns true for [`AccountStatus::Enabled`].
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A direct user member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Distinguished name of the user entry.
    pub dn: String,
    /// Logon name (`sAMAccountName`).
    pub account_name: String,
    /// Display name, if set.
    pub display_name: Option<String>,
    /// Email address, if set.
    pub mail: Option<String>,
    /// Decoded account state.
    pub status: AccountStatus,
}

impl Member {
    pub(crate) fn from_entry(entry: &LdapEntry) -> Self {
        let dn = entry.distinguished_name().to_string();
        let account_name = entry.first("sAMAccountName").map_or_else(
            || {
                warn!(dn = %dn, "member entry has no sAMAccountName, using its common name");
                extract_common_name(&dn).to_string()
            },
            str::to_owned,
        );

        let account_control = entry.first("userAccountControl").and_then(|raw| {
            let parsed = parse_account_control(raw);
            if parsed.is_none() {
                warn!(dn = %dn, value = raw, "ignoring undecodable userAccountControl");
            }
            parsed
        });

        Self {
            account_name,
            display_name: entry.first("displayName").map(str::to_owned),
            mail: entry.first("mail").map(str::to_owned),
            status: AccountStatus::from_account_control(account_control),
            dn,
        }
    }

    /// Display name or [`DISPLAY_NAME_PLACEHOLDER`].
    #[must_use]
    pub fn display_name_or_placeholder(&self) -> &str {
        self.display_name.as_deref().unwrap_or(DISPLAY_NAME_PLACEHOLDER)
    }

    /// Email address or [`MAIL_PLACEHOLDER`].
    #[must_use]
    pub fn mail_or_placeholder(&self) -> &str {
        self.mail.as_deref().unwrap_or(MAIL_PLACEHOLDER)
    }

    /// Returns true if the account is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.status.is_enabled()
    }
}

/// The user a group closure was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// Distinguished name of the user entry.
    pub dn: String,
    /// Logon name that was looked up.
    pub account_name: String,
    /// Display name, if set.
    pub display_name: Option<String>,
}

impl UserSummary {
    /// Display name or [`DISPLAY_NAME_PLACEHOLDER`].
    #[must_use]
    pub fn display_name_or_placeholder(&self) -> &str {
        self.display_name.as_deref().unwrap_or(DISPLAY_NAME_PLACEHOLDER)
    }
}

/// Direct and inherited group memberships of a user.
///
/// `direct` and `nested` never share a DN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGroups {
    /// The user that was looked up.
    pub user: UserSummary,
    /// Groups listed on the user's own `memberOf`, sorted by common name.
    pub direct: Vec<GroupRef>,
    /// Groups reachable only through other groups, sorted by common name.
    pub nested: Vec<GroupRef>,
}

impl UserGroups {
    /// Total number of unique groups.
    #[must_use]
    pub fn total(&self) -> usize {
        self.direct.len() + self.nested.len()
    }
}
