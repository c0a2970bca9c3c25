//! Decoders for raw directory attribute values.
//!
//! These are syntactic helpers over strings the server returned; none of them query the
//! directory.

/// `userAccountControl` bit marking a disabled account.
pub const ACCOUNT_DISABLED_FLAG: u32 = 0x0002;

/// Returns the common name of a distinguished name.
///
/// Takes the text before the first `,`. A leading `CN=` (any case) is stripped; any other
/// leading component is returned unchanged.
#[must_use]
pub fn extract_common_name(dn: &str) -> &str {
    let leading = dn.split(',').next().unwrap_or(dn);
    match leading.get(..3) {
        Some(marker) if marker.eq_ignore_ascii_case("cn=") => &leading[3..],
        _ => leading,
    }
}

/// Returns true unless the account-control bitmask has the disabled bit set.
///
/// An absent attribute counts as enabled.
#[must_use]
pub fn is_account_enabled(account_control: Option<u32>) -> bool {
    account_control.map_or(true, |flags| flags & ACCOUNT_DISABLED_FLAG == 0)
}

/// Parses a `userAccountControl` value.
///
/// Servers send the bitmask as a decimal integer; values above `i32::MAX` sometimes arrive as
/// their signed 32-bit form, so both are accepted.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn parse_account_control(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>()
        .ok()
        .or_else(|| raw.parse::<i32>().ok().map(|signed| signed as u32))
}
