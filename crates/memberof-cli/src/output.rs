//! Rendering of resolution results.

use std::io::Write;

use clap::ValueEnum;
use memberof_ldap::{GroupMembers, GroupRef, UserGroups};
use serde::Serialize;

use crate::error::CliResult;

/// Width of the separator rule under each header.
const RULE_WIDTH: usize = 60;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable listing (default)
    #[default]
    Text,
    /// Pretty-printed JSON document
    Json,
}

/// Writes the members of a group in the requested format.
///
/// # Errors
///
/// Returns [`crate::CliError::Output`] if writing fails.
pub fn render_group_members<W: Write>(
    out: &mut W,
    format: OutputFormat,
    result: &GroupMembers,
) -> CliResult<()> {
    match format {
        OutputFormat::Text => write_group_members(out, result),
        OutputFormat::Json => write_json(out, result),
    }
}

/// Writes the group memberships of a user in the requested format.
///
/// # Errors
///
/// Returns [`crate::CliError::Output`] if writing fails.
pub fn render_user_groups<W: Write>(
    out: &mut W,
    format: OutputFormat,
    result: &UserGroups,
) -> CliResult<()> {
    match format {
        OutputFormat::Text => write_user_groups(out, result),
        OutputFormat::Json => write_json(out, result),
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_group_members<W: Write>(out: &mut W, result: &GroupMembers) -> CliResult<()> {
    let group = &result.group;
    writeln!(out, "Members of group: {}", group.name)?;
    if let Some(description) = &group.description {
        writeln!(out, "Description: {description}")?;
    }
    writeln!(out, "DN: {}", group.dn)?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    if result.is_empty() {
        writeln!(out, "No direct user members found for this group.")?;
        return Ok(());
    }

    writeln!(out, "Direct user members ({} users):", result.member_count())?;
    for member in &result.members {
        writeln!(
            out,
            "  • {} - {}",
            member.account_name,
            member.display_name_or_placeholder()
        )?;
        writeln!(out, "    Email: {}", member.mail_or_placeholder())?;
        writeln!(out, "    Status: {}", member.status)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_user_groups<W: Write>(out: &mut W, result: &UserGroups) -> CliResult<()> {
    writeln!(
        out,
        "Group memberships for {} ({}):",
        result.user.account_name,
        result.user.display_name_or_placeholder()
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    writeln!(out, "Direct memberships ({}):", result.direct.len())?;
    write_group_list(out, &result.direct)?;

    writeln!(out, "\nNested memberships ({}):", result.nested.len())?;
    write_group_list(out, &result.nested)?;

    writeln!(out, "\nTotal unique groups: {}", result.total())?;
    Ok(())
}

fn write_group_list<W: Write>(out: &mut W, groups: &[GroupRef]) -> CliResult<()> {
    for group in groups {
        writeln!(out, "  • {}", group.common_name)?;
        writeln!(out, "    DN:  {}", group.dn)?;
    }
    Ok(())
}
