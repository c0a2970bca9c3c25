//! Command-line plumbing shared by the `group-members` and `user-groups` entry points.
//!
//! Each binary is a thin wrapper: parse arguments, install logging, build a
//! [`memberof_ldap::DirectoryClient`] from the environment, run one query and render it.

#![deny(missing_docs)]

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod prompt;

pub use commands::CommonArgs;
pub use error::{CliError, CliResult};
pub use output::OutputFormat;
