//! Command execution shared by both entry points.

use std::io;

use clap::{ArgAction, Args, Parser};
use memberof_core::{DirectoryConfig, Error};
use memberof_ldap::DirectoryClient;
use tracing::{debug, error, Level};

use crate::error::{CliError, CliResult};
use crate::output::{self, OutputFormat};
use crate::prompt;

/// Options accepted by every command.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Increase diagnostic output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Parses the command line, exiting on `--help`, `--version` or a usage error.
///
/// Help and version exit with status 0; usage errors print the usage and exit with status 1.
#[must_use]
pub fn parse_args<T: Parser>() -> T {
    T::try_parse().unwrap_or_else(|err| exit_on_parse_error(&err))
}

fn exit_on_parse_error(err: &clap::Error) -> ! {
    // Printing can only fail when stderr is gone.
    let _ = err.print();
    std::process::exit(parse_error_code(err))
}

fn parse_error_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

/// Ends the process with the status of a command run.
pub fn exit_with(result: CliResult<()>) -> ! {
    match result {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            log_failure(&err);
            err.print();
            std::process::exit(err.exit_code())
        }
    }
}

/// Level a failed run is logged at. Defect-class directory errors and output failures are
/// errors; expected outcomes such as "not found" are debug.
fn failure_level(err: &CliError) -> Level {
    match err {
        CliError::Directory(inner) if !inner.should_log() => Level::DEBUG,
        CliError::Directory(_) | CliError::Output(_) => Level::ERROR,
    }
}

fn log_failure(err: &CliError) {
    let code = match err {
        CliError::Directory(inner) => inner.error_code(),
        CliError::Output(_) => "OUTPUT_ERROR",
    };
    if failure_level(err) == Level::ERROR {
        error!(code, "command failed");
    } else {
        debug!(code, "command failed");
    }
}

/// Lists the direct user members of `group_name` on stdout.
///
/// # Errors
///
/// Returns the configuration, directory or output error that stopped the run.
pub async fn group_members(group_name: &str, format: OutputFormat) -> CliResult<()> {
    let group_name = require_name("group", group_name)?;
    let client = directory_client()?;
    let result = client.group_members(group_name).await?;
    output::render_group_members(&mut io::stdout().lock(), format, &result)
}

/// Lists the direct and nested groups of `user_name` on stdout.
///
/// # Errors
///
/// Returns the configuration, directory or output error that stopped the run.
pub async fn user_groups(user_name: &str, format: OutputFormat) -> CliResult<()> {
    let user_name = require_name("user", user_name)?;
    let client = directory_client()?;
    let result = client.user_groups(user_name).await?;
    output::render_user_groups(&mut io::stdout().lock(), format, &result)
}

fn directory_client() -> CliResult<DirectoryClient> {
    let config = DirectoryConfig::from_env()?;
    let credentials = prompt::credentials_from_env();
    Ok(DirectoryClient::new(config, credentials)?)
}

fn require_name<'a>(kind: &str, name: &'a str) -> CliResult<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::from(Error::InvalidRequest(format!(
            "{kind} name cannot be empty"
        ))));
    }
    Ok(name)
}
