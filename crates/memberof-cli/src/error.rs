//! CLI error type and exit codes.
//!
//! Every failure exits with status 1: usage errors, configuration errors, directory errors
//! and the expected "not found" outcome alike.

use memberof_core::Error as DirectoryError;
use thiserror::Error;

/// Result alias for command execution.
pub type CliResult<T> = Result<T, CliError>;

/// Failure of a command run.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration, connection, bind, search or lookup failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The rendered result could not be written.
    #[error("Failed to write output: {0}")]
    Output(String),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }

    /// Remediation hint to print after the message, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Directory(err) => err.hint(),
            Self::Output(_) => None,
        }
    }

    /// Text printed to stderr for this error.
    #[must_use]
    pub fn report(&self) -> String {
        let mut report = match self {
            Self::Directory(err) if err.is_not_found() => format!("{err}."),
            other => format!("Error: {other}"),
        };
        if let Some(hint) = self.hint() {
            report.push_str("\n\nHint: ");
            report.push_str(hint);
        }
        report
    }

    /// Prints the error report to stderr.
    pub fn print(&self) {
        eprintln!("{}", self.report());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_reads_as_a_sentence() {
        let err = CliError::from(DirectoryError::not_found("Group", "Ghosts"));
        assert_eq!(err.report(), "Group 'Ghosts' not found.");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_bind_hint_is_printed() {
        let err = CliError::from(DirectoryError::BindFailed {
            mechanism: "NTLM".to_string(),
            identity: "EXAMPLE\\svc".to_string(),
            message: "MD4 unavailable".to_string(),
            hint: Some("use simple bind".to_string()),
        });
        let report = err.report();
        assert!(report.starts_with("Error: NTLM bind as `EXAMPLE\\svc` failed"));
        assert!(report.ends_with("Hint: use simple bind"));
    }

    #[test]
    fn test_config_error_has_no_hint() {
        let err = CliError::from(DirectoryError::ConfigError("BASE_DN must be set".to_string()));
        assert_eq!(err.report(), "Error: Configuration error: BASE_DN must be set");
        assert!(err.hint().is_none());
    }

    #[test]
    fn test_output_errors_exit_one() {
        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert!(matches!(err, CliError::Output(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
