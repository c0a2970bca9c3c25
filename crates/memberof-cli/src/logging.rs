//! Diagnostic logging to stderr.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
///
/// `0` keeps warnings plus the connection and bind lines, `1` (`-v`) adds every info event,
/// `2` or more (`-vv`) adds every search and traversal step.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,memberof_ldap::negotiate=info",
        1 => "info",
        _ => "debug",
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbosity`.
///
/// Logs go to stderr; stdout carries only results. Calling this twice is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // A second init (tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
