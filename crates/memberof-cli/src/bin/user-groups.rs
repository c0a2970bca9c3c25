//! Lists the direct and nested group memberships of a directory user.

use clap::Parser;
use memberof_cli::{commands, logging, CommonArgs};

/// List a user's direct and nested group memberships
#[derive(Parser)]
#[command(name = "user-groups", version, about, long_about = None)]
#[command(after_help = "Example: user-groups jdoe")]
struct Cli {
    /// Account name (sAMAccountName) of the user
    user_name: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    let cli: Cli = commands::parse_args();
    logging::init(cli.common.verbose);

    let result = commands::user_groups(&cli.user_name, cli.common.output).await;
    commands::exit_with(result);
}
