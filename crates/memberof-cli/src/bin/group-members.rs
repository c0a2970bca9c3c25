//! Lists the direct user members of a directory group.

use clap::Parser;
use memberof_cli::{commands, logging, CommonArgs};

/// List the direct user members of a group
#[derive(Parser)]
#[command(name = "group-members", version, about, long_about = None)]
#[command(after_help = "Example: group-members \"Domain Users\"")]
struct Cli {
    /// Common name of the group
    group_name: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() {
    let cli: Cli = commands::parse_args();
    logging::init(cli.common.verbose);

    let result = commands::group_members(&cli.group_name, cli.common.output).await;
    commands::exit_with(result);
}
