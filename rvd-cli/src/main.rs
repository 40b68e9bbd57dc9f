//! RVD CLI - Command line tool for respiratory virus surveillance dashboards.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "rvd-cli",
    version,
    about = "Respiratory virus dashboard data toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: rvd_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("rvd-cli {}", env!("CARGO_PKG_VERSION"));
    rvd_cmd::run(cli.command).await
}
