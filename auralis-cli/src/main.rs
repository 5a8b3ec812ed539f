//! Auralis CLI - Command-line interface
//!
//! Runs the listening-test survey server and inspects the audio library.

mod commands;

use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(name = "auralis")]
#[command(about = "Listening-test survey server with range-aware audio streaming")]
struct Cli {
    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::handle_command(cli.command)
        .await
        .context("auralis command failed")?;

    Ok(())
}
