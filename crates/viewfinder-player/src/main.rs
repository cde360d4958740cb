/// Viewfinder — headless driver for the picture-alignment puzzles
///
/// Architecture:
///   cli     — command-line arguments
///   check   — validate a manifest and its pose records
///   replay  — run a recorded input trace through the coordinator
mod check;
mod cli;
mod replay;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("viewfinder=debug".parse()?)
                .add_directive("viewfinder_align=debug".parse()?),
        )
        .init();

    tracing::info!("Viewfinder v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Check { manifest } => check::run(&manifest),
        Command::Replay {
            manifest,
            trace,
            report,
        } => replay::run(&manifest, &trace, report.as_deref()),
    }
}
