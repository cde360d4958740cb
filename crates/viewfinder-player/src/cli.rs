use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about = "Drive the picture-alignment puzzles without a game window", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a manifest, parse every pose record and build the outcome table
    Check {
        /// Puzzle manifest (TOML)
        manifest: PathBuf,
    },

    /// Replay a recorded per-tick input trace
    Replay {
        /// Puzzle manifest (TOML)
        manifest: PathBuf,

        /// Input trace (JSON)
        trace: PathBuf,

        /// Path to write the host-call report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}
