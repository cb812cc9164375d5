use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Project task tracker with a three-level task hierarchy.
/// Storage defaults to ~/.tt/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tt", version, about = "Project task tracking CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}
