//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default worker file, relative to the current directory
pub const DEFAULT_CONFIG: &str = "mirror-sync.toml";

/// mirror-sync - Run mirror sync jobs from a worker file
#[derive(Parser, Debug)]
#[command(name = "mirror-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Worker configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "MIRROR_SYNC_CONFIG",
        default_value = DEFAULT_CONFIG
    )]
    pub config: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List configured mirrors
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the command line a mirror would run
    Command {
        /// Mirror name
        name: String,
    },

    /// Run one sync of a mirror in the foreground
    Run {
        /// Mirror name
        name: String,
    },
}
