//! mirror-sync CLI
//!
//! Lists, inspects and runs the mirrors described by a worker file.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = mirror_worker::logging::init(cli.verbose) {
        eprintln!("{} failed to set up logging: {}", "warning:".yellow().bold(), e);
    }
    tracing::debug!(config = %cli.config.display(), "Using worker file");

    match cli.command {
        Commands::List { json } => commands::run_list(&cli.config, json),
        Commands::Command { name } => commands::run_show_command(&cli.config, &name),
        Commands::Run { name } => commands::run_sync(&cli.config, &name),
    }
}
