//! biocache-cache CLI - Command-line interface
//!
//! Inspects and maintains the on-disk query store and the cache
//! configuration file used by the biocache-cache library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::qid::QidAction;

#[derive(Parser)]
#[command(name = "biocache-cache")]
#[command(version = biocache_cache::VERSION)]
#[command(about = "Manage the biocache query store and cache configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store, look up and expire cached queries
    Qid {
        #[command(subcommand)]
        action: QidAction,
    },

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Qid { action } => commands::qid::run(action),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
