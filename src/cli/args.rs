//! CLI argument definitions.
//!
//! Commands:
//! - ledgerdb init --config <path>
//! - ledgerdb start --config <path>
//! - ledgerdb save --config <path> --to <path>
//! - ledgerdb load --config <path> --from <path>

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// An in-memory, schemaless document database with WAL-backed durable
/// persistence, exposed over HTTP/JSON.
#[derive(Parser, Debug)]
#[command(name = "ledgerdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scaffold a new data directory and starter config file.
    Init {
        #[arg(long, default_value = "./ledgerdb.json")]
        config: PathBuf,
    },

    /// Recover from the latest checkpoint plus WAL tail and serve HTTP.
    Start {
        #[arg(long, default_value = "./ledgerdb.json")]
        config: PathBuf,
    },

    /// Boot, write a checkpoint snapshot to an arbitrary path, and exit.
    Save {
        #[arg(long, default_value = "./ledgerdb.json")]
        config: PathBuf,
        #[arg(long)]
        to: PathBuf,
    },

    /// Boot, replace live state with a checkpoint snapshot, and exit.
    Load {
        #[arg(long, default_value = "./ledgerdb.json")]
        config: PathBuf,
        #[arg(long)]
        from: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
