//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive test runs on a dashboard server and follow their progress
#[derive(Parser, Debug)]
#[command(name = "runboard")]
#[command(version)]
#[command(about = "Dispatch and monitor test runs on a dashboard server")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./runboard.yaml or the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Server address, overriding the configuration
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Output format (table, json, json-pretty)
    #[arg(short, long, global = true, default_value = "table")]
    pub format: String,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single test and print its result
    Run {
        /// Test name
        name: String,
    },

    /// Run tests as a batch and follow it until it completes
    Batch(BatchArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for batch command
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Tests to run, in order (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub tests: Vec<String>,

    /// Number of tests the server runs at once
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Delay between test starts in milliseconds
    #[arg(long)]
    pub delay: Option<u64>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Target file (defaults to the user config dir)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
