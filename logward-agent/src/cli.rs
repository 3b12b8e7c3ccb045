//! Command-line interface for logward-agent.

use std::path::PathBuf;

use clap::Parser;

/// Logward security event collection agent.
#[derive(Debug, Parser)]
#[command(name = "logward-agent", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, value_name = "FILE", default_value = "logward.toml")]
    pub config: PathBuf,

    /// Run one collection cycle and exit (default: run continuously).
    #[arg(long)]
    pub once: bool,

    /// Test mode: collect but do not send events.
    #[arg(long)]
    pub test: bool,

    /// Dry run: show what would be collected without sending.
    #[arg(long)]
    pub dry_run: bool,
}
