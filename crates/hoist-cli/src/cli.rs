//! CLI argument definitions for Hoist.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "hoist",
    version,
    about = "Resolve module dependencies and install their artifacts",
    long_about = "Hoist reads a TOML run configuration naming repositories and top-level \
                  module specifications, resolves the full dependency graph, collapses \
                  version conflicts, and installs artifacts incrementally."
)]
pub struct Cli {
    /// Path to the run configuration
    #[arg(default_value = "hoist.toml")]
    pub config: PathBuf,

    /// Override the installation root from the configuration
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Conflict policy: newest, oldest, explicit-wins
    #[arg(long)]
    pub policy: Option<String>,

    /// Reinstall artifacts even when unchanged
    #[arg(long)]
    pub overwrite: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
