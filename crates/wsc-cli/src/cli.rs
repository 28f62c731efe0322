use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wsc",
    about = "Workspace Consolidator: merge duplicated packages, apps and tools across workspace roots",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace root; repeat in priority order (overrides the config file)
    #[arg(short = 'r', long = "root", global = true)]
    pub roots: Vec<PathBuf>,

    /// Root that receives consolidated targets (default: first root)
    #[arg(long, global = true)]
    pub canonical: Option<PathBuf>,

    /// Write discovery.json / consolidation.json into this directory
    #[arg(long, global = true)]
    pub report_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan the roots and report every entity and its quality score
    Discover,
    /// Show what a run would do, without touching the filesystem
    Plan,
    /// Back up, merge, mark and archive every duplicated entity
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Leave superseded copies where they are instead of archiving them
    #[arg(long)]
    pub keep_superseded: bool,

    /// Where backups and archived copies go
    #[arg(long)]
    pub archive_root: Option<PathBuf>,
}
