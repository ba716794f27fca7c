use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Seed a document database from a directory of JSON fixture files
///
/// Seedling connects to the configured database, optionally backs it up,
/// registers the configured models, clears their collections and inserts the
/// documents found in the fixtures directory.
#[derive(Parser)]
#[command(version, about, name = "seedling")]
pub struct Args {
    /// Path to the seed configuration file. Defaults to
    /// $XDG_CONFIG_HOME/seedling/seed.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the local document stores. Defaults to
    /// $XDG_DATA_HOME/seedling/stores
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print machine-readable JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the Seedling CLI
#[derive(Subcommand)]
pub enum Commands {
    /// Seed the database (default)
    #[command(alias = "r")]
    Run(RunArgs),
    /// Validate configuration, model definitions and fixtures without
    /// touching the database
    #[command(alias = "c")]
    Check,
    /// Print the JSON schema of the configuration file
    Schema,
}

/// Options for a seeding run
#[derive(ClapArgs, Default)]
pub struct RunArgs {
    /// Seed an in-memory store instead of the database
    #[arg(long)]
    pub dry_run: bool,

    /// Take a backup before clearing, whatever the configuration says
    #[arg(long, conflicts_with = "no_backup")]
    pub backup: bool,

    /// Skip the backup, whatever the configuration says
    #[arg(long)]
    pub no_backup: bool,
}

impl RunArgs {
    /// Backup setting forced from the command line, if any.
    pub fn backup_override(&self) -> Option<bool> {
        match (self.backup, self.no_backup) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
