//! Seedling CLI Application
//!
//! Command-line interface for seeding a document database from JSON
//! fixture files.

mod args;
mod cli;
mod renderer;

use std::process::ExitCode;

use anyhow::{Context, Result};
use args::{Args, Commands, RunArgs};
use clap::Parser;
use cli::Cli;
use log::info;
use renderer::TerminalRenderer;
use seedling_core::SeedConfig;
use Commands::*;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    let Args {
        config,
        data_dir,
        no_color,
        json,
        command,
    } = Args::parse();

    let config_path = match config {
        Some(path) => path,
        None => SeedConfig::default_path().context("Failed to resolve configuration path")?,
    };

    let cli = Cli::new(config_path, TerminalRenderer::new(!no_color), json);

    info!("Seedling started");

    match command {
        Some(Run(args)) => cli.run(data_dir, &args).await,
        Some(Check) => cli.check().await,
        Some(Schema) => cli.schema(),
        None => cli.run(data_dir, &RunArgs::default()).await,
    }
}
