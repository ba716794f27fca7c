//! Command handlers for the Seedling CLI
//!
//! Each handler loads the configuration, drives `seedling_core`, and prints
//! either a markdown report through the [`TerminalRenderer`] or the JSON
//! contract when `--json` is given. Seeding failures are reported, not
//! propagated: they turn into a failing exit code.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use seedling_core::{
    check_setup, CheckReport, DocumentClient, FailureReport, JsonDefinitionLoader, MemoryClient,
    SeedConfig, SeedReport, SeederBuilder, SqliteClient,
};

use crate::{args::RunArgs, renderer::TerminalRenderer};

/// CLI handler bound to one configuration file.
pub struct Cli {
    config_path: PathBuf,
    renderer: TerminalRenderer,
    json: bool,
}

impl Cli {
    pub fn new(config_path: PathBuf, renderer: TerminalRenderer, json: bool) -> Self {
        Self {
            config_path,
            renderer,
            json,
        }
    }

    fn load_config(&self) -> Result<SeedConfig> {
        SeedConfig::from_path(&self.config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }

    /// Model definitions are resolved relative to the configuration file.
    fn loader(&self) -> JsonDefinitionLoader {
        JsonDefinitionLoader::new(self.config_path.parent().unwrap_or(Path::new(".")))
    }

    /// Runs the seeding pipeline.
    pub async fn run(&self, data_dir: Option<PathBuf>, args: &RunArgs) -> Result<ExitCode> {
        let mut config = self.load_config()?;
        if let Some(enabled) = args.backup_override() {
            config.backup.enabled = enabled;
        }

        let client: Arc<dyn DocumentClient> = if args.dry_run {
            info!("Dry run: seeding an in-memory store");
            Arc::new(MemoryClient::new())
        } else {
            let data_dir = match data_dir {
                Some(dir) => dir,
                None => SeedConfig::default_data_dir()
                    .context("Failed to resolve the data directory")?,
            };
            info!("Using document stores in {}", data_dir.display());
            Arc::new(SqliteClient::new(data_dir))
        };

        let seeder = SeederBuilder::new(config)
            .with_client(client)
            .with_loader(self.loader())
            .build()
            .context("Failed to initialize seeder")?;

        match seeder.run().await {
            Ok(result) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    self.renderer.render(&SeedReport::new(&result).to_string())?;
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&e.to_report())?);
                } else {
                    self.renderer
                        .render_error(&FailureReport::new(&e).to_string())?;
                }
                Ok(ExitCode::FAILURE)
            }
        }
    }

    /// Validates definitions and fixtures without connecting anywhere.
    pub async fn check(&self) -> Result<ExitCode> {
        let config = self.load_config()?;
        let check = check_setup(&config, &self.loader()).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&check)?);
        } else {
            self.renderer.render(&CheckReport::new(&check).to_string())?;
        }

        Ok(if check.is_ok() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    /// Prints the JSON schema of the configuration file.
    pub fn schema(&self) -> Result<ExitCode> {
        let schema = schemars::schema_for!(SeedConfig);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(ExitCode::SUCCESS)
    }
}
