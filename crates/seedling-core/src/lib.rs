//! Core library for the Seedling fixture seeder.
//!
//! This crate seeds a document database from a directory of JSON fixture
//! files. A run is an ordered pipeline of fallible stages:
//!
//! 1. **Connect** to the database named by the configuration
//! 2. **Backup** the database with an external binary (optional)
//! 3. **Load models**: activate each configured model in the client
//! 4. **Clear models**: empty the collections of models marked `clear`
//! 5. **Read fixtures**: parse every `*.json` file of the fixtures directory
//! 6. **Populate models**: insert each fixture document
//!
//! The first failing stage ends the run with a [`StageError`] tagged by the
//! stage that failed. A successful run returns a [`RunResult`] listing the
//! cleared models and the number of documents inserted per model.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use seedling_core::{
//!     ClientResult, DatabaseConfig, MemoryClient, ModelDefinition, ModelDescriptor, SeedConfig,
//!     SeederBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SeedConfig::new(DatabaseConfig::new("app"), "fixtures")
//!     .with_model(ModelDescriptor::new("User", "models/user.json"));
//!
//! let seeder = SeederBuilder::new(config)
//!     .with_client(Arc::new(MemoryClient::new()))
//!     .with_loader(|d: &ModelDescriptor| -> ClientResult<ModelDefinition> {
//!         Ok(ModelDefinition::new(d.name.clone()))
//!     })
//!     .build()?;
//!
//! match seeder.run().await {
//!     Ok(result) => println!("Inserted {} documents", result.total_inserted()),
//!     Err(e) => eprintln!("{} ({})", e, e.code()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod check;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod registry;
pub mod seeder;
pub mod stages;

// Re-export commonly used types
pub use backup::BackupRunner;
pub use check::{check_setup, CheckResult, FixtureSummary};
pub use client::{DocumentClient, MemoryClient, SqliteClient};
pub use config::{BackupConfig, DatabaseConfig, ModelDescriptor, SeedConfig};
pub use display::{CheckReport, FailureReport, SeedReport};
pub use error::{
    ClientError, ClientResult, ConfigError, ErrorReport, PartialEffects, Result, StageError,
    StageKind,
};
pub use fixtures::FixtureStore;
pub use models::{Document, FixtureRecord, ModelDefinition, RunResult};
pub use registry::{JsonDefinitionLoader, ModelLoader, ModelRegistry};
pub use seeder::{Seeder, SeederBuilder};
pub use stages::{clear_models, populate_models};
