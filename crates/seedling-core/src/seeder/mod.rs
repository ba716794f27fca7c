//! The seeding pipeline orchestrator.
//!
//! A [`Seeder`] owns the configuration, the database client and the model
//! loader, and runs the stages strictly in order:
//!
//! ```text
//! connect ─▶ backup (optional) ─▶ load models ─▶ clear models ─▶ read fixtures ─▶ populate models
//! ```
//!
//! The first failing stage stops the run and its [`StageError`] is returned
//! unchanged; no stage is retried and completed stages are not rolled back.
//! Once connected, the connection is closed whether the run succeeds or
//! fails. A connect that timed out is closed as well, since the client may
//! still finish opening it.
//!
//! The stage timeout bounds connect, backup, model loading and fixture
//! reading as a whole. Clear and populate apply it to each database
//! operation instead, so their errors keep the effects already applied.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use seedling_core::{SeedConfig, SeederBuilder, SqliteClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SeedConfig::from_path("seed.json")?;
//! let seeder = SeederBuilder::new(config)
//!     .with_client(Arc::new(SqliteClient::new("/var/lib/seedling")))
//!     .build()?;
//!
//! let result = seeder.run().await?;
//! println!("Inserted {} documents", result.total_inserted());
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    backup::BackupRunner,
    client::DocumentClient,
    config::SeedConfig,
    error::{Result, StageError, StageKind, StageResultExt},
    fixtures::FixtureStore,
    models::RunResult,
    registry::{ModelLoader, ModelRegistry},
    stages::{clear_models, populate_models},
};

pub mod builder;

pub use builder::SeederBuilder;

/// Runs the seeding pipeline against one database.
pub struct Seeder {
    config: SeedConfig,
    client: Arc<dyn DocumentClient>,
    loader: Arc<dyn ModelLoader>,
}

impl Seeder {
    fn new(
        config: SeedConfig,
        client: Arc<dyn DocumentClient>,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        Self {
            config,
            client,
            loader,
        }
    }

    /// Runs every stage and returns the accumulated result.
    ///
    /// Each call is an independent run with its own model registry.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails. No partial
    /// [`RunResult`] is returned; effects applied by a failing clear or
    /// populate stage are available through [`StageError::partial`].
    pub async fn run(&self) -> Result<RunResult> {
        let uri = self.config.database.uri();
        let mut result = RunResult::new(uri.clone());

        let duplicates = self.config.duplicate_model_names();
        if !duplicates.is_empty() {
            warn!(
                "Models listed more than once, later definitions win: {}",
                duplicates.join(", ")
            );
        }

        info!("Seeding {uri}");
        if let Err(e) = self.stage(StageKind::Connect, self.connect(&uri)).await {
            if e.is_timeout() {
                self.disconnect(&uri).await;
            }
            return Err(e);
        }

        let outcome = self.run_connected(&mut result).await;
        self.disconnect(&uri).await;

        outcome?;
        info!(
            "Seeding finished: {} model(s) cleared, {} document(s) inserted",
            result.cleared.len(),
            result.total_inserted()
        );
        Ok(result)
    }

    async fn run_connected(&self, result: &mut RunResult) -> Result<()> {
        if self.config.backup.enabled {
            let runner = BackupRunner::new(&self.config);
            self.stage(StageKind::Backup, runner.run()).await?;
        } else {
            debug!("Backup disabled, skipping");
        }

        let client = self.client.as_ref();
        let limit = self.config.stage_timeout();
        let mut registry = ModelRegistry::new();
        self.stage(
            StageKind::LoadModel,
            registry.load_models(client, self.loader.as_ref(), &self.config.models),
        )
        .await?;

        self.settle(
            StageKind::ClearModel,
            clear_models(client, &registry, &self.config.models, limit, result),
        )
        .await?;

        let store = FixtureStore::new(&self.config.fixtures_path);
        let records = self
            .stage(StageKind::ReadFixture, store.read_fixtures())
            .await?;

        self.settle(
            StageKind::Populate,
            populate_models(client, &registry, &records, limit, result),
        )
        .await
    }

    async fn connect(&self, uri: &str) -> Result<()> {
        self.client
            .connect(uri)
            .await
            .stage_err_with(StageKind::Connect, || {
                format!("Could not connect to {uri}")
            })
    }

    /// Best-effort close; a failure is only logged.
    async fn disconnect(&self, uri: &str) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to close connection to {uri}: {e}");
        }
    }

    /// Runs one stage under the configured timeout.
    async fn stage<T, F>(&self, kind: StageKind, stage: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.config.stage_timeout();
        let bounded = async move {
            match limit {
                Some(limit) => match tokio::time::timeout(limit, stage).await {
                    Ok(outcome) => outcome,
                    Err(elapsed) => Err(StageError::stage(
                        kind,
                        format!("Timed out after {} ms", limit.as_millis()),
                    )
                    .with_source(elapsed)),
                },
                None => stage.await,
            }
        };
        self.settle(kind, bounded).await
    }

    /// Runs one stage to completion and logs its outcome.
    async fn settle<T, F>(&self, kind: StageKind, stage: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!("Stage {kind} started");
        let outcome = stage.await;

        match &outcome {
            Ok(_) => debug!("Stage {kind} finished"),
            Err(e) => error!("Error: {e}"),
        }
        outcome
    }
}
