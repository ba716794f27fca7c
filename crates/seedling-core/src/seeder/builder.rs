//! Builder for creating and configuring Seeder instances.

use std::sync::Arc;

use super::Seeder;
use crate::{
    client::DocumentClient,
    config::SeedConfig,
    error::ConfigError,
    registry::{JsonDefinitionLoader, ModelLoader},
};

/// Builder for creating and configuring Seeder instances.
pub struct SeederBuilder {
    config: SeedConfig,
    client: Option<Arc<dyn DocumentClient>>,
    loader: Option<Arc<dyn ModelLoader>>,
}

impl SeederBuilder {
    /// Creates a new builder for the given configuration.
    pub fn new(config: SeedConfig) -> Self {
        Self {
            config,
            client: None,
            loader: None,
        }
    }

    /// Sets the database client the pipeline talks to.
    pub fn with_client(mut self, client: Arc<dyn DocumentClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the loader that turns model descriptors into definitions.
    ///
    /// If not specified, definitions are read as JSON files relative to the
    /// current working directory.
    pub fn with_loader<L>(mut self, loader: L) -> Self
    where
        L: ModelLoader + 'static,
    {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Builds the configured seeder.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` if no client was supplied.
    pub fn build(self) -> Result<Seeder, ConfigError> {
        let client = self
            .client
            .ok_or_else(|| ConfigError::invalid_field("client", "no document client configured"))?;
        let loader: Arc<dyn ModelLoader> = match self.loader {
            Some(loader) => loader,
            None => Arc::new(JsonDefinitionLoader::new(".")),
        };

        Ok(Seeder::new(self.config, client, loader))
    }
}
