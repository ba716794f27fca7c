//! Model registration and lookup.
//!
//! A [`ModelRegistry`] is created for each run and passed explicitly to the
//! stages that need it, so separate runs never share registered models.
//! Definitions are produced by a [`ModelLoader`] supplied by the caller; the
//! default [`JsonDefinitionLoader`] reads small data-only JSON files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::{
    client::DocumentClient,
    config::ModelDescriptor,
    error::{ClientError, ClientResult, StageError},
    models::ModelDefinition,
};

/// Produces the definition a model descriptor refers to.
pub trait ModelLoader: Send + Sync {
    /// Loads the definition for one descriptor.
    fn load(&self, descriptor: &ModelDescriptor) -> ClientResult<ModelDefinition>;
}

impl<F> ModelLoader for F
where
    F: Fn(&ModelDescriptor) -> ClientResult<ModelDefinition> + Send + Sync,
{
    fn load(&self, descriptor: &ModelDescriptor) -> ClientResult<ModelDefinition> {
        self(descriptor)
    }
}

/// On-disk shape of a model definition file.
#[derive(Debug, Deserialize)]
struct DefinitionFile {
    name: Option<String>,
    collection: Option<String>,
}

/// Loads definitions from JSON files of the form
/// `{ "name": "User", "collection": "users" }`, both fields optional.
#[derive(Debug, Clone)]
pub struct JsonDefinitionLoader {
    base_dir: PathBuf,
}

impl JsonDefinitionLoader {
    /// Relative definition paths are resolved against `base_dir`.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl ModelLoader for JsonDefinitionLoader {
    fn load(&self, descriptor: &ModelDescriptor) -> ClientResult<ModelDefinition> {
        let path = self.resolve(&descriptor.definition_path);
        let text = std::fs::read_to_string(&path).map_err(|e| ClientError::FileSystem {
            path: path.clone(),
            source: e,
        })?;
        let file: DefinitionFile = serde_json::from_str(&text)?;

        if let Some(name) = file.name.as_deref() {
            if name != descriptor.name {
                return Err(ClientError::rejected(format!(
                    "definition '{}' declares model '{name}', expected '{}'",
                    path.display(),
                    descriptor.name
                )));
            }
        }

        let definition = ModelDefinition::new(descriptor.name.clone());
        Ok(match file.collection {
            Some(collection) => definition.with_collection(collection),
            None => definition,
        })
    }
}

/// Models activated in the client during one run.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelDefinition>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and activates every descriptor in order, stopping at the first
    /// failure. Descriptors after the failing one are not attempted.
    pub async fn load_models(
        &mut self,
        client: &dyn DocumentClient,
        loader: &dyn ModelLoader,
        descriptors: &[ModelDescriptor],
    ) -> crate::Result<()> {
        for descriptor in descriptors {
            let definition = loader.load(descriptor).map_err(|e| {
                StageError::load_model(format!("Cannot load model '{}'", descriptor.name))
                    .with_source(e)
            })?;

            client.register_model(&definition).await.map_err(|e| {
                StageError::load_model(format!("Cannot register model '{}'", descriptor.name))
                    .with_source(e)
            })?;

            debug!(
                "Registered model {} (collection {})",
                definition.name, definition.collection
            );
            self.register(definition);
        }
        info!("Loaded {} model(s)", descriptors.len());
        Ok(())
    }

    /// Records a definition that is already active in the client.
    pub fn register(&mut self, definition: ModelDefinition) {
        self.models.insert(definition.name.clone(), definition);
    }

    /// Checks that every name is registered, reporting all missing names at
    /// once rather than the first one.
    pub fn validate_registered<S: AsRef<str>>(&self, names: &[S]) -> crate::Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.models.contains_key(*name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(StageError::unregistered_models(&missing))
        }
    }

    /// Looks up a registered model.
    pub fn definition(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
