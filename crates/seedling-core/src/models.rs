//! Data carried through the seeding pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An untyped fixture document, inserted verbatim.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Contents of one fixture file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    /// Name of the model the documents belong to
    pub model: String,
    /// Documents in file order
    pub documents: Vec<Document>,
}

impl FixtureRecord {
    /// Creates a record for the given model.
    pub fn new(model: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            model: model.into(),
            documents,
        }
    }
}

/// A model as activated in the database client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model name, e.g. `User`
    pub name: String,
    /// Collection holding the model's documents
    pub collection: String,
}

impl ModelDefinition {
    /// Creates a definition whose collection is named after the model.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            collection: name.clone(),
            name,
        }
    }

    /// Overrides the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

/// Aggregate outcome of a successful seeding run.
///
/// Only models that a stage actually touched appear in `cleared` and
/// `populated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Connection URI the run used
    #[serde(rename = "db")]
    pub database_uri: String,
    /// Models whose collections were emptied
    pub cleared: Vec<String>,
    /// Inserted document count per model
    #[serde(rename = "populate")]
    pub populated: BTreeMap<String, u64>,
}

impl RunResult {
    /// Creates an empty result for the given connection URI.
    pub fn new(database_uri: impl Into<String>) -> Self {
        Self {
            database_uri: database_uri.into(),
            ..Default::default()
        }
    }

    /// Total number of documents inserted across all models.
    pub fn total_inserted(&self) -> u64 {
        self.populated.values().sum()
    }
}
