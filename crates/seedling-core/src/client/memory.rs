//! In-process document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{database_name, DocumentClient};
use crate::{
    error::{ClientError, ClientResult},
    models::{Document, ModelDefinition},
};

#[derive(Default)]
struct MemoryState {
    uri: Option<String>,
    models: BTreeMap<String, String>,
    collections: HashMap<String, Vec<Document>>,
}

/// Document store living in memory. Data survives disconnects for the
/// lifetime of the client, which makes it usable for dry runs and for
/// inspecting what a run would have written.
#[derive(Default)]
pub struct MemoryClient {
    state: Mutex<MemoryState>,
}

impl MemoryClient {
    /// Creates an empty, disconnected store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> ClientResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| ClientError::rejected("memory store lock poisoned"))
    }

    fn connected(&self) -> ClientResult<MutexGuard<'_, MemoryState>> {
        let state = self.state()?;
        if state.uri.is_none() {
            return Err(ClientError::NotConnected);
        }
        Ok(state)
    }

    /// Whether `connect` succeeded and `disconnect` has not been called since.
    pub fn is_connected(&self) -> bool {
        self.state().map(|s| s.uri.is_some()).unwrap_or(false)
    }

    /// Names of registered models, sorted.
    pub fn registered_models(&self) -> Vec<String> {
        self.state()
            .map(|s| s.models.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Copy of the documents stored in a collection.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.state()
            .ok()
            .and_then(|s| s.collections.get(collection).cloned())
            .unwrap_or_default()
    }

    /// Stores documents directly, bypassing the connection check.
    pub fn preload(&self, collection: &str, documents: Vec<Document>) {
        if let Ok(mut state) = self.state() {
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .extend(documents);
        }
    }
}

#[async_trait]
impl DocumentClient for MemoryClient {
    async fn connect(&self, uri: &str) -> ClientResult<()> {
        if database_name(uri).is_none() {
            return Err(ClientError::Connection {
                uri: uri.to_string(),
                reason: "URI does not name a database".to_string(),
            });
        }
        self.state()?.uri = Some(uri.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> ClientResult<()> {
        self.state()?.uri = None;
        Ok(())
    }

    async fn register_model(&self, definition: &ModelDefinition) -> ClientResult<()> {
        self.connected()?
            .models
            .insert(definition.name.clone(), definition.collection.clone());
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> ClientResult<u64> {
        let removed = self
            .connected()?
            .collections
            .remove(collection)
            .map_or(0, |docs| docs.len());
        Ok(removed as u64)
    }

    async fn insert(&self, collection: &str, document: &Document) -> ClientResult<()> {
        self.connected()?
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(document.clone());
        Ok(())
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        let count = self
            .connected()?
            .collections
            .get(collection)
            .map_or(0, Vec::len);
        Ok(count as u64)
    }
}
