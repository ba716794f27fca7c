#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use seedling_core::{
    ClientError, ClientResult, Document, DocumentClient, MemoryClient, ModelDefinition,
};
use serde_json::Value;

/// Memory-backed client with injectable failures.
#[derive(Default)]
pub struct FaultyClient {
    pub inner: MemoryClient,
    refuse_connect: bool,
    failing_deletes: HashSet<String>,
    failing_insert: Option<(String, usize)>,
    delete_delays: HashMap<String, Duration>,
    connect_delay: Option<Duration>,
    inserts: Mutex<HashMap<String, usize>>,
    disconnects: AtomicUsize,
}

impl FaultyClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection attempt fails as if the host were unreachable.
    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Deleting the given collection fails.
    pub fn failing_delete(mut self, collection: &str) -> Self {
        self.failing_deletes.insert(collection.to_string());
        self
    }

    /// The `nth` insert (1-based) into `collection` fails.
    pub fn failing_insert(mut self, collection: &str, nth: usize) -> Self {
        self.failing_insert = Some((collection.to_string(), nth));
        self
    }

    /// Deleting the given collection sleeps before completing.
    pub fn slow_delete(mut self, collection: &str, delay: Duration) -> Self {
        self.delete_delays.insert(collection.to_string(), delay);
        self
    }

    /// Connecting sleeps before completing.
    pub fn slow_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentClient for FaultyClient {
    async fn connect(&self, uri: &str) -> ClientResult<()> {
        if self.refuse_connect {
            return Err(ClientError::Connection {
                uri: uri.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.connect(uri).await
    }

    async fn disconnect(&self) -> ClientResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.inner.disconnect().await
    }

    async fn register_model(&self, definition: &ModelDefinition) -> ClientResult<()> {
        self.inner.register_model(definition).await
    }

    async fn delete_all(&self, collection: &str) -> ClientResult<u64> {
        if let Some(delay) = self.delete_delays.get(collection) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_deletes.contains(collection) {
            return Err(ClientError::rejected(format!("cannot delete {collection}")));
        }
        self.inner.delete_all(collection).await
    }

    async fn insert(&self, collection: &str, document: &Document) -> ClientResult<()> {
        let attempt = {
            let mut inserts = self.inserts.lock().expect("insert counter lock");
            let count = inserts.entry(collection.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if let Some((failing, nth)) = &self.failing_insert {
            if failing == collection && *nth == attempt {
                return Err(ClientError::rejected(format!(
                    "duplicate key in {collection}"
                )));
            }
        }
        self.inner.insert(collection, document).await
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        self.inner.count(collection).await
    }
}

/// Builds a document from a JSON object literal.
pub fn doc(value: Value) -> Document {
    value
        .as_object()
        .cloned()
        .expect("fixture documents must be objects")
}

/// Writes a fixture file into `dir`.
pub fn write_fixture(dir: &Path, file: &str, model: &str, documents: &[Value]) {
    let contents = serde_json::json!({ "model": model, "documents": documents });
    std::fs::write(dir.join(file), contents.to_string()).expect("Failed to write fixture");
}

/// Definition whose collection is named after the model.
pub fn same_name_loader(
    descriptor: &seedling_core::ModelDescriptor,
) -> ClientResult<ModelDefinition> {
    Ok(ModelDefinition::new(descriptor.name.clone()))
}
