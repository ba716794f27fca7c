//! Database client seam.
//!
//! The pipeline never talks to a database directly. Everything goes through
//! [`DocumentClient`], shared as `Arc<dyn DocumentClient>` so concurrent
//! inserts of one stage use the same connection.
//!
//! Two implementations ship with the crate:
//!
//! - [`SqliteClient`]: a local document store keeping one SQLite file per
//!   database name, documents stored as JSON text
//! - [`MemoryClient`]: an in-process store for dry runs and tests

use async_trait::async_trait;

use crate::{
    error::ClientResult,
    models::{Document, ModelDefinition},
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryClient;
pub use sqlite::SqliteClient;

/// Operations the seeding pipeline needs from a document database.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Opens the connection described by `uri` (`scheme://host:port/name`).
    async fn connect(&self, uri: &str) -> ClientResult<()>;

    /// Closes the connection. Closing a closed client is not an error.
    async fn disconnect(&self) -> ClientResult<()>;

    /// Activates a model so its collection can be cleared and populated.
    async fn register_model(&self, definition: &ModelDefinition) -> ClientResult<()>;

    /// Deletes every document of a collection, returning how many were removed.
    async fn delete_all(&self, collection: &str) -> ClientResult<u64>;

    /// Inserts one document into a collection.
    async fn insert(&self, collection: &str, document: &Document) -> ClientResult<()>;

    /// Number of documents currently stored in a collection.
    async fn count(&self, collection: &str) -> ClientResult<u64>;
}

/// Extracts the database name from a `scheme://host:port/name` URI.
pub fn database_name(uri: &str) -> Option<&str> {
    let rest = uri.split_once("://").map_or(uri, |(_, rest)| rest);
    let (_, name) = rest.split_once('/')?;
    let name = name.split(['?', '/']).next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}
