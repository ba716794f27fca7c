//! Local document store backed by SQLite.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jiff::Timestamp;
use log::debug;
use rusqlite::{params, Connection};
use tokio::task;

use super::{database_name, DocumentClient};
use crate::{
    error::{ClientError, ClientResult, DatabaseResultExt},
    models::{Document, ModelDefinition},
};

/// Document store keeping one SQLite file per database name under a data
/// directory. Host and port of the connection URI are not used.
///
/// Every `disconnect` bumps a session counter. A `connect` that finishes
/// opening after a disconnect was requested discards its connection.
pub struct SqliteClient {
    data_dir: PathBuf,
    connection: Arc<Mutex<Option<Connection>>>,
    session: Arc<AtomicU64>,
}

impl SqliteClient {
    /// Creates a disconnected client storing databases under `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            connection: Arc::new(Mutex::new(None)),
            session: Arc::new(AtomicU64::new(0)),
        }
    }

    /// File that holds the named database.
    pub fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.db"))
    }

    /// Runs `f` against the open connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> ClientResult<T>
    where
        F: FnOnce(&Connection) -> ClientResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| ClientError::rejected("connection lock poisoned"))?;
            let conn = guard.as_ref().ok_or(ClientError::NotConnected)?;
            f(conn)
        })
        .await?
    }

    fn open(path: &Path) -> ClientResult<Connection> {
        let connection = Connection::open(path).db_context("Failed to open database file")?;
        connection
            .execute_batch(include_str!("../../assets/schema.sql"))
            .db_context("Failed to initialize database schema")?;
        Ok(connection)
    }
}

#[async_trait]
impl DocumentClient for SqliteClient {
    async fn connect(&self, uri: &str) -> ClientResult<()> {
        let name = database_name(uri).ok_or_else(|| ClientError::Connection {
            uri: uri.to_string(),
            reason: "URI does not name a database".to_string(),
        })?;
        let data_dir = self.data_dir.clone();
        let db_path = self.database_path(name);
        let connection = Arc::clone(&self.connection);
        let session = Arc::clone(&self.session);
        let started = session.load(Ordering::SeqCst);

        debug!("Opening document store at {}", db_path.display());
        task::spawn_blocking(move || {
            std::fs::create_dir_all(&data_dir).map_err(|e| ClientError::FileSystem {
                path: data_dir.clone(),
                source: e,
            })?;
            let opened = SqliteClient::open(&db_path)?;
            let mut guard = connection
                .lock()
                .map_err(|_| ClientError::rejected("connection lock poisoned"))?;
            if session.load(Ordering::SeqCst) != started {
                return Err(ClientError::Connection {
                    uri: db_path.display().to_string(),
                    reason: "disconnected while opening".to_string(),
                });
            }
            *guard = Some(opened);
            Ok(())
        })
        .await?
    }

    async fn disconnect(&self) -> ClientResult<()> {
        self.session.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::clone(&self.connection);
        task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| ClientError::rejected("connection lock poisoned"))?;
            match guard.take() {
                Some(conn) => conn
                    .close()
                    .map_err(|(_, e)| ClientError::database("Failed to close database", e)),
                None => Ok(()),
            }
        })
        .await?
    }

    async fn register_model(&self, definition: &ModelDefinition) -> ClientResult<()> {
        let name = definition.name.clone();
        let collection = definition.collection.clone();
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO models (name, collection, registered_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET collection = excluded.collection,
                 registered_at = excluded.registered_at",
                params![name, collection, Timestamp::now().to_string()],
            )
            .db_context("Failed to register model")?;
            Ok(())
        })
        .await
    }

    async fn delete_all(&self, collection: &str) -> ClientResult<u64> {
        let collection = collection.to_string();
        self.with_connection(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM documents WHERE collection = ?1",
                    params![collection],
                )
                .db_context("Failed to delete documents")?;
            Ok(removed as u64)
        })
        .await
    }

    async fn insert(&self, collection: &str, document: &Document) -> ClientResult<()> {
        let collection = collection.to_string();
        let body = serde_json::to_string(document)?;
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, body, created_at) VALUES (?1, ?2, ?3)",
                params![collection, body, Timestamp::now().to_string()],
            )
            .db_context("Failed to insert document")?;
            Ok(())
        })
        .await
    }

    async fn count(&self, collection: &str) -> ClientResult<u64> {
        let collection = collection.to_string();
        self.with_connection(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .db_context("Failed to count documents")?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
