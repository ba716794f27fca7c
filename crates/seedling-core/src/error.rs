//! Error types for the seeding pipeline.
//!
//! Three layers of errors exist:
//!
//! - [`ClientError`]: raised by collaborators (database clients, model
//!   loaders, the filesystem).
//! - [`StageError`]: what a pipeline stage reports to the orchestrator. It is
//!   tagged with the [`StageKind`] that failed and wraps the underlying cause.
//! - [`ConfigError`]: raised while loading or validating configuration,
//!   before any stage runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Boxed underlying cause carried by a [`StageError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Establishing the database connection
    Connect,
    /// Running the external backup binary
    Backup,
    /// Activating model definitions in the client
    LoadModel,
    /// Deleting documents of a model
    ClearModel,
    /// Cross-checking model names against the registry
    Model,
    /// Listing or parsing fixture files
    ReadFixture,
    /// Inserting fixture documents
    Populate,
}

impl StageKind {
    /// Stable error code used in the external error contract.
    pub fn code(&self) -> &'static str {
        match self {
            StageKind::Connect => "connect",
            StageKind::Backup => "dump",
            StageKind::LoadModel => "load",
            StageKind::ClearModel => "clear",
            StageKind::Model => "model",
            StageKind::ReadFixture => "read",
            StageKind::Populate => "populate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageKind::Connect => "connect",
            StageKind::Backup => "backup",
            StageKind::LoadModel => "load models",
            StageKind::ClearModel => "clear models",
            StageKind::Model => "model validation",
            StageKind::ReadFixture => "read fixtures",
            StageKind::Populate => "populate models",
        };
        f.write_str(label)
    }
}

/// Database mutations that were applied before a stage failed.
///
/// Nothing is rolled back, so a failed clear or populate stage reports what
/// it managed to do for diagnostic purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialEffects {
    /// Models whose deletion was confirmed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cleared: Vec<String>,
    /// Documents inserted per model
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub populated: BTreeMap<String, u64>,
}

impl PartialEffects {
    /// Returns true when nothing was applied.
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty() && self.populated.is_empty()
    }
}

/// The single error that terminates a seeding run.
#[derive(Error, Debug)]
#[error("{kind} failed: {message}")]
pub struct StageError {
    /// Stage that failed
    pub kind: StageKind,
    /// Human readable description
    pub message: String,
    /// Underlying cause, absent for pure validation failures
    #[source]
    pub source: Option<BoxError>,
    /// Effects applied before the failure, for clear and populate stages
    pub partial: Option<PartialEffects>,
}

/// Builder for creating stage errors with optional context.
pub struct StageErrorBuilder {
    kind: StageKind,
    message: String,
}

impl StageErrorBuilder {
    /// Create a new builder for the given stage.
    pub fn new(kind: StageKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source<E>(self, source: E) -> StageError
    where
        E: Into<BoxError>,
    {
        StageError {
            kind: self.kind,
            message: self.message,
            source: Some(source.into()),
            partial: None,
        }
    }

    /// Build the error without an underlying cause.
    pub fn build(self) -> StageError {
        StageError {
            kind: self.kind,
            message: self.message,
            source: None,
            partial: None,
        }
    }
}

impl StageError {
    /// Creates a builder for errors of an arbitrary stage.
    pub fn stage(kind: StageKind, message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(kind, message)
    }

    /// Creates a builder for backup errors.
    pub fn backup(message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(StageKind::Backup, message)
    }

    /// Creates a builder for model loading errors.
    pub fn load_model(message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(StageKind::LoadModel, message)
    }

    /// Creates a builder for clear errors.
    pub fn clear_model(message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(StageKind::ClearModel, message)
    }

    /// Creates a builder for fixture reading errors.
    pub fn read_fixture(message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(StageKind::ReadFixture, message)
    }

    /// Creates a builder for populate errors.
    pub fn populate(message: impl Into<String>) -> StageErrorBuilder {
        StageErrorBuilder::new(StageKind::Populate, message)
    }

    /// Creates a model validation error listing every unregistered name.
    pub fn unregistered_models<S: AsRef<str>>(missing: &[S]) -> Self {
        let names = missing
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        StageErrorBuilder::new(StageKind::Model, format!("Models not registered: {names}")).build()
    }

    /// Attaches the effects applied before the failure.
    pub fn with_partial(mut self, partial: PartialEffects) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Whether the stage was cut short by the stage timeout.
    pub fn is_timeout(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is::<tokio::time::error::Elapsed>())
    }

    /// Stable error code used in the external error contract.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Converts the error into its serializable contract form.
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.message.clone(),
            error: self.source.as_ref().map(ToString::to_string),
            partial: self.partial.clone().filter(|p| !p.is_empty()),
        }
    }
}

/// Serializable error contract handed to callers that want structured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialEffects>,
}

/// Errors raised by pipeline collaborators.
#[derive(Error, Debug)]
pub enum ClientError {
    /// SQLite errors from the local document store
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// An operation was attempted before `connect` succeeded
    #[error("Client is not connected")]
    NotConnected,
    /// The database could not be reached at the given URI
    #[error("Cannot connect to '{uri}': {reason}")]
    Connection { uri: String, reason: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// The collaborator refused the request
    #[error("Rejected: {reason}")]
    Rejected { reason: String },
    /// A blocking task panicked or was cancelled
    #[error("Task join error: {0}")]
    TaskJoin(String),
    /// The operation did not finish within the stage timeout
    #[error("Operation timed out after {} ms", .limit.as_millis())]
    TimedOut { limit: Duration },
}

impl ClientError {
    /// Creates a database error with additional context.
    pub fn database(message: impl Into<String>, source: rusqlite::Error) -> Self {
        ClientError::Database {
            message: message.into(),
            source,
        }
    }

    /// Creates a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        ClientError::Rejected {
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ClientError {
    fn from(e: tokio::task::JoinError) -> Self {
        ClientError::TaskJoin(e.to_string())
    }
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Configuration file is not valid JSON for the expected shape
    #[error("Invalid configuration: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// A field holds an unusable value
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Extension trait tagging collaborator failures with the stage they broke.
pub trait StageResultExt<T> {
    /// Map the error lazily, for messages that need formatting.
    fn stage_err_with<F>(self, kind: StageKind, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> StageResultExt<T> for std::result::Result<T, E>
where
    E: Into<BoxError>,
{
    fn stage_err_with<F>(self, kind: StageKind, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StageError::stage(kind, f()).with_source(e))
    }
}

/// Specialized extension trait for SQLite results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> ClientResult<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> ClientResult<T> {
        self.map_err(|e| ClientError::database(message, e))
    }
}

/// Result type alias for pipeline stages
pub type Result<T> = std::result::Result<T, StageError>;

/// Result type alias for collaborator operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_codes_match_contract() {
        assert_eq!(StageKind::Connect.code(), "connect");
        assert_eq!(StageKind::Backup.code(), "dump");
        assert_eq!(StageKind::LoadModel.code(), "load");
        assert_eq!(StageKind::ClearModel.code(), "clear");
        assert_eq!(StageKind::Model.code(), "model");
        assert_eq!(StageKind::ReadFixture.code(), "read");
        assert_eq!(StageKind::Populate.code(), "populate");
    }

    #[test]
    fn test_unregistered_models_lists_every_name() {
        let err = StageError::unregistered_models(&["User", "Post"]);
        assert_eq!(err.kind, StageKind::Model);
        assert_eq!(err.message, "Models not registered: User, Post");
        assert!(err.source.is_none());
    }

    #[test]
    fn test_stage_err_keeps_source() {
        let res: std::result::Result<(), ClientError> = Err(ClientError::NotConnected);
        let err = res
            .stage_err_with(StageKind::Populate, || "insert failed".to_string())
            .unwrap_err();
        assert_eq!(err.code(), "populate");
        assert_eq!(err.to_string(), "populate models failed: insert failed");
        let source = err.source.as_ref().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Client is not connected"));
    }

    #[test]
    fn test_timed_out_operation_message() {
        let err = ClientError::TimedOut {
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Operation timed out after 250 ms");
        assert!(!StageError::clear_model("boom").with_source(err).is_timeout());
    }

    #[test]
    fn test_report_omits_empty_partial() {
        let err = StageError::clear_model("boom")
            .with_source(ClientError::rejected("nope"))
            .with_partial(PartialEffects::default());
        let report = err.to_report();
        assert_eq!(report.code, "clear");
        assert_eq!(report.error.as_deref(), Some("Rejected: nope"));
        assert!(report.partial.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("partial").is_none());
    }
}
