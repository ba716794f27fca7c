//! Seeding configuration.
//!
//! A [`SeedConfig`] is supplied once when a [`crate::Seeder`] is built and
//! stays immutable for the whole run. It is usually read from a JSON file:
//!
//! ```json
//! {
//!   "database": { "host": "localhost", "port": 27017, "name": "app" },
//!   "backup": { "enabled": true, "extraArgs": ["--gzip"] },
//!   "models": [
//!     { "name": "User", "definitionPath": "models/user.json" },
//!     { "name": "Post", "definitionPath": "models/post.json", "clear": false }
//!   ],
//!   "fixturesPath": "fixtures"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_SCHEME: &str = "mongodb";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 27017;
const DEFAULT_BACKUP_BINARY: &str = "/usr/local/bin/mongodump";

/// Complete configuration for one seeding run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct SeedConfig {
    /// Database to connect to
    pub database: DatabaseConfig,
    /// Optional backup taken before any destructive stage
    #[serde(default)]
    pub backup: BackupConfig,
    /// Models to register, clear and populate
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
    /// Directory holding the `*.json` fixture files
    pub fixtures_path: PathBuf,
    /// Upper bound for each stage, in milliseconds. No limit when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
}

/// Connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub name: String,
}

/// Settings for the external backup binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct BackupConfig {
    #[serde(default = "default_backup_binary")]
    pub binary_path: PathBuf,
    #[serde(default)]
    pub enabled: bool,
    /// Appended after the default arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// A model the pipeline should make available in the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub name: String,
    pub definition_path: PathBuf,
    /// Delete every existing document of the model before populating
    #[serde(default = "default_clear")]
    pub clear: bool,
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_backup_binary() -> PathBuf {
    PathBuf::from(DEFAULT_BACKUP_BINARY)
}

fn default_clear() -> bool {
    true
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            binary_path: default_backup_binary(),
            enabled: false,
            extra_args: Vec::new(),
        }
    }
}

impl DatabaseConfig {
    /// Creates settings for the named database on the default host and port.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            name: name.into(),
        }
    }

    /// Connection URI in the form `scheme://host:port/name`.
    pub fn uri(&self) -> String {
        format!("{}://{}:{}/{}", self.scheme, self.host, self.port, self.name)
    }
}

impl ModelDescriptor {
    /// Creates a descriptor that clears the model before populating.
    pub fn new(name: impl Into<String>, definition_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            definition_path: definition_path.into(),
            clear: true,
        }
    }

    /// Sets whether the model is cleared.
    pub fn with_clear(mut self, clear: bool) -> Self {
        self.clear = clear;
        self
    }
}

impl SeedConfig {
    /// Creates a configuration with no models and backups disabled.
    pub fn new(database: DatabaseConfig, fixtures_path: impl Into<PathBuf>) -> Self {
        Self {
            database,
            backup: BackupConfig::default(),
            models: Vec::new(),
            fixtures_path: fixtures_path.into(),
            stage_timeout_ms: None,
        }
    }

    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SeedConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file. Relative `fixturesPath` values are
    /// resolved against the file's directory.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::FileSystem {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_json_str(&json)?;

        if config.fixtures_path.is_relative() {
            if let Some(base) = path.parent() {
                config.fixtures_path = base.join(&config.fixtures_path);
            }
        }
        Ok(config)
    }

    /// Returns the default configuration file path following XDG Base
    /// Directory specification: `$XDG_CONFIG_HOME/seedling/seed.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        xdg::BaseDirectories::with_prefix("seedling")
            .place_config_file("seed.json")
            .map_err(|e| ConfigError::XdgDirectory(e.to_string()))
    }

    /// Returns the default directory for local document stores:
    /// `$XDG_DATA_HOME/seedling/stores`.
    pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
        xdg::BaseDirectories::with_prefix("seedling")
            .create_data_directory("stores")
            .map_err(|e| ConfigError::XdgDirectory(e.to_string()))
    }

    /// Adds a model descriptor.
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    /// Sets the backup settings.
    pub fn with_backup(mut self, backup: BackupConfig) -> Self {
        self.backup = backup;
        self
    }

    /// Sets the per-stage timeout.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Per-stage timeout, if configured.
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }

    /// Model names that appear more than once, in first-seen order.
    ///
    /// Duplicates are not rejected; registering the same name twice simply
    /// replaces the earlier definition.
    pub fn duplicate_model_names(&self) -> Vec<String> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for model in &self.models {
            let count = seen.entry(model.name.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicates.push(model.name.clone());
            }
        }
        duplicates
    }

    /// Structural checks that make a run impossible.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::invalid_field(
                "database.name",
                "must not be empty",
            ));
        }
        if self.database.name.contains('/') {
            return Err(ConfigError::invalid_field(
                "database.name",
                "must not contain '/'",
            ));
        }
        if let Some(model) = self.models.iter().find(|m| m.name.trim().is_empty()) {
            return Err(ConfigError::invalid_field(
                "models.name",
                format!(
                    "empty model name for definition '{}'",
                    model.definition_path.display()
                ),
            ));
        }
        if self.stage_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_field(
                "stageTimeoutMs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
