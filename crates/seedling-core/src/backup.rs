//! Backup of the target database before destructive stages.
//!
//! The backup itself is delegated to an external binary (`mongodump` by
//! default). Each run writes to its own directory next to the fixtures:
//! `<fixturesPath>/../backup/<name>-<unixTimeMillis>`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use jiff::Timestamp;
use log::{debug, info, warn};
use tokio::process::Command;

use crate::{
    config::{BackupConfig, SeedConfig},
    error::{Result, StageError},
};

/// Runs the configured backup binary.
#[derive(Debug, Clone)]
pub struct BackupRunner {
    binary: PathBuf,
    database: String,
    fixtures_path: PathBuf,
    extra_args: Vec<String>,
}

impl BackupRunner {
    /// Creates a runner for the database and fixtures of `config`.
    pub fn new(config: &SeedConfig) -> Self {
        let BackupConfig {
            binary_path,
            extra_args,
            ..
        } = &config.backup;
        Self {
            binary: binary_path.clone(),
            database: config.database.name.clone(),
            fixtures_path: config.fixtures_path.clone(),
            extra_args: extra_args.clone(),
        }
    }

    /// Destination directory for a backup taken at `timestamp_ms`.
    pub fn destination(&self, timestamp_ms: i64) -> PathBuf {
        self.fixtures_path
            .join("..")
            .join("backup")
            .join(format!("{}-{timestamp_ms}", self.database))
    }

    /// Arguments passed to the binary: the defaults followed by the
    /// caller-supplied extras.
    pub fn args(&self, destination: &Path) -> Vec<String> {
        let mut args = vec![
            "--db".to_string(),
            self.database.clone(),
            "--out".to_string(),
            destination.display().to_string(),
            "--quiet".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Spawns the binary and waits for it to exit.
    ///
    /// Fails when the binary cannot be spawned or exits unsuccessfully.
    /// Returns the directory the backup was written to.
    pub async fn run(&self) -> Result<PathBuf> {
        let destination = self.destination(Timestamp::now().as_millisecond());
        let args = self.args(&destination);
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                StageError::backup(format!("Cannot spawn '{}'", self.binary.display()))
                    .with_source(e)
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("backup stdout: {line}");
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            warn!("backup stderr: {line}");
        }

        if !output.status.success() {
            let tail = stderr.lines().last().unwrap_or_default().trim();
            let message = if tail.is_empty() {
                format!("'{}' exited with {}", self.binary.display(), output.status)
            } else {
                format!(
                    "'{}' exited with {}: {tail}",
                    self.binary.display(),
                    output.status
                )
            };
            return Err(StageError::backup(message).build());
        }

        info!("Backup written to {}", destination.display());
        Ok(destination)
    }
}
