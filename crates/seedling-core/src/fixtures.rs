//! Reading fixture files from disk.

use std::path::{Path, PathBuf};

use log::debug;
use tokio::task;

use crate::{
    error::{Result, StageError},
    models::FixtureRecord,
};

const FIXTURE_EXTENSION: &str = "json";

/// A directory of `*.json` fixture files.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    path: PathBuf,
}

impl FixtureStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Lists the fixture files in the directory, sorted by name. Entries
    /// without a `.json` extension and non-files are skipped.
    pub async fn fixture_files(&self) -> Result<Vec<PathBuf>> {
        let path = self.path.clone();
        task::spawn_blocking(move || list_fixture_files(&path))
            .await
            .map_err(|e| StageError::read_fixture("Fixture listing task failed").with_source(e))?
    }

    /// Parses one fixture file.
    pub async fn read_fixture(&self, file: &Path) -> Result<FixtureRecord> {
        let file = file.to_path_buf();
        task::spawn_blocking(move || parse_fixture(&file))
            .await
            .map_err(|e| StageError::read_fixture("Fixture reading task failed").with_source(e))?
    }

    /// Parses every fixture file. The first unreadable or malformed file
    /// fails the whole read; nothing partial is returned.
    pub async fn read_fixtures(&self) -> Result<Vec<FixtureRecord>> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            list_fixture_files(&path)?
                .iter()
                .map(|file| parse_fixture(file))
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(|e| StageError::read_fixture("Fixture reading task failed").with_source(e))?
    }
}

fn list_fixture_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        StageError::read_fixture(format!("Cannot list fixtures in '{}'", dir.display()))
            .with_source(e)
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            StageError::read_fixture(format!("Cannot list fixtures in '{}'", dir.display()))
                .with_source(e)
        })?;
        let path = entry.path();
        if is_fixture_file(&path) && path.is_file() {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

fn is_fixture_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == FIXTURE_EXTENSION)
}

fn parse_fixture(file: &Path) -> Result<FixtureRecord> {
    let text = std::fs::read_to_string(file).map_err(|e| {
        StageError::read_fixture(format!("Cannot read fixture '{}'", file.display()))
            .with_source(e)
    })?;
    let record: FixtureRecord = serde_json::from_str(&text).map_err(|e| {
        StageError::read_fixture(format!("Cannot parse fixture '{}'", file.display()))
            .with_source(e)
    })?;
    debug!(
        "Read {} document(s) for {} from {}",
        record.documents.len(),
        record.model,
        file.display()
    );
    Ok(record)
}
