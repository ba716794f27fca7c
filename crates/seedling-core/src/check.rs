//! Validating a seeding setup without touching a database.
//!
//! [`check_setup`] resolves every model definition, lists every fixture
//! file and parses each one on its own, so a single malformed file does not
//! hide the others. Everything wrong is collected as a problem instead of
//! stopping at the first one.

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use crate::{
    config::SeedConfig,
    error::StageError,
    fixtures::FixtureStore,
    registry::{ModelLoader, ModelRegistry},
};

/// A fixture file that parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixtureSummary {
    /// File name inside the fixtures directory
    pub file: String,
    pub model: String,
    /// Number of documents the file holds
    pub documents: usize,
}

/// Outcome of [`check_setup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    #[serde(rename = "db")]
    pub database_uri: String,
    /// Models whose definitions resolved, sorted
    pub models: Vec<String>,
    pub fixtures: Vec<FixtureSummary>,
    pub problems: Vec<String>,
}

impl CheckResult {
    /// Whether a run with this setup can get past validation.
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Checks model definitions and fixture files of `config`.
pub async fn check_setup(config: &SeedConfig, loader: &dyn ModelLoader) -> CheckResult {
    let mut check = CheckResult {
        database_uri: config.database.uri(),
        ..Default::default()
    };

    let mut registry = ModelRegistry::new();
    for descriptor in &config.models {
        match loader.load(descriptor) {
            Ok(definition) => registry.register(definition),
            Err(e) => check
                .problems
                .push(format!("Model {}: {e}", descriptor.name)),
        }
    }
    for name in config.duplicate_model_names() {
        check
            .problems
            .push(format!("Model {name} is listed more than once"));
    }
    check.models = registry.names().map(str::to_string).collect();

    let store = FixtureStore::new(&config.fixtures_path);
    let files = match store.fixture_files().await {
        Ok(files) => files,
        Err(e) => {
            check.problems.push(describe(&e));
            return check;
        }
    };

    for file in &files {
        match store.read_fixture(file).await {
            Ok(record) => check.fixtures.push(FixtureSummary {
                file: file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                model: record.model,
                documents: record.documents.len(),
            }),
            Err(e) => check.problems.push(describe(&e)),
        }
    }

    let names: Vec<&str> = check
        .fixtures
        .iter()
        .map(|f| f.model.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if let Err(e) = registry.validate_registered(&names) {
        check.problems.push(e.message);
    }

    debug!(
        "Checked {} fixture file(s), {} problem(s)",
        files.len(),
        check.problems.len()
    );
    check
}

fn describe(error: &StageError) -> String {
    match &error.source {
        Some(source) => format!("{}: {source}", error.message),
        None => error.message.clone(),
    }
}
