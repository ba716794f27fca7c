//! Inserting fixture documents.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};

use super::bounded;
use crate::{
    client::DocumentClient,
    error::{PartialEffects, Result, StageError},
    models::{FixtureRecord, RunResult},
    registry::ModelRegistry,
};

/// Inserts every document of every record, one insert per document.
///
/// Every model referenced by `records` must be registered; otherwise nothing
/// is inserted and a model error lists every unregistered name. Inserts run
/// concurrently, each failing once `limit` elapses, and all of them settle
/// before the stage reports. If any insert fails, `result` is left untouched
/// and the error's partial effects hold the per-model counts that were
/// inserted anyway.
pub async fn populate_models(
    client: &dyn DocumentClient,
    registry: &ModelRegistry,
    records: &[FixtureRecord],
    limit: Option<Duration>,
    result: &mut RunResult,
) -> Result<()> {
    let names: Vec<&str> = records
        .iter()
        .map(|r| r.model.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    registry.validate_registered(&names)?;

    let mut inserts = Vec::new();
    for record in records {
        let Some(definition) = registry.definition(&record.model) else {
            continue;
        };
        for (index, document) in record.documents.iter().enumerate() {
            inserts.push(async move {
                let insert = client.insert(&definition.collection, document);
                let outcome = bounded(limit, insert).await;
                (definition.name.as_str(), index, outcome)
            });
        }
    }
    debug!("Inserting {} document(s)", inserts.len());
    let outcomes = join_all(inserts).await;

    let mut populated: BTreeMap<String, u64> =
        names.iter().map(|name| (name.to_string(), 0)).collect();
    let mut failures = 0usize;
    let mut first_error = None;
    for (model, index, outcome) in outcomes {
        match outcome {
            Ok(()) => *populated.entry(model.to_string()).or_insert(0) += 1,
            Err(e) => {
                warn!("Error creating document [{index}] of {model} model: {e}");
                failures += 1;
                first_error.get_or_insert((model, index, e));
            }
        }
    }

    if let Some((model, index, source)) = first_error {
        let message = if failures > 1 {
            format!(
                "Error creating document [{index}] of {model} model and {} more",
                failures - 1
            )
        } else {
            format!("Error creating document [{index}] of {model} model")
        };
        populated.retain(|_, count| *count > 0);
        return Err(StageError::populate(message)
            .with_source(source)
            .with_partial(PartialEffects {
                populated,
                ..Default::default()
            }));
    }

    info!(
        "Populated {} model(s) with {} document(s)",
        populated.len(),
        populated.values().sum::<u64>()
    );
    result.populated.extend(populated);
    Ok(())
}
