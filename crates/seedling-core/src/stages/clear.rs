//! Clearing model collections.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};

use super::bounded;
use crate::{
    client::DocumentClient,
    config::ModelDescriptor,
    error::{PartialEffects, Result, StageError},
    models::{ModelDefinition, RunResult},
    registry::ModelRegistry,
};

/// Deletes every document of each model marked `clear`.
///
/// All descriptor names must be registered; otherwise nothing is deleted and
/// a model error lists every unregistered name. Deletions run concurrently.
/// Each deletion fails once `limit` elapses. If any fails, `result` is left
/// untouched and the error's partial effects list the models whose deletion
/// was confirmed.
pub async fn clear_models(
    client: &dyn DocumentClient,
    registry: &ModelRegistry,
    descriptors: &[ModelDescriptor],
    limit: Option<Duration>,
    result: &mut RunResult,
) -> Result<()> {
    let names: Vec<&str> = descriptors.iter().map(|d| d.name.as_str()).collect();
    registry.validate_registered(&names)?;

    let mut seen = BTreeSet::new();
    let targets: Vec<&ModelDefinition> = descriptors
        .iter()
        .filter(|d| d.clear && seen.insert(d.name.as_str()))
        .filter_map(|d| registry.definition(&d.name))
        .collect();

    let outcomes = join_all(targets.iter().map(|definition| async move {
        let outcome = bounded(limit, client.delete_all(&definition.collection)).await;
        (*definition, outcome)
    }))
    .await;

    let mut cleared = Vec::new();
    let mut failed = Vec::new();
    let mut first_error = None;
    for (definition, outcome) in outcomes {
        match outcome {
            Ok(removed) => {
                debug!("{} collection cleared ({removed} removed)", definition.name);
                cleared.push(definition.name.clone());
            }
            Err(e) => {
                warn!("Cannot clear {}: {e}", definition.name);
                failed.push(definition.name.as_str());
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(source) = first_error {
        return Err(
            StageError::clear_model(format!("Cannot clear models: {}", failed.join(", ")))
                .with_source(source)
                .with_partial(PartialEffects {
                    cleared,
                    ..Default::default()
                }),
        );
    }

    info!("Cleared {} model(s)", cleared.len());
    result.cleared.extend(cleared);
    Ok(())
}
