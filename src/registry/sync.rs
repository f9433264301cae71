use std::collections::HashSet;

use tracing::{debug, info};

use super::Error;
use crate::discovery::ModelSource;
use crate::model::{Category, ModelDescriptor};
use crate::store::RegistryStore;

/// The outcome of a synchronization.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct SyncReport {
    /// Names appended to the registry, in discovery order
    pub added: Vec<String>,
    /// Discovered names left out because they were already registered
    pub skipped: Vec<String>,
}

/// Appends the models `source` serves for `category` to the registry.
///
/// The registry is read before the backend is contacted so that a missing or
/// broken registry is reported without a network round trip. The merge itself
/// runs against the list as it is on disk when the lock is taken.
pub(crate) async fn sync(
    store: &RegistryStore,
    source: &dyn ModelSource,
    category: Category,
    overwrite: bool,
) -> Result<SyncReport, Error> {
    store.load()?;

    let discovered = source
        .list_models(category)
        .await
        .map_err(|source_err| Error::Discovery {
            category,
            location: source.location().to_string(),
            source: source_err,
        })?;

    debug!(
        %category,
        backend = %source.backend(),
        discovered = discovered.len(),
        overwrite,
        "merging discovered models"
    );

    let report = store.update(category, |models| {
        Ok::<_, Error>(merge(models, discovered, overwrite))
    })?;

    info!(
        %category,
        added = report.added.len(),
        skipped = report.skipped.len(),
        "synchronized model registry"
    );

    Ok(report)
}

/// The names already present are captured once, before anything is appended,
/// so two discovered models sharing a new name are both kept.
fn merge(
    models: &mut Vec<ModelDescriptor>,
    discovered: Vec<ModelDescriptor>,
    overwrite: bool,
) -> SyncReport {
    let known: HashSet<String> = models.iter().map(|m| m.name.clone()).collect();

    let mut report = SyncReport::default();

    for model in discovered {
        if overwrite || !known.contains(&model.name) {
            report.added.push(model.name.clone());
            models.push(model);
        } else {
            report.skipped.push(model.name);
        }
    }

    report
}
