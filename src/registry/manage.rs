use tracing::info;

use super::Error;
use crate::model::{Category, ModelDescriptor};
use crate::store::RegistryStore;

/// Registers a single model. Fails without writing anything if a model of
/// the same name is already registered in `category`.
pub(crate) fn register_model(
    store: &RegistryStore,
    category: Category,
    descriptor: ModelDescriptor,
) -> Result<(), Error> {
    descriptor.validate()?;

    store.update(category, |models| {
        if models.iter().any(|m| m.name == descriptor.name) {
            return Err(Error::DuplicateModel {
                category,
                name: descriptor.name.clone(),
            });
        }

        info!(%category, name = %descriptor.name, backend = %descriptor.backend, "registered model");

        models.push(descriptor);

        Ok(())
    })
}

/// Removes every entry named `name` from `category` and returns how many
/// there were.
pub(crate) fn remove_model(
    store: &RegistryStore,
    category: Category,
    name: &str,
) -> Result<usize, Error> {
    store.update(category, |models| {
        let before = models.len();

        models.retain(|m| m.name != name);

        match before - models.len() {
            0 => Err(Error::ModelNotFound {
                category,
                name: name.to_string(),
            }),
            removed => {
                info!(%category, name, removed, "removed model");
                Ok(removed)
            }
        }
    })
}
