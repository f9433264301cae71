//! Reconciliation of the model registry with what backends actually serve.
//!
//! The registry is the JSON file managed by [`crate::store`]. It is changed in
//! three ways:
//!
//! - Synchronization ([`sync`]) asks a [`ModelSource`](crate::discovery::ModelSource)
//!   which models it serves and appends them to one category list. Without
//!   `overwrite`, a discovered model is only appended when no entry of the same
//!   name is registered yet. With `overwrite`, every discovered model is
//!   appended, even if that leaves several entries sharing a name.
//! - Registration ([`register_model`]) appends a single, validated descriptor
//!   and refuses names which are already taken.
//! - Removal ([`remove_model`]) deletes every entry with a given name.
//!
//! Names are only unique within a category: the same name may be registered
//! as both a chat and an embedding model.
//!
//! Every change is a single locked read-modify-write of the registry file.
//! Nothing is retried, and a failed operation leaves the file untouched.

mod manage;
mod sync;

use thiserror::Error;

pub(crate) use manage::{register_model, remove_model};
pub(crate) use sync::{sync, SyncReport};

use crate::discovery;
use crate::model::{Category, ValidationError};
use crate::store;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// The backend could not be queried
    #[error("failed to discover {category} models at {location}: {source}")]
    Discovery {
        category: Category,
        location: String,
        #[source]
        source: discovery::Error,
    },
    /// The registry file could not be read or written
    #[error(transparent)]
    Store(#[from] store::Error),
    /// A model of the same name is already registered in the category
    #[error("a {category} model named \"{name}\" is already registered")]
    DuplicateModel { category: Category, name: String },
    /// No model of that name is registered in the category
    #[error("no {category} model named \"{name}\" is registered")]
    ModelNotFound { category: Category, name: String },
    #[error("invalid model descriptor: {0}")]
    InvalidDescriptor(#[from] ValidationError),
}

impl Error {
    /// The backend could not be reached at all.
    pub(crate) fn is_unreachable(&self) -> bool {
        matches!(self, Error::Discovery { source, .. } if source.is_unreachable())
    }

    /// The backend answered, but not with a model list.
    pub(crate) fn is_malformed_response(&self) -> bool {
        matches!(
            self,
            Error::Discovery {
                source: discovery::Error::MalformedResponse { .. },
                ..
            }
        )
    }

    /// The registry file is missing, unreadable or not a registry document.
    pub(crate) fn is_registry_read(&self) -> bool {
        matches!(self, Error::Store(store::Error::Read { .. }))
    }

    /// The registry file could not be locked or rewritten.
    pub(crate) fn is_registry_write(&self) -> bool {
        matches!(self, Error::Store(store::Error::Write { .. }))
    }
}
