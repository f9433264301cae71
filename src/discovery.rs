//! Discovery of the models a running backend serves.
//!
//! A [`ModelSource`] answers one question: which models of a given
//! [`Category`] does this backend currently offer? The answer is a list of
//! ready-to-store [`ModelDescriptor`]s; merging them into the registry is the
//! job of [`crate::registry`].
//!
//! Only Ollama can be queried today. It has no notion of categories, so the
//! split between chat and embedding models is made by [`Category::classify`].

mod ollama;
mod transport;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

pub(crate) use ollama::{OllamaDiscovery, DEFAULT_API_BASE};
pub(crate) use transport::{TransportError, TransportKind};

use crate::model::{Backend, Category, ModelDescriptor};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("invalid api base \"{0}\": {1}")]
    InvalidApiBase(String, #[source] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("{url} responded with {status}{}", detail(.message))]
    Status {
        url: String,
        status: StatusCode,
        message: Option<String>,
    },

    #[error("unexpected response from {url}: {source}")]
    MalformedResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {}", message),
        None => String::new(),
    }
}

impl Error {
    /// Whether the backend could not be reached at all, as opposed to
    /// answering with something unexpected.
    pub(crate) fn is_unreachable(&self) -> bool {
        match self {
            Error::Transport { source, .. } => matches!(
                source.kind(),
                TransportKind::ConnectFailed | TransportKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// A backend which can enumerate the models it serves.
#[async_trait]
pub(crate) trait ModelSource {
    /// The backend recorded in discovered descriptors.
    fn backend(&self) -> Backend;

    /// Where the backend is reached, for display.
    fn location(&self) -> &str;

    /// Lists the served models which belong to `category`. An empty list is
    /// not an error.
    async fn list_models(&self, category: Category) -> Result<Vec<ModelDescriptor>, Error>;
}
