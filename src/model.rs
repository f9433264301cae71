//! Type definitions for registry entries
//!
//! A registry holds two independent lists of [`ModelDescriptor`]s, one per
//! [`Category`]. Descriptors are stored verbatim: the `config` and `params`
//! objects are opaque to everything except [`ModelDescriptor::validate`], and
//! keys this crate does not know about are carried through rewrites as they
//! were read.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The registry list a model belongs to.
///
/// The `to_string` and `FromStr` forms are part of the CLI and should remain stable.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Category {
    /// Models used for chat completions
    Chat,
    /// Models used to compute embeddings
    Embed,
}

impl Category {
    /// Guess the category of a model served by a backend from its name.
    ///
    /// Ollama does not report what a model is for, so any name containing
    /// `embed` (case-sensitive) is taken to be an embedding model.
    pub(crate) fn classify(name: &str) -> Category {
        if name.contains("embed") {
            Category::Embed
        } else {
            Category::Chat
        }
    }
}

/// The LLM-serving system a descriptor targets.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Backend {
    Ollama,
    #[serde(rename = "openai")]
    #[strum(to_string = "openai")]
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[serde(rename = "azure_openai", alias = "azure")]
    #[strum(to_string = "azure_openai", serialize = "azure")]
    #[value(name = "azure_openai", alias = "azure")]
    AzureOpenAI,
}

impl Backend {
    /// Keys accepted in the `config` object of a descriptor for this backend.
    fn config_keys(self) -> &'static [&'static str] {
        match self {
            Backend::Ollama => &["url"],
            Backend::OpenAI | Backend::Anthropic => &["api_base"],
            Backend::AzureOpenAI => &["endpoint", "api_version", "deployment"],
        }
    }

    fn required_config_keys(self) -> &'static [&'static str] {
        match self {
            Backend::AzureOpenAI => &["deployment"],
            _ => &[],
        }
    }
}

const URL_CONFIG_KEYS: [&str; 3] = ["url", "api_base", "endpoint"];

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ValidationError {
    #[error("model name must not be empty")]
    EmptyName,
    #[error("model identifier must not be empty")]
    EmptyModel,
    #[error("config key \"{key}\" is not supported by the {backend} backend")]
    UnknownConfigKey { backend: Backend, key: String },
    #[error("the {backend} backend requires the config key \"{key}\"")]
    MissingConfigKey { backend: Backend, key: &'static str },
    #[error("config key \"{key}\" must be an http or https URL with a host")]
    InvalidUrl { key: String },
    #[error("params must be an object")]
    InvalidParams,
}

/// One usable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ModelDescriptor {
    /// User-facing identifier, unique within its category.
    pub name: String,
    /// The identifier the backend knows the model by.
    pub model: String,
    pub backend: Backend,
    /// Backend-specific connection parameters.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Model parameters such as `temperature`. An explicit `null` is read as
    /// `Some(Value::Null)` and written back as such.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub params: Option<Value>,
    /// Any other keys of the entry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Maps a key that is present to `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn is_http_url(value: &Value) -> bool {
    let parsed = match value.as_str().map(url::Url::parse) {
        Some(Ok(parsed)) => parsed,
        _ => return false,
    };

    matches!(parsed.scheme(), "http" | "https") && parsed.has_host()
}

impl ModelDescriptor {
    pub(crate) fn new(name: String, model: String, backend: Backend) -> ModelDescriptor {
        ModelDescriptor {
            name,
            model,
            backend,
            config: Map::new(),
            params: None,
            extra: Map::new(),
        }
    }

    pub(crate) fn with_config(mut self, key: &str, value: Value) -> ModelDescriptor {
        self.config.insert(key.to_string(), value);
        self
    }

    /// The connection URL, if the backend config carries one.
    pub(crate) fn endpoint(&self) -> Option<&str> {
        URL_CONFIG_KEYS
            .iter()
            .find_map(|key| self.config.get(*key))
            .and_then(Value::as_str)
    }

    /// Checks that the config matches what the backend accepts.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.model.trim().is_empty() {
            return Err(ValidationError::EmptyModel);
        }

        let accepted = self.backend.config_keys();

        for (key, value) in &self.config {
            if !accepted.contains(&key.as_str()) {
                return Err(ValidationError::UnknownConfigKey {
                    backend: self.backend,
                    key: key.clone(),
                });
            }

            if URL_CONFIG_KEYS.contains(&key.as_str()) && !is_http_url(value) {
                return Err(ValidationError::InvalidUrl { key: key.clone() });
            }
        }

        if !matches!(self.params, None | Some(Value::Null) | Some(Value::Object(_))) {
            return Err(ValidationError::InvalidParams);
        }

        for &key in self.backend.required_config_keys() {
            if !self.config.contains_key(key) {
                return Err(ValidationError::MissingConfigKey {
                    backend: self.backend,
                    key,
                });
            }
        }

        Ok(())
    }
}
