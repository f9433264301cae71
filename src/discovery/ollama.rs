use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::{Error, ModelSource};
use crate::model::{Backend, Category, ModelDescriptor};

pub(crate) const DEFAULT_API_BASE: &str = "http://localhost:11434";

const TAGS_TIMEOUT: Duration = Duration::from_secs(40);

// Structures to deserialize /api/tags. Ollama sends more per-model metadata
// (size, digest, details) which is not needed here.

#[derive(Debug, Deserialize)]
pub(super) struct Tag {
    pub name: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct TagsList {
    models: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

pub(crate) struct OllamaDiscovery {
    /// The base URL without a trailing slash, exactly as recorded in
    /// descriptor configs.
    api_base: String,
    client: Client,
}

impl OllamaDiscovery {
    pub(crate) fn with_api_base(api_base: &str) -> Result<OllamaDiscovery, Error> {
        let trimmed = api_base.trim_end_matches('/');

        Url::parse(trimmed).map_err(|e| Error::InvalidApiBase(api_base.to_string(), e))?;

        let client = Client::builder()
            .timeout(TAGS_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport {
                url: trimmed.to_string(),
                source: e.into(),
            })?;

        Ok(OllamaDiscovery {
            api_base: trimmed.to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let raw = format!("{}{}", self.api_base, path);

        Url::parse(&raw).map_err(|e| Error::InvalidApiBase(self.api_base.clone(), e))
    }

    pub(super) async fn tags(&self) -> Result<Vec<Tag>, Error> {
        let url = self.endpoint("/api/tags")?;

        debug!(%url, "listing ollama models");

        let transport = |e: reqwest::Error| Error::Transport {
            url: url.to_string(),
            source: e.into(),
        };

        let res = self.client.get(url.clone()).send().await.map_err(transport)?;

        let status = res.status();
        let body = res.text().await.map_err(transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .ok()
                .map(|e| e.error);

            return Err(Error::Status {
                url: url.to_string(),
                status,
                message,
            });
        }

        let tags: TagsList =
            serde_json::from_str(&body).map_err(|source| Error::MalformedResponse {
                url: url.to_string(),
                source,
            })?;

        trace!(count = tags.models.len(), "ollama returned tags");

        Ok(tags.models)
    }
}

#[async_trait]
impl ModelSource for OllamaDiscovery {
    fn backend(&self) -> Backend {
        Backend::Ollama
    }

    fn location(&self) -> &str {
        &self.api_base
    }

    async fn list_models(&self, category: Category) -> Result<Vec<ModelDescriptor>, Error> {
        let tags = self.tags().await?;

        let models = tags
            .into_iter()
            .filter(|tag| Category::classify(&tag.name) == category)
            .map(|tag| {
                ModelDescriptor::new(tag.name, tag.model, Backend::Ollama)
                    .with_config("url", Value::String(self.api_base.clone()))
            })
            .collect();

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::TransportKind;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const TAGS: &str = r#"{
        "models": [
            {
                "name": "llama3.1:latest",
                "model": "llama3.1:latest",
                "modified_at": "2024-08-01T10:00:00.000000000-04:00",
                "size": 4661230766,
                "digest": "42182419e9508c30c4b1fe55015f06b65f4ca4b9e28a744be55008d21998a093",
                "details": {"format": "gguf", "family": "llama", "families": null}
            },
            {"name": "nomic-embed-text:latest", "model": "nomic-embed-text:latest"},
            {"name": "mistral", "model": "mistral:7b"}
        ]
    }"#;

    /// Serves a single canned HTTP response and reports the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]);
            let request_line = request.lines().next().unwrap_or_default().to_string();
            let _ = tx.send(request_line);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_chat_models_listed() {
        let (base, request) = serve_once("200 OK", TAGS).await;

        let ollama = OllamaDiscovery::with_api_base(&base).unwrap();
        let models = ollama.list_models(Category::Chat).await.unwrap();

        assert_eq!(request.await.unwrap(), "GET /api/tags HTTP/1.1");

        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["llama3.1:latest", "mistral"]);

        assert_eq!(models[1].model, "mistral:7b");
        assert_eq!(models[1].backend, Backend::Ollama);
        assert_eq!(models[1].config.get("url"), Some(&json!(base)));
    }

    #[tokio::test]
    async fn test_embed_models_listed() {
        let (base, _request) = serve_once("200 OK", TAGS).await;

        let ollama = OllamaDiscovery::with_api_base(&base).unwrap();
        let models = ollama.list_models(Category::Embed).await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "nomic-embed-text:latest");
    }

    #[tokio::test]
    async fn test_path_prefix_and_trailing_slash() {
        let (base, request) = serve_once("200 OK", r#"{"models": []}"#).await;

        let ollama = OllamaDiscovery::with_api_base(&format!("{}/ollama/", base)).unwrap();
        let models = ollama.list_models(Category::Chat).await.unwrap();

        assert!(models.is_empty());
        assert_eq!(request.await.unwrap(), "GET /ollama/api/tags HTTP/1.1");
        assert_eq!(ollama.location(), format!("{}/ollama", base));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (base, _request) =
            serve_once("500 Internal Server Error", r#"{"error": "out of memory"}"#).await;

        let ollama = OllamaDiscovery::with_api_base(&base).unwrap();
        let err = ollama.list_models(Category::Chat).await.unwrap_err();

        match err {
            Error::Status {
                status, message, ..
            } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(message.as_deref(), Some("out of memory"));
            }
            err => panic!("unexpected error: {}", err),
        }
    }

    #[tokio::test]
    async fn test_missing_models_key() {
        let (base, _request) = serve_once("200 OK", r#"{"tags": []}"#).await;

        let ollama = OllamaDiscovery::with_api_base(&base).unwrap();
        let err = ollama.list_models(Category::Chat).await.unwrap_err();

        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ollama = OllamaDiscovery::with_api_base(&format!("http://{}", addr)).unwrap();
        let err = ollama.list_models(Category::Chat).await.unwrap_err();

        assert!(err.is_unreachable());
        match err {
            Error::Transport { source, .. } => {
                assert_eq!(source.kind(), TransportKind::ConnectFailed)
            }
            err => panic!("unexpected error: {}", err),
        }
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(matches!(
            OllamaDiscovery::with_api_base("not a url"),
            Err(Error::InvalidApiBase(..))
        ));
    }
}
