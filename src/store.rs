//! The on-disk model registry.
//!
//! The registry is a single JSON document holding one list per [`Category`]:
//!
//! ```json
//! { "chat_models": [ ... ], "embed_models": [ ... ] }
//! ```
//!
//! It is always read whole and rewritten whole. Every read-modify-write cycle
//! holds an exclusive lock on a sidecar `<file>.lock` so that two processes
//! updating the registry at once cannot lose each other's changes, and the new
//! contents are renamed into place so readers never see a partial file. When
//! the registry path is a symlink, the file it points to is replaced and the
//! link is left alone.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::{Category, ModelDescriptor};

#[derive(Debug, Error)]
pub(crate) enum ReadFailure {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("invalid registry document: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to read model registry {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ReadFailure,
    },
    #[error("failed to write model registry {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The full contents of the registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct RegistryDocument {
    pub chat_models: Vec<ModelDescriptor>,
    pub embed_models: Vec<ModelDescriptor>,
    /// Other top-level keys, such as gateway settings sharing the file.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryDocument {
    pub(crate) fn models(&self, category: Category) -> &[ModelDescriptor] {
        match category {
            Category::Chat => &self.chat_models,
            Category::Embed => &self.embed_models,
        }
    }
}

/// Replacement lists for some of the categories. Absent lists are left as
/// they are on disk.
#[derive(Debug, Clone, Default)]
pub(crate) struct RegistryUpdate {
    pub chat_models: Option<Vec<ModelDescriptor>>,
    pub embed_models: Option<Vec<ModelDescriptor>>,
}

impl RegistryUpdate {
    pub(crate) fn category(category: Category, models: Vec<ModelDescriptor>) -> RegistryUpdate {
        let mut update = RegistryUpdate::default();

        match category {
            Category::Chat => update.chat_models = Some(models),
            Category::Embed => update.embed_models = Some(models),
        }

        update
    }

    fn apply(self, document: &mut RegistryDocument) {
        if let Some(models) = self.chat_models {
            document.chat_models = models;
        }

        if let Some(models) = self.embed_models {
            document.embed_models = models;
        }
    }
}

/// Holds the advisory lock for as long as it lives.
struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

pub(crate) struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub(crate) fn new<P: Into<PathBuf>>(path: P) -> RegistryStore {
        RegistryStore { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// The file the registry path names, following symlinks. A dangling link
    /// resolves to where its target would be.
    fn target(&self) -> PathBuf {
        if let Ok(path) = fs::canonicalize(&self.path) {
            return path;
        }

        match fs::read_link(&self.path) {
            Ok(link) => match self.path.parent() {
                Some(dir) => dir.join(link),
                None => link,
            },
            Err(_) => self.path.clone(),
        }
    }

    fn write_error(&self, source: io::Error) -> Error {
        Error::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn lock(&self) -> Result<LockGuard, Error> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(|e| self.write_error(e))?;

        trace!(path = %self.path.display(), "waiting for registry lock");

        file.lock().map_err(|e| self.write_error(e))?;

        Ok(LockGuard { file })
    }

    fn read(&self) -> Result<RegistryDocument, Error> {
        let read_error = |source: ReadFailure| Error::Read {
            path: self.path.clone(),
            source,
        };

        let raw = fs::read_to_string(&self.path).map_err(|e| read_error(e.into()))?;

        serde_json::from_str(&raw).map_err(|e| read_error(e.into()))
    }

    fn write(&self, document: &RegistryDocument) -> Result<(), Error> {
        let target = self.target();

        let dir = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);

        document
            .serialize(&mut ser)
            .map_err(|e| self.write_error(e.into()))?;

        buf.push(b'\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;

        // The temporary file is created 0600; keep the mode of the file it replaces
        if let Ok(metadata) = fs::metadata(&target) {
            tmp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| self.write_error(e))?;
        }

        tmp.write_all(&buf).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&target)
            .map_err(|e| self.write_error(e.error))?;

        debug!(
            path = %self.path.display(),
            target = %target.display(),
            chat_models = document.chat_models.len(),
            embed_models = document.embed_models.len(),
            "wrote model registry"
        );

        Ok(())
    }

    /// Reads and parses the whole registry. Both top-level lists must be
    /// present.
    pub(crate) fn load(&self) -> Result<RegistryDocument, Error> {
        self.read()
    }

    /// Replaces the lists present in `update` and rewrites the file, keeping
    /// the other lists as they are on disk.
    pub(crate) fn save(&self, update: RegistryUpdate) -> Result<(), Error> {
        let _guard = self.lock()?;

        let mut document = self.read()?;
        update.apply(&mut document);

        self.write(&document)
    }

    /// Runs `f` on the current list for `category` and writes the result
    /// back, all under the registry lock. If `f` fails nothing is written.
    pub(crate) fn update<T, E, F>(&self, category: Category, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Vec<ModelDescriptor>) -> Result<T, E>,
        E: From<Error>,
    {
        let _guard = self.lock()?;

        let mut document = self.read()?;
        let mut models = document.models(category).to_vec();

        let out = f(&mut models)?;

        RegistryUpdate::category(category, models).apply(&mut document);
        self.write(&document)?;

        Ok(out)
    }

    /// Creates an empty registry unless a non-empty file already exists.
    /// Returns whether a file was written.
    pub(crate) fn init(&self) -> Result<bool, Error> {
        let _guard = self.lock()?;

        let existing = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    source: err.into(),
                })
            }
        };

        if !existing.trim().is_empty() {
            return Ok(false);
        }

        self.write(&RegistryDocument::default())?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Backend;
    use serde_json::json;
    use tempfile::tempdir;

    fn descriptor(name: &str) -> ModelDescriptor {
        ModelDescriptor::new(name.to_string(), format!("{}:latest", name), Backend::Ollama)
            .with_config("url", json!("http://localhost:11434"))
    }

    fn write_raw(path: &Path, raw: &str) {
        fs::write(path, raw).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let store = RegistryStore::new(dir.path().join("config.json"));

        let err = store.load().unwrap_err();

        assert!(matches!(
            err,
            Error::Read {
                source: ReadFailure::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn test_load_requires_both_lists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_raw(&path, r#"{"chat_models": []}"#);

        let err = RegistryStore::new(&path).load().unwrap_err();

        assert!(matches!(
            err,
            Error::Read {
                source: ReadFailure::Parse(_),
                ..
            }
        ));
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_raw(&path, "{ chat_models: ");

        assert!(RegistryStore::new(&path).load().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_raw(&path, r#"{"chat_models": [], "embed_models": []}"#);

        let store = RegistryStore::new(&path);

        let mut with_params = descriptor("llama3.1");
        with_params.params = Some(json!({"temperature": 0.2}));

        let update = RegistryUpdate {
            chat_models: Some(vec![with_params, descriptor("mistral")]),
            embed_models: Some(vec![descriptor("nomic-embed-text")]),
        };

        store.save(update.clone()).unwrap();

        let document = store.load().unwrap();
        assert_eq!(Some(document.chat_models), update.chat_models);
        assert_eq!(Some(document.embed_models), update.embed_models);
    }

    #[test]
    fn test_save_keeps_other_category() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = RegistryStore::new(&path);

        assert!(store.init().unwrap());

        store
            .save(RegistryUpdate::category(
                Category::Embed,
                vec![descriptor("nomic-embed-text")],
            ))
            .unwrap();
        store
            .save(RegistryUpdate::category(
                Category::Chat,
                vec![descriptor("llama3.1")],
            ))
            .unwrap();

        let document = store.load().unwrap();
        assert_eq!(document.chat_models, vec![descriptor("llama3.1")]);
        assert_eq!(document.embed_models, vec![descriptor("nomic-embed-text")]);
    }

    #[test]
    fn test_file_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = RegistryStore::new(&path);

        store.init().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\n    \"chat_models\": [],\n    \"embed_models\": []\n}\n");
    }

    #[test]
    fn test_init_keeps_existing_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = RegistryStore::new(&path);

        store.init().unwrap();
        store
            .save(RegistryUpdate::category(
                Category::Chat,
                vec![descriptor("llama3.1")],
            ))
            .unwrap();

        assert!(!store.init().unwrap());
        assert_eq!(store.load().unwrap().chat_models.len(), 1);

        // An empty file is treated as missing
        write_raw(&path, "");
        assert!(store.init().unwrap());
        assert!(store.load().unwrap().chat_models.is_empty());
    }

    #[test]
    fn test_update_failure_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = RegistryStore::new(&path);

        store.init().unwrap();
        let before = fs::read_to_string(&path).unwrap();

        #[derive(Debug)]
        struct Vetoed;

        impl From<Error> for Vetoed {
            fn from(_: Error) -> Self {
                Vetoed
            }
        }

        let res: Result<(), Vetoed> = store.update(Category::Chat, |models| {
            models.push(descriptor("llama3.1"));
            Err(Vetoed)
        });

        assert!(res.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_rewrite_keeps_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_raw(
            &path,
            r#"{
                "gateway": {"port": 8080},
                "chat_models": [{
                    "name": "llama3.1",
                    "model": "llama3.1:latest",
                    "backend": "ollama",
                    "config": {"url": "http://localhost:11434/"},
                    "params": null,
                    "description": "keep me"
                }],
                "embed_models": []
            }"#,
        );

        let store = RegistryStore::new(&path);
        store
            .save(RegistryUpdate::category(
                Category::Embed,
                vec![descriptor("nomic-embed-text")],
            ))
            .unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(written["gateway"], json!({"port": 8080}));
        assert_eq!(
            written["chat_models"][0],
            json!({
                "name": "llama3.1",
                "model": "llama3.1:latest",
                "backend": "ollama",
                "config": {"url": "http://localhost:11434/"},
                "params": null,
                "description": "keep me"
            })
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_through_symlink() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real.json");
        let link = dir.path().join("config.json");
        std::os::unix::fs::symlink("real.json", &link).unwrap();

        let store = RegistryStore::new(&link);

        // The link dangles until the registry is created
        assert!(store.init().unwrap());
        store
            .save(RegistryUpdate::category(
                Category::Chat,
                vec![descriptor("llama3.1")],
            ))
            .unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());

        let document = RegistryStore::new(&real).load().unwrap();
        assert_eq!(document.chat_models, vec![descriptor("llama3.1")]);
    }

    #[test]
    fn test_write_failure_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = RegistryStore::new(&path);

        store.init().unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // A directory where the lock file belongs cannot be opened for writing,
        // whatever the permissions of the caller
        let lock = dir.path().join("config.json.lock");
        fs::remove_file(&lock).unwrap();
        fs::create_dir(&lock).unwrap();

        let err = store
            .save(RegistryUpdate::category(
                Category::Chat,
                vec![descriptor("llama3.1")],
            ))
            .unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_init_under_a_file_fails_to_write() {
        let dir = tempdir().unwrap();
        let parent = dir.path().join("not-a-dir");
        write_raw(&parent, "");

        let err = RegistryStore::new(parent.join("config.json"))
            .init()
            .unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(fs::read_to_string(&parent).unwrap(), "");
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        RegistryStore::new(&path).init().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();

                std::thread::spawn(move || {
                    let store = RegistryStore::new(path);

                    store
                        .update(Category::Chat, |models| {
                            models.push(descriptor(&format!("model-{}", i)));
                            Ok::<(), Error>(())
                        })
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let document = RegistryStore::new(&path).load().unwrap();
        assert_eq!(document.chat_models.len(), 8);
    }
}
