use serde::{Deserialize, Serialize};
use std::env::{self, VarError};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::discovery::DEFAULT_API_BASE;

const REGISTRY_ENV_VAR: &str = "MODELSYNC_REGISTRY";
const OLLAMA_ENV_VAR: &str = "OLLAMA_HOST";
const DEFAULT_REGISTRY: &str = "config.json";

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse {0}: not valid unicode")]
    NotUnicode(&'static str),
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Ollama {
    pub api_base: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    /// Path to the JSON model registry
    pub registry: Option<PathBuf>,
    #[serde(default)]
    pub ollama: Ollama,
}

/// Settings taken from the process environment.
#[derive(Default, Debug)]
pub(crate) struct Environment {
    pub registry: Option<String>,
    pub ollama_host: Option<String>,
}

fn env_var(name: &'static str) -> Result<Option<String>, Error> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::NotUnicode(name)),
    }
}

impl Environment {
    pub(crate) fn from_process() -> Result<Environment, Error> {
        Ok(Environment {
            registry: env_var(REGISTRY_ENV_VAR)?,
            ollama_host: env_var(OLLAMA_ENV_VAR)?,
        })
    }
}

impl Config {
    /// The registry path, by precedence: command line, environment, config
    /// file, `./config.json`.
    pub(crate) fn registry_path(&self, flag: Option<&Path>, env: &Environment) -> PathBuf {
        if let Some(path) = flag {
            path.to_path_buf()
        } else if let Some(path) = &env.registry {
            PathBuf::from(path)
        } else if let Some(path) = &self.registry {
            path.clone()
        } else {
            PathBuf::from(DEFAULT_REGISTRY)
        }
    }

    /// The Ollama base URL, by precedence: command line, environment, config
    /// file, the default local endpoint. A trailing slash is dropped.
    pub(crate) fn ollama_api_base(&self, flag: Option<&str>, env: &Environment) -> String {
        let api_base = flag
            .or(env.ollama_host.as_deref())
            .or(self.ollama.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE);

        api_base.trim_end_matches('/').to_string()
    }
}

fn get_config_path() -> Option<PathBuf> {
    let home = env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/modelsync/config.toml", ".modelsync.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/modelsync.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn extraneous_keys_helper<'a>(
    path: &mut Vec<&'a str>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extraneous: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        match (user_value, config.get(user_key)) {
            (toml::Value::Table(user_value), Some(toml::Value::Table(config_value))) => {
                extraneous_keys_helper(path, user_value, config_value, extraneous)
            }
            (_, Some(_)) => {}
            (_, None) => extraneous.push(path.join(".")),
        }

        path.pop();
    }
}

/// Dotted paths of the keys in `raw_config` which `config` does not use.
fn extraneous_keys(config: &Config, raw_config: &toml::Table) -> Vec<String> {
    let known: toml::Table = match toml::to_string(config).map(|s| toml::from_str(&s)) {
        Ok(Ok(known)) => known,
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut extraneous = Vec::new();

    extraneous_keys_helper(&mut path, raw_config, &known, &mut extraneous);

    extraneous
}

fn parse_config(path: &Path, raw_config: &str) -> Result<(Config, Vec<String>), Error> {
    let parse_error = |source| Error::Parse {
        path: path.to_path_buf(),
        source,
    };

    let config: Config = toml::from_str(raw_config).map_err(parse_error)?;
    let table: toml::Table = toml::from_str(raw_config).map_err(parse_error)?;

    let extraneous = extraneous_keys(&config, &table);

    Ok((config, extraneous))
}

/// Reads the config file given on the command line or, failing that, the
/// first one found in the usual locations. Missing config is not an error.
pub(crate) fn read_config(config: Option<&Path>) -> Result<Config, Error> {
    let config_path = config.map(Path::to_path_buf).or_else(get_config_path);

    let path = match config_path {
        Some(path) => path,
        None => return Ok(Config::default()),
    };

    let raw_config = std::fs::read_to_string(&path).map_err(|source| Error::Read {
        path: path.clone(),
        source,
    })?;

    let (config, extraneous) = parse_config(&path, &raw_config)?;

    for key in extraneous {
        crate::warn!(
            "config {} contains extraneous key \"{}\", ignoring",
            path.display(),
            key
        );
    }

    Ok(config)
}
