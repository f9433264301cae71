use std::io::{self, IsTerminal};
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::{self, Config, Environment};
use crate::discovery::OllamaDiscovery;
use crate::registry;
use crate::store::RegistryStore;
use crate::{die, RequestedColorMode};

pub(crate) mod add;
pub(crate) mod discover;
pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod remove;
pub(crate) mod sync;

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable If the user hasn't stated a preference, color is enabled if the
    /// output is a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

/// Sends `tracing` output to stderr. Silent unless `-v` is given or
/// `RUST_LOG` is set.
pub(crate) fn init_tracing(verbose: u8, color: ColorMode) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
        1 => EnvFilter::new("modelsync=debug"),
        _ => EnvFilter::new("modelsync=trace"),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(matches!(color, ColorMode::On))
        .with_target(false)
        .try_init();

    if let Err(err) = installed {
        crate::warn!("diagnostics disabled: {}", err);
    }
}

/// Everything a command needs, resolved once from the command line, the
/// environment and the config file.
pub(crate) struct Context {
    config: Config,
    env: Environment,
    pub store: RegistryStore,
}

impl Context {
    pub(crate) fn load(config_path: Option<&Path>, registry: Option<&Path>) -> Context {
        let config = match config::read_config(config_path) {
            Ok(config) => config,
            Err(err) => die!("{}", err),
        };

        let env = match Environment::from_process() {
            Ok(env) => env,
            Err(err) => die!("{}", err),
        };

        let store = RegistryStore::new(config.registry_path(registry, &env));

        Context { config, env, store }
    }

    pub(crate) fn ollama(&self, url: Option<&str>) -> OllamaDiscovery {
        let api_base = self.config.ollama_api_base(url, &self.env);

        match OllamaDiscovery::with_api_base(&api_base) {
            Ok(ollama) => ollama,
            Err(err) => die!("{}", err),
        }
    }
}

/// Reports a failed registry operation and exits.
pub(crate) fn fail(err: registry::Error) -> ! {
    if let registry::Error::Discovery { location, .. } = &err {
        if err.is_unreachable() {
            die!(
                "{}\nhint: is ollama running at {}? Set OLLAMA_HOST or pass --url",
                err,
                location
            );
        }

        if err.is_malformed_response() {
            die!("{}\nhint: is {} an ollama server?", err, location);
        }
    }

    if err.is_registry_read() {
        die!("{}\nhint: run `modelsync init` to create an empty registry", err);
    }

    die!("{}", err)
}
