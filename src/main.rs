mod cli;
mod color;
mod config;
mod discovery;
mod model;
mod registry;
mod store;
mod utils;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cli::{
    add::add_cmd, discover::discover_cmd, init::init_cmd, list::list_cmd, remove::remove_cmd,
    sync::sync_cmd, ColorMode, Context,
};
use model::{Backend, Category};
use serde_json::Value;

#[derive(Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "modelsync")]
#[command(
    about = "Keep an LLM gateway's model registry in sync with its backends",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Read settings from this file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the JSON model registry
    #[arg(short, long, global = true)]
    registry: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Log what is happening to stderr (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty model registry
    Init,
    /// Add the models a backend serves to the registry
    Sync(SyncArgs),
    /// Show the models a backend serves without changing the registry
    Discover(DiscoverArgs),
    /// Register a single model
    Add(AddArgs),
    /// Remove a model from the registry
    Remove(RemoveArgs),
    /// List registered models
    List(ListArgs),
}

#[derive(Parser)]
pub(crate) struct SyncArgs {
    /// The registry list to synchronize
    category: Category,
    /// Base URL of the Ollama server
    #[arg(short, long)]
    url: Option<String>,
    /// Append every discovered model, even if one of the same name is registered
    #[arg(long)]
    overwrite: bool,
}

#[derive(Parser)]
pub(crate) struct DiscoverArgs {
    /// The kind of models to show
    category: Category,
    /// Base URL of the Ollama server
    #[arg(short, long)]
    url: Option<String>,
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Parser)]
pub(crate) struct AddArgs {
    /// The registry list to add the model to
    category: Category,
    /// Name the model is registered under
    name: String,
    /// Identifier of the model on the backend
    model: String,
    /// The backend serving the model
    #[arg(short, long)]
    backend: Backend,
    /// Set a backend config value, e.g. url=http://localhost:11434
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = cli::add::parse_key_value)]
    config: Vec<(String, Value)>,
    /// Set a model parameter, e.g. temperature=0.2
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = cli::add::parse_key_value)]
    params: Vec<(String, Value)>,
}

#[derive(Parser)]
pub(crate) struct RemoveArgs {
    /// The registry list to remove the model from
    category: Category,
    /// Name of the model
    name: String,
}

/// Output formats
#[derive(ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    #[value(name = "headerless_table")]
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// The registry list to show
    category: Category,
    /// Limit listing to the specified backend
    #[arg(short, long)]
    backend: Option<Backend>,
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let color = ColorMode::resolve_auto(cli.color);
    color::configure_color(color);

    cli::init_tracing(cli.verbose, color);

    let ctx = Context::load(cli.config.as_deref(), cli.registry.as_deref());

    match &cli.command {
        Commands::Init => init_cmd(&ctx),
        Commands::Sync(args) => sync_cmd(&ctx, args).await,
        Commands::Discover(args) => discover_cmd(&ctx, args).await,
        Commands::Add(args) => add_cmd(&ctx, args),
        Commands::Remove(args) => remove_cmd(&ctx, args),
        Commands::List(args) => list_cmd(&ctx, args),
    }
}
