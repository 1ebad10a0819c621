//! Main entry point for CLI command to start the server.

use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::GraphService;
use crate::TypeGraph;
use crate::axum_factory;
use crate::configuration::Configuration;
use crate::configuration::generate_config_schema;

/// Options for the library graph server
#[derive(Parser, Debug)]
#[clap(
    name = "library-graph",
    about = "Read-only GraphQL API over authors, books and quotations",
    disable_version_flag = true
)]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[clap(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "LIBRARY_GRAPH_LOG"
    )]
    log_level: String,

    /// Configuration location relative to the current directory.
    #[clap(short, long = "config", env = "LIBRARY_GRAPH_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Seed file location, overriding `seed.path` from the configuration.
    #[clap(long = "seed", env = "LIBRARY_GRAPH_SEED_PATH")]
    seed_path: Option<PathBuf>,

    /// Prints the configuration schema.
    #[clap(long)]
    schema: bool,

    /// Prints the GraphQL schema in SDL.
    #[clap(long)]
    print_schema: bool,

    /// Display version and exit.
    #[clap(long, short = 'V')]
    version: bool,
}

/// This is the main server entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("LIBRARY_GRAPH_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    if opt.version {
        println!("{}", std::env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let graph = TypeGraph::library();
    if opt.print_schema {
        print!("{graph}");
        return Ok(());
    }

    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
    );
    if std::io::stdout().is_terminal() {
        builder.try_init()
    } else {
        builder.json().try_init()
    }
    .map_err(|error| anyhow!("could not set the global subscriber: {error}"))?;

    tracing::info!(
        "library-graph v{} starting",
        std::env!("CARGO_PKG_VERSION")
    );
    setup_panic_handler();

    let current_directory = std::env::current_dir()?;
    let mut configuration = match &opt.config_path {
        Some(path) => {
            let path = absolute(&current_directory, path);
            tracing::info!(path = %path.display(), "loading configuration");
            Configuration::from_path(&path)?
        }
        None => Configuration::default(),
    };
    if let Some(seed_path) = &opt.seed_path {
        configuration.seed.path = Some(absolute(&current_directory, seed_path));
    }

    let store = configuration.seed.load()?.into_store();
    let service = GraphService::new(Arc::new(graph), Arc::new(store));
    let router = axum_factory::make_router(&configuration, service);
    let listener = axum_factory::bind(&configuration).await?;

    if let Err(err) = axum_factory::serve(listener, router, shutdown_signal()).await {
        tracing::error!("{}", err);
        return Err(err.into());
    }
    tracing::info!("stopped");
    Ok(())
}

fn absolute(current_directory: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        current_directory.join(path)
    } else {
        path.to_path_buf()
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "could not listen for ctrl-c, shutting down");
        return;
    }
    tracing::info!("received ctrl-c, shutting down");
}

fn setup_panic_handler() {
    // Redirect panics to the logs.
    std::panic::set_hook(Box::new(move |e| {
        tracing::error!("{}", e);
    }));
}
