//! keel server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens a
//! SQLite world state, registers the configured asset classes, and serves the
//! JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use keel_core::{class::ClassRegistry, engine::AssetEngine, store::NoRules};
use keel_server::{ServerConfig, expand_tilde};
use keel_store_sqlite::SqliteWorldState;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Keel asset store server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Validate the configuration, print the class registry and exit.
  #[arg(long)]
  check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let registry = ClassRegistry::new(server_cfg.classes.clone())
    .context("invalid asset class configuration")?;
  if registry.is_empty() {
    tracing::warn!("no asset classes configured; only reads of class All will succeed");
  }

  if cli.check_config {
    for class in registry.classes() {
      println!("{class}");
    }
    return Ok(());
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteWorldState::open(&store_path)
    .await
    .with_context(|| format!("failed to open world state at {store_path:?}"))?;

  let engine = Arc::new(AssetEngine::new(store, NoRules, registry));
  let app = keel_server::router(engine);
  let address = server_cfg.address();

  tracing::info!(classes = server_cfg.classes.len(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
