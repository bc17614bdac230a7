//! Server wiring for Keel: configuration, router assembly, and helpers shared
//! by the `keel` binary.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use config::{Config, ConfigError, Environment, Source};
use keel_core::{
  class::AssetClass,
  engine::AssetEngine,
  store::{RulesHook, WorldState},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `KEEL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  /// Asset classes registered at startup; fixed for the process lifetime.
  #[serde(default)]
  pub classes:    Vec<AssetClass>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 7070 }

impl ServerConfig {
  /// Load from an optional TOML file at `path`, overridden by the
  /// environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_source(config::File::from(path).required(false))
  }

  /// Load from `source`, overridden by the environment.
  pub fn from_source<T>(source: T) -> Result<Self, ConfigError>
  where
    T: Source + Send + Sync + 'static,
  {
    Config::builder()
      .add_source(source)
      .add_source(Environment::with_prefix("KEEL"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router mounted under `/api`, with HTTP request tracing.
pub fn router<S, R>(engine: Arc<AssetEngine<S, R>>) -> Router
where
  S: WorldState + 'static,
  R: RulesHook + 'static,
{
  Router::new()
    .nest("/api", keel_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};

  use super::*;

  const SAMPLE: &str = r#"
store_path = "/var/lib/keel/world.db"
port = 9090

[[classes]]
name = "thermostat"
prefix = "THERM"
assetIDpath = "id"

[[classes]]
name = "container"
prefix = "CON"
assetIDpath = "common.assetID"
"#;

  #[test]
  fn parses_classes_and_defaults() {
    let cfg =
      ServerConfig::from_source(File::from_str(SAMPLE, FileFormat::Toml))
        .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9090);
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/keel/world.db"));
    assert_eq!(
      cfg.classes,
      vec![
        AssetClass::new("thermostat", "THERM", "id"),
        AssetClass::new("container", "CON", "common.assetID"),
      ]
    );
    assert_eq!(cfg.address(), "127.0.0.1:9090");
  }

  #[test]
  fn missing_store_path_is_an_error() {
    let result =
      ServerConfig::from_source(File::from_str("port = 1", FileFormat::Toml));
    assert!(result.is_err());
  }

  #[test]
  fn leaves_plain_paths_alone() {
    assert_eq!(
      expand_tilde(Path::new("/tmp/world.db")),
      PathBuf::from("/tmp/world.db")
    );
  }
}
