//! Uniagric server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `UNIAGRIC_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.
//!
//! Nested keys use a double underscore, e.g.
//! `UNIAGRIC_SCRIPTS__TIMEOUT_SECS=30`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uniagric_api::ApiState;
use uniagric_server::ServerConfig;
use uniagric_store_sqlite::SqliteStore;
use uniagric_tools::{DocumentStorage, PredictionClient, RiskClient, ScriptRunner};

#[derive(Parser)]
#[command(author, version, about = "Uniagric marketplace server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("UNIAGRIC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.scripts.dir = expand_tilde(&server_cfg.scripts.dir);
  server_cfg.scripts.images_dir = expand_tilde(&server_cfg.scripts.images_dir);
  server_cfg.documents.dir = expand_tilde(&server_cfg.documents.dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let prediction = PredictionClient::new(server_cfg.prediction.clone())
    .context("failed to build prediction client")?;
  let risk = RiskClient::new(server_cfg.risk.clone())
    .context("failed to build risk client")?;
  if server_cfg.risk.api_key.is_none() {
    tracing::warn!("risk.api_key is not set; registrations get the default assessment");
  }

  tracing::info!(
    scripts = %server_cfg.scripts.dir.display(),
    images = %server_cfg.scripts.images_dir.display(),
    prediction = %server_cfg.prediction.base_url,
    risk = %server_cfg.risk.url,
    documents = %server_cfg.documents.dir.display(),
    "collaborators configured"
  );

  let state = ApiState {
    store: Arc::new(store),
    tools: Arc::new(ScriptRunner::new(server_cfg.scripts.clone())),
    prediction,
    risk,
    documents: Arc::new(DocumentStorage::new(server_cfg.documents.clone())),
  };

  let app = uniagric_server::app(state, &server_cfg.scripts);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
