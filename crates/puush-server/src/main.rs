//! puush server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) overlaid with
//! `PUUSH_*` environment variables, opens the SQLite registry and the blob
//! directory, and serves the file host over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use puush_server::{AppState, ServerConfig, blob::BlobStore};
use puush_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "puush file host")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
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
    .add_source(config::Environment::with_prefix("PUUSH").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  server_cfg.root_directory = expand_tilde(&server_cfg.root_directory);
  server_cfg.database_path = expand_tilde(&server_cfg.database_path);

  let blobs = BlobStore::open(&server_cfg.root_directory)
    .await
    .with_context(|| format!("failed to open blob root {:?}", server_cfg.root_directory))?;

  let swept = blobs
    .sweep_pending()
    .await
    .context("failed to sweep pending uploads")?;
  if swept > 0 {
    tracing::warn!(count = swept, "removed pending blobs from interrupted uploads");
  }

  let store = SqliteStore::open(&server_cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.database_path))?;

  let state = AppState {
    registry: Arc::new(store),
    blobs:    Arc::new(blobs),
    config:   Arc::new(server_cfg.clone()),
  };

  let app = puush_server::router(state);
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
