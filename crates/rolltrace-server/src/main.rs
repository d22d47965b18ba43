//! rolltrace server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and
//! `ROLLTRACE_*` environment variables, opens an in-process SQLite store,
//! and serves the roll tracking API over HTTP.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `ROLLTRACE_GEOCODER__ENABLED=true`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use rolltrace_api::HttpGeocoder;
use rolltrace_core::Tracker;
use rolltrace_server::ServerConfig;
use rolltrace_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "rolltrace roll tracking server")]
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
    .add_source(
      config::Environment::with_prefix("ROLLTRACE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let geo = &server_cfg.geocoder;
  let app = if geo.enabled {
    let geocoder =
      HttpGeocoder::new(geo.base_url.clone(), &geo.user_agent, geo.timeout())
        .context("failed to build geocoder client")?;
    tracing::info!(base_url = %geo.base_url, "reverse geocoding enabled");
    rolltrace_server::app(
      Tracker::new(store, Arc::new(geocoder))
        .with_geocode_timeout(geo.timeout()),
    )
  } else {
    rolltrace_server::app(Tracker::without_geocoder(store))
  };

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
