//! HTTP service wiring for rolltrace.
//!
//! Mounts the JSON API under `/api` next to two unauthenticated health
//! probes, and holds the configuration the binary reads at startup.

use std::{path::PathBuf, time::Duration};

use axum::{Json, Router, routing::get};
use rolltrace_core::{Tracker, geocode::Geocoder, store::TrackStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROLLTRACE_*` environment variables. Every key has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  pub geocoder:   GeocoderConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8000,
      store_path: PathBuf::from("rolltrace.db"),
      geocoder:   GeocoderConfig::default(),
    }
  }
}

/// Reverse geocoding for delivery confirmations. Off unless enabled.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
  pub enabled:    bool,
  pub base_url:   String,
  pub user_agent: String,
  pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
  fn default() -> Self {
    Self {
      enabled:    false,
      base_url:   "https://nominatim.openstreetmap.org".to_string(),
      user_agent: concat!("rolltrace/", env!("CARGO_PKG_VERSION")).to_string(),
      timeout_ms: 3000,
    }
  }
}

impl GeocoderConfig {
  pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The whole service: health probes at the root, the API under `/api`.
pub fn app<S, G>(tracker: Tracker<S, G>) -> Router
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  Router::new()
    .route("/", get(root))
    .route("/health/", get(health))
    .nest("/api", rolltrace_api::api_router(tracker))
    .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> { Json(json!({ "status": "ok" })) }

async fn health() -> Json<Value> { Json(json!({ "ok": true })) }
