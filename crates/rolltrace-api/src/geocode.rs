//! Reverse geocoding over HTTP against a Nominatim-compatible service.

use std::time::Duration;

use reqwest::Client;
use rolltrace_core::geocode::Geocoder;
use serde::Deserialize;

/// Reverse geocoder backed by `GET {base_url}/reverse?format=jsonv2`.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpGeocoder {
  client:   Client,
  base_url: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
  display_name: Option<String>,
}

impl HttpGeocoder {
  /// `timeout` bounds each request end to end. Public Nominatim instances
  /// reject requests without an identifying `user_agent`.
  pub fn new(
    base_url: impl Into<String>,
    user_agent: &str,
    timeout: Duration,
  ) -> reqwest::Result<Self> {
    let client = Client::builder()
      .user_agent(user_agent)
      .timeout(timeout)
      .build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self) -> String {
    format!("{}/reverse", self.base_url.trim_end_matches('/'))
  }

  async fn lookup(&self, lat: f64, lng: f64) -> reqwest::Result<Option<String>> {
    let resp = self
      .client
      .get(self.url())
      .query(&[
        ("format", "jsonv2".to_owned()),
        ("lat", lat.to_string()),
        ("lon", lng.to_string()),
      ])
      .send()
      .await?
      .error_for_status()?;

    let body: ReverseResponse = resp.json().await?;
    Ok(body.display_name.filter(|n| !n.trim().is_empty()))
  }
}

impl Geocoder for HttpGeocoder {
  async fn reverse(&self, lat: f64, lng: f64) -> Option<String> {
    match self.lookup(lat, lng).await {
      Ok(name) => name,
      Err(e) => {
        tracing::warn!(error = %e, lat, lng, "reverse geocoding failed");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
  use serde_json::{Value, json};
  use tokio::net::TcpListener;

  use super::*;

  async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
  }

  fn geocoder(base_url: &str, timeout: Duration) -> HttpGeocoder {
    HttpGeocoder::new(base_url, "rolltrace-test", timeout).unwrap()
  }

  #[tokio::test]
  async fn reads_display_name() {
    let app = Router::new().route(
      "/reverse",
      get(|Query(q): Query<HashMap<String, String>>| async move {
        assert_eq!(q.get("format").map(String::as_str), Some("jsonv2"));
        let name = format!("Plant gate {},{}", q["lat"], q["lon"]);
        Json(json!({ "display_name": name }))
      }),
    );
    let base = spawn(app).await;

    let name = geocoder(&base, Duration::from_secs(5))
      .reverse(12.5, 77.25)
      .await;
    assert_eq!(name.as_deref(), Some("Plant gate 12.5,77.25"));
  }

  #[tokio::test]
  async fn trailing_slash_in_base_url_is_ignored() {
    let app = Router::new().route(
      "/reverse",
      get(|| async { Json(json!({ "display_name": "Depot" })) }),
    );
    let base = spawn(app).await;

    let name = geocoder(&format!("{base}/"), Duration::from_secs(5))
      .reverse(1.0, 2.0)
      .await;
    assert_eq!(name.as_deref(), Some("Depot"));
  }

  #[tokio::test]
  async fn missing_or_blank_name_is_none() {
    let app = Router::new()
      .route("/reverse", get(|| async { Json(json!({ "error": "Unable to geocode" })) }));
    let base = spawn(app).await;
    assert_eq!(geocoder(&base, Duration::from_secs(5)).reverse(0.0, 0.0).await, None);

    let app = Router::new()
      .route("/reverse", get(|| async { Json(json!({ "display_name": "  " })) }));
    let base = spawn(app).await;
    assert_eq!(geocoder(&base, Duration::from_secs(5)).reverse(0.0, 0.0).await, None);
  }

  #[tokio::test]
  async fn error_status_is_none() {
    let app = Router::new().route(
      "/reverse",
      get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(Value::Null)) }),
    );
    let base = spawn(app).await;

    assert_eq!(geocoder(&base, Duration::from_secs(5)).reverse(1.0, 1.0).await, None);
  }

  #[tokio::test]
  async fn unreachable_service_is_none() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let name = geocoder(&format!("http://{addr}"), Duration::from_secs(5))
      .reverse(1.0, 1.0)
      .await;
    assert_eq!(name, None);
  }

  #[tokio::test]
  async fn slow_service_times_out() {
    let app = Router::new().route(
      "/reverse",
      get(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({ "display_name": "too late" }))
      }),
    );
    let base = spawn(app).await;

    let name = geocoder(&base, Duration::from_millis(100))
      .reverse(1.0, 1.0)
      .await;
    assert_eq!(name, None);
  }
}
