//! Reverse geocoding for delivery confirmations.
//!
//! Geocoding is best effort. A slow, failing or absent geocoder never fails
//! a delivery; the place name just falls back to [`UNKNOWN_LOCATION`].

use std::{future::Future, time::Duration};

/// Place name stored when no real one could be found.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Turns coordinates into a human-readable place name.
///
/// Implementations report failure as `None` rather than an error; there is
/// nothing a caller could do with one.
pub trait Geocoder: Send + Sync {
  fn reverse(
    &self,
    lat: f64,
    lng: f64,
  ) -> impl Future<Output = Option<String>> + Send + '_;
}

/// A geocoder that never knows where anything is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
  async fn reverse(&self, _lat: f64, _lng: f64) -> Option<String> { None }
}

/// Look up a place name for optional coordinates, giving up after
/// `timeout`. Always returns something printable.
pub async fn locate<G: Geocoder>(
  geocoder: &G,
  lat: Option<f64>,
  lng: Option<f64>,
  timeout: Duration,
) -> String {
  let (Some(lat), Some(lng)) = (lat, lng) else {
    return UNKNOWN_LOCATION.to_owned();
  };

  match tokio::time::timeout(timeout, geocoder.reverse(lat, lng)).await {
    Ok(Some(name)) if !name.trim().is_empty() => name,
    Ok(_) => {
      tracing::warn!(lat, lng, "geocoder returned no place name");
      UNKNOWN_LOCATION.to_owned()
    }
    Err(_) => {
      tracing::warn!(lat, lng, ?timeout, "geocoder timed out");
      UNKNOWN_LOCATION.to_owned()
    }
  }
}
