//! JSON REST API for rolltrace.
//!
//! Exposes an axum [`Router`] driving a [`Tracker`] over any
//! [`TrackStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rolltrace_api::api_router(tracker.clone()))
//! ```

pub mod admin;
pub mod body;
pub mod error;
pub mod geocode;
pub mod lookup;
pub mod phases;

use axum::{
  Router,
  routing::{get, post},
};
use rolltrace_core::{Tracker, geocode::Geocoder, store::TrackStore};

pub use error::ApiError;
pub use geocode::HttpGeocoder;

/// Build a fully-materialised API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(tracker: Tracker<S, G>) -> Router<()>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  Router::new()
    // Scanner
    .route("/scan/", post(lookup::scan::<S, G>))
    .route("/inward/", post(phases::inward::<S, G>))
    .route("/flexo/start/", post(phases::print_start::<S, G>))
    .route("/flexo/end/", post(phases::print_end::<S, G>))
    .route("/dispatch/", post(phases::dispatch::<S, G>))
    .route("/receiver/", post(phases::deliver::<S, G>))
    .route("/timeline/", get(lookup::timeline::<S, G>))
    // Dashboard
    .route("/admin/summary/", get(admin::summary::<S, G>))
    .route("/admin/overview/", get(admin::summary::<S, G>))
    .route("/admin/active/", get(admin::active::<S, G>))
    .route("/admin/search/", get(admin::search::<S, G>))
    .route("/admin/dispatches/", get(admin::dispatches::<S, G>))
    .route("/admin/deliveries/", get(admin::deliveries::<S, G>))
    .with_state(tracker)
}
