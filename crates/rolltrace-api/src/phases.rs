//! Handlers for the phase transition endpoints.
//!
//! | Method | Path | Body | Success `status` |
//! |--------|------|------|------------------|
//! | `POST` | `/inward/` | [`InwardBody`] | `INWARD_SAVED` |
//! | `POST` | `/flexo/start/` | [`PrintStartBody`] | `PRINTING_STARTED` |
//! | `POST` | `/flexo/end/` | [`PrintEndBody`] | `PRINTING_COMPLETED` |
//! | `POST` | `/dispatch/` | [`DispatchBody`] | `DISPATCHED` |
//! | `POST` | `/receiver/` | [`DeliveryBody`] | `DELIVERED` |
//!
//! A blank `qr_value` (or `roll_id` at intake) is a 400. A QR that resolves
//! to no roll is a 404.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
};
use rolltrace_core::{Tracker, geocode::Geocoder, store::TrackStore, workflow::Outcome};

use crate::{
  body::{DeliveryBody, DispatchBody, InwardBody, PrintEndBody, PrintStartBody},
  error::ApiError,
};

/// `POST /inward/`
pub async fn inward<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<InwardBody>, JsonRejection>,
) -> Result<Json<Outcome>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  Ok(Json(tracker.inward(body.into()).await?))
}

/// `POST /flexo/start/`
pub async fn print_start<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<PrintStartBody>, JsonRejection>,
) -> Result<Json<Outcome>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  Ok(Json(tracker.print_start(body.into()).await?))
}

/// `POST /flexo/end/`
pub async fn print_end<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<PrintEndBody>, JsonRejection>,
) -> Result<Json<Outcome>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  Ok(Json(tracker.print_end(body.into()).await?))
}

/// `POST /dispatch/`
pub async fn dispatch<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<DispatchBody>, JsonRejection>,
) -> Result<Json<Outcome>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  Ok(Json(tracker.dispatch(body.into()).await?))
}

/// `POST /receiver/`: the customer confirms receipt.
pub async fn deliver<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<DeliveryBody>, JsonRejection>,
) -> Result<Json<Outcome>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  Ok(Json(tracker.deliver(body.into()).await?))
}
