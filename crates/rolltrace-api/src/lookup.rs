//! Read-only lookups by QR.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/scan/` | Body `{"qr_value": ...}`; `{"found": false}` with 404 if unknown |
//! | `GET`  | `/timeline/` | `?qr=<any label>`; 404 if unknown |

use axum::{
  Json,
  extract::{Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rolltrace_core::{
  Tracker,
  geocode::Geocoder,
  roll::{Roll, RollStatus},
  store::TrackStore,
  timeline::TimelineView,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{body::ScanBody, error::ApiError};

// ─── Scan ────────────────────────────────────────────────────────────────────

/// The roll as shown to a scanner, without store internals.
#[derive(Debug, Serialize)]
pub struct RollSummary {
  pub roll_id:  String,
  pub qr_value: String,
  pub supplier: String,
  pub gsm:      i64,
  pub width:    i64,
  pub lot_no:   String,
  pub status:   RollStatus,
}

impl From<Roll> for RollSummary {
  fn from(r: Roll) -> Self {
    Self {
      roll_id:  r.roll_id,
      qr_value: r.qr_value,
      supplier: r.supplier,
      gsm:      r.gsm,
      width:    r.width,
      lot_no:   r.lot_no,
      status:   r.status,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ScanFound {
  pub found:         bool,
  pub root_qr_value: String,
  pub roll:          RollSummary,
}

/// `POST /scan/`
pub async fn scan<S, G>(
  State(tracker): State<Tracker<S, G>>,
  body: Result<Json<ScanBody>, JsonRejection>,
) -> Result<Response, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let Json(body) = body?;
  let qr = body
    .qr_value
    .ok_or(rolltrace_core::Error::MissingField("qr_value"))?;

  let (roll, root_qr_value) = tracker.lookup(&qr).await?;
  let Some(roll) = roll else {
    return Ok((StatusCode::NOT_FOUND, Json(json!({ "found": false }))).into_response());
  };

  Ok(
    Json(ScanFound { found: true, root_qr_value, roll: roll.into() })
      .into_response(),
  )
}

// ─── Timeline ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TimelineParams {
  #[serde(default)]
  pub qr: String,
}

/// `GET /timeline/?qr=<label>`
pub async fn timeline<S, G>(
  State(tracker): State<Tracker<S, G>>,
  Query(params): Query<TimelineParams>,
) -> Result<Json<TimelineView>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  Ok(Json(tracker.timeline(&params.qr).await?))
}
