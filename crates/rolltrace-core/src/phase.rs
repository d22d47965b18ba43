//! Phase records: what operators entered at each workflow step.
//!
//! Dispatch and delivery records are keyed by the QR scanned at that moment,
//! which may be any label the roll has carried. Only [`JobUsage`] points at
//! its [`Roll`](crate::roll::Roll) directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Print jobs ──────────────────────────────────────────────────────────────

/// One print run on a roll. Created at print-start, closed at print-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobUsage {
  pub id:             i64,
  /// Row id of the owning roll.
  pub roll:           i64,
  pub job_id:         Option<String>,
  pub machine:        Option<String>,
  pub operator_name:  Option<String>,
  pub remarks:        Option<String>,
  pub start_time:     Option<DateTime<Utc>>,
  /// `None` while the job is open.
  pub end_time:       Option<DateTime<Utc>>,
  pub meters_printed: Option<f64>,
  pub wastage:        Option<f64>,
}

impl JobUsage {
  pub fn is_open(&self) -> bool { self.end_time.is_none() }
}

/// Input to [`crate::store::TrackStore::start_job`]. `start_time` is set by
/// the store.
#[derive(Debug, Clone, Default)]
pub struct NewJobUsage {
  pub roll:          i64,
  pub job_id:        Option<String>,
  pub machine:       Option<String>,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
}

/// End-of-run figures written onto the latest job at print-end.
#[derive(Debug, Clone, Default)]
pub struct JobCompletion {
  pub meters_printed: f64,
  pub wastage:        f64,
  /// Overwrites the start operator when present.
  pub operator_name:  Option<String>,
  /// Overwrites the start remarks when present.
  pub remarks:        Option<String>,
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// A roll leaving the plant. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatch {
  pub id:            i64,
  /// The QR scanned at dispatch, not necessarily the root.
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub vehicle_no:    Option<String>,
  pub dispatch_qty:  f64,
  pub customer:      Option<String>,
  pub invoice_no:    Option<String>,
  pub remarks:       Option<String>,
  pub dispatched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDispatch {
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub vehicle_no:    Option<String>,
  pub dispatch_qty:  f64,
  pub customer:      Option<String>,
  pub invoice_no:    Option<String>,
  pub remarks:       Option<String>,
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Receipt of a roll at the customer. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
  pub id:            i64,
  /// The QR scanned by the receiver.
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
  pub gps_lat:       Option<f64>,
  pub gps_lng:       Option<f64>,
  /// Reverse-geocoded place name, or [`crate::geocode::UNKNOWN_LOCATION`].
  pub location:      String,
  pub confirmed_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDelivery {
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
  pub gps_lat:       Option<f64>,
  pub gps_lng:       Option<f64>,
  pub location:      String,
}
