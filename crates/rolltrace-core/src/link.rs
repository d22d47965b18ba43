//! QR link edges: the record that one label replaced another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed edge `previous_qr_value -> current_qr_value`.
///
/// Edges are append-only. A given pair is stored at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrLink {
  pub id:                i64,
  pub previous_qr_value: String,
  pub current_qr_value:  String,
  pub linked_at:         DateTime<Utc>,
}

impl QrLink {
  /// Whether `previous -> current` is worth storing at all. Blank ends and
  /// self-links are silently dropped by every [`crate::store::LinkStore`].
  pub fn is_linkable(previous: &str, current: &str) -> bool {
    !previous.is_empty() && !current.is_empty() && previous != current
  }
}
