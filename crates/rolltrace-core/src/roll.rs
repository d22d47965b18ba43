//! The physical roll of material being tracked.
//!
//! A roll row is created at intake and keyed by the QR scanned there. That
//! root QR never changes, even after the label on the roll is replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Where a roll is in the shop-floor workflow.
///
/// Handlers move a roll forward in this order, but nothing checks the prior
/// status; the last write wins.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RollStatus {
  InStock,
  InUse,
  PrintingCompleted,
  Dispatched,
  Delivered,
}

/// One physical roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roll {
  /// Store-assigned row id; JobUsage records reference it.
  pub id:         i64,
  /// Operator-entered roll code. Display only, not unique.
  pub roll_id:    String,
  /// The root QR: the value scanned at intake.
  pub qr_value:   String,
  pub supplier:   String,
  pub gsm:        i64,
  pub width:      i64,
  pub lot_no:     String,
  pub status:     RollStatus,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::TrackStore::upsert_roll`].
///
/// Intake always writes every field; blanks and zeros replace whatever a
/// previous intake under the same QR stored.
#[derive(Debug, Clone, Default)]
pub struct NewRoll {
  pub qr_value: String,
  pub roll_id:  String,
  pub supplier: String,
  pub gsm:      i64,
  pub width:    i64,
  pub lot_no:   String,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn status_text_matches_wire_format() {
    assert_eq!(RollStatus::PrintingCompleted.as_ref(), "PRINTING_COMPLETED");
    let text: &'static str = RollStatus::Delivered.into();
    assert_eq!(text, "DELIVERED");
    assert_eq!(
      RollStatus::from_str("IN_STOCK").unwrap(),
      RollStatus::InStock
    );
    assert_eq!(
      serde_json::to_value(RollStatus::InUse).unwrap(),
      serde_json::json!("IN_USE")
    );
  }
}
