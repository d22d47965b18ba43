//! Request bodies and their normalization into core inputs.
//!
//! Scanner clients disagree on field names (`job_id` vs `job_name`,
//! `output_qty` vs `meters_printed`) and on types (numbers arrive as
//! strings). All of that is settled here, so the core only ever sees one
//! name per concept. Every field is optional at this layer: a blank string
//! or a value of the wrong shape reads as absent, and required-ness is
//! checked by the core.

use rolltrace_core::{
  roll::NewRoll,
  workflow::{DeliveryScan, DispatchScan, PrintEnd, PrintStart, Scan},
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ─── Lenient field readers ───────────────────────────────────────────────────

/// Trimmed text; numbers and booleans are stringified, blanks are `None`.
fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
  Ok(match Value::deserialize(d)? {
    Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  })
}

/// A number, or a string that parses as one.
fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
  let n = match Value::deserialize(d)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  };
  Ok(n.filter(|n| n.is_finite()))
}

/// Like [`number`], truncated towards zero.
fn integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
  Ok(number(d)?.map(|n| n as i64))
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

/// `POST /inward/`
#[derive(Debug, Default, Deserialize)]
pub struct InwardBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value: Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub roll_id:  Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub supplier: Option<String>,
  #[serde(default, deserialize_with = "integer")]
  pub gsm:      Option<i64>,
  #[serde(default, deserialize_with = "integer")]
  pub width:    Option<i64>,
  #[serde(default, deserialize_with = "text")]
  pub lot_no:   Option<String>,
}

impl From<InwardBody> for NewRoll {
  fn from(b: InwardBody) -> Self {
    NewRoll {
      qr_value: b.qr_value.unwrap_or_default(),
      roll_id:  b.roll_id.unwrap_or_default(),
      supplier: b.supplier.unwrap_or_default(),
      gsm:      b.gsm.unwrap_or(0),
      width:    b.width.unwrap_or(0),
      lot_no:   b.lot_no.unwrap_or_default(),
    }
  }
}

/// `POST /scan/`
#[derive(Debug, Default, Deserialize)]
pub struct ScanBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value: Option<String>,
}

/// `POST /flexo/start/`
#[derive(Debug, Default, Deserialize)]
pub struct PrintStartBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub previous_qr_value: Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub job_id:            Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub job_name:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub machine:           Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub machine_no:        Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub operator_name:     Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub remarks:           Option<String>,
}

impl From<PrintStartBody> for PrintStart {
  fn from(b: PrintStartBody) -> Self {
    PrintStart {
      scan:          scan(b.qr_value, b.previous_qr_value),
      job_id:        b.job_id.or(b.job_name),
      machine:       b.machine.or(b.machine_no),
      operator_name: b.operator_name,
      remarks:       b.remarks,
    }
  }
}

/// `POST /flexo/end/`
#[derive(Debug, Default, Deserialize)]
pub struct PrintEndBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub previous_qr_value: Option<String>,
  #[serde(default, deserialize_with = "number")]
  pub output_qty:        Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub meters_printed:    Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub waste:             Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub waste_qty:         Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub wastage:           Option<f64>,
  #[serde(default, deserialize_with = "text")]
  pub operator_name:     Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub remarks:           Option<String>,
}

impl From<PrintEndBody> for PrintEnd {
  fn from(b: PrintEndBody) -> Self {
    PrintEnd {
      scan:           scan(b.qr_value, b.previous_qr_value),
      meters_printed: b.output_qty.or(b.meters_printed).unwrap_or(0.0),
      wastage:        b.waste.or(b.waste_qty).or(b.wastage).unwrap_or(0.0),
      operator_name:  b.operator_name,
      remarks:        b.remarks,
    }
  }
}

/// `POST /dispatch/`
#[derive(Debug, Default, Deserialize)]
pub struct DispatchBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub previous_qr_value: Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub operator_name:     Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub vehicle_no:        Option<String>,
  #[serde(default, deserialize_with = "number")]
  pub dispatch_qty:      Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub quantity:          Option<f64>,
  #[serde(default, deserialize_with = "text")]
  pub customer:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub invoice_no:        Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub remarks:           Option<String>,
}

impl From<DispatchBody> for DispatchScan {
  fn from(b: DispatchBody) -> Self {
    DispatchScan {
      scan:          scan(b.qr_value, b.previous_qr_value),
      operator_name: b.operator_name,
      vehicle_no:    b.vehicle_no,
      dispatch_qty:  b.dispatch_qty.or(b.quantity).unwrap_or(0.0),
      customer:      b.customer,
      invoice_no:    b.invoice_no,
      remarks:       b.remarks,
    }
  }
}

/// `POST /receiver/`
#[derive(Debug, Default, Deserialize)]
pub struct DeliveryBody {
  #[serde(default, deserialize_with = "text")]
  pub qr_value:          Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub previous_qr_value: Option<String>,
  #[serde(default, deserialize_with = "text")]
  pub operator_name:     Option<String>,
  #[serde(default, deserialize_with = "number")]
  pub lat:               Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub lng:               Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub gps_lat:           Option<f64>,
  #[serde(default, deserialize_with = "number")]
  pub gps_lng:           Option<f64>,
  #[serde(default, deserialize_with = "text")]
  pub remarks:           Option<String>,
}

impl From<DeliveryBody> for DeliveryScan {
  fn from(b: DeliveryBody) -> Self {
    DeliveryScan {
      scan:          scan(b.qr_value, b.previous_qr_value),
      operator_name: b.operator_name,
      lat:           b.lat.or(b.gps_lat),
      lng:           b.lng.or(b.gps_lng),
      remarks:       b.remarks,
    }
  }
}

fn scan(qr_value: Option<String>, previous_qr_value: Option<String>) -> Scan {
  Scan { qr_value: qr_value.unwrap_or_default(), previous_qr_value }
}
