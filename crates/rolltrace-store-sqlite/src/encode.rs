//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Statuses are stored as
//! their SCREAMING_SNAKE_CASE names.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use rolltrace_core::{
  link::QrLink,
  phase::{Delivery, Dispatch, JobUsage},
  roll::{Roll, RollStatus},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── RollStatus ──────────────────────────────────────────────────────────────

pub fn encode_status(s: RollStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<RollStatus> {
  RollStatus::from_str(s)
    .map_err(|_| rolltrace_core::Error::UnknownStatus(s.to_owned()).into())
}

// ─── LIMIT ───────────────────────────────────────────────────────────────────

/// A row limit as SQLite takes it; anything past `i64::MAX` means no limit.
pub fn sql_limit(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// `%text%` with LIKE metacharacters escaped; pair with `ESCAPE '\'`.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

/// `?{first}, ?{first+1}, ...` for an `IN (...)` list of `n` values.
pub fn placeholders(first: usize, n: usize) -> String {
  (first..first + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ROLL_COLUMNS: &str =
  "id, roll_id, qr_value, supplier, gsm, width, lot_no, status, created_at";

/// Raw values read directly from a `rolls` row.
pub struct RawRoll {
  pub id:         i64,
  pub roll_id:    String,
  pub qr_value:   String,
  pub supplier:   String,
  pub gsm:        i64,
  pub width:      i64,
  pub lot_no:     String,
  pub status:     String,
  pub created_at: String,
}

impl RawRoll {
  /// Read a row selected as [`ROLL_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      roll_id:    row.get(1)?,
      qr_value:   row.get(2)?,
      supplier:   row.get(3)?,
      gsm:        row.get(4)?,
      width:      row.get(5)?,
      lot_no:     row.get(6)?,
      status:     row.get(7)?,
      created_at: row.get(8)?,
    })
  }

  pub fn into_roll(self) -> Result<Roll> {
    Ok(Roll {
      id:         self.id,
      roll_id:    self.roll_id,
      qr_value:   self.qr_value,
      supplier:   self.supplier,
      gsm:        self.gsm,
      width:      self.width,
      lot_no:     self.lot_no,
      status:     decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const LINK_COLUMNS: &str =
  "id, previous_qr_value, current_qr_value, linked_at";

pub struct RawLink {
  pub id:                i64,
  pub previous_qr_value: String,
  pub current_qr_value:  String,
  pub linked_at:         String,
}

impl RawLink {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      previous_qr_value: row.get(1)?,
      current_qr_value:  row.get(2)?,
      linked_at:         row.get(3)?,
    })
  }

  pub fn into_link(self) -> Result<QrLink> {
    Ok(QrLink {
      id:                self.id,
      previous_qr_value: self.previous_qr_value,
      current_qr_value:  self.current_qr_value,
      linked_at:         decode_dt(&self.linked_at)?,
    })
  }
}

pub const JOB_COLUMNS: &str = "id, roll, job_id, machine, operator_name, \
  remarks, start_time, end_time, meters_printed, wastage";

pub struct RawJob {
  pub id:             i64,
  pub roll:           i64,
  pub job_id:         Option<String>,
  pub machine:        Option<String>,
  pub operator_name:  Option<String>,
  pub remarks:        Option<String>,
  pub start_time:     Option<String>,
  pub end_time:       Option<String>,
  pub meters_printed: Option<f64>,
  pub wastage:        Option<f64>,
}

impl RawJob {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      roll:           row.get(1)?,
      job_id:         row.get(2)?,
      machine:        row.get(3)?,
      operator_name:  row.get(4)?,
      remarks:        row.get(5)?,
      start_time:     row.get(6)?,
      end_time:       row.get(7)?,
      meters_printed: row.get(8)?,
      wastage:        row.get(9)?,
    })
  }

  pub fn into_job(self) -> Result<JobUsage> {
    Ok(JobUsage {
      id:             self.id,
      roll:           self.roll,
      job_id:         self.job_id,
      machine:        self.machine,
      operator_name:  self.operator_name,
      remarks:        self.remarks,
      start_time:     decode_opt_dt(self.start_time)?,
      end_time:       decode_opt_dt(self.end_time)?,
      meters_printed: self.meters_printed,
      wastage:        self.wastage,
    })
  }
}

pub const DISPATCH_COLUMNS: &str = "id, qr_value, operator_name, vehicle_no, \
  dispatch_qty, customer, invoice_no, remarks, dispatched_at";

pub struct RawDispatch {
  pub id:            i64,
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub vehicle_no:    Option<String>,
  pub dispatch_qty:  f64,
  pub customer:      Option<String>,
  pub invoice_no:    Option<String>,
  pub remarks:       Option<String>,
  pub dispatched_at: String,
}

impl RawDispatch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      qr_value:      row.get(1)?,
      operator_name: row.get(2)?,
      vehicle_no:    row.get(3)?,
      dispatch_qty:  row.get(4)?,
      customer:      row.get(5)?,
      invoice_no:    row.get(6)?,
      remarks:       row.get(7)?,
      dispatched_at: row.get(8)?,
    })
  }

  pub fn into_dispatch(self) -> Result<Dispatch> {
    Ok(Dispatch {
      id:            self.id,
      qr_value:      self.qr_value,
      operator_name: self.operator_name,
      vehicle_no:    self.vehicle_no,
      dispatch_qty:  self.dispatch_qty,
      customer:      self.customer,
      invoice_no:    self.invoice_no,
      remarks:       self.remarks,
      dispatched_at: decode_dt(&self.dispatched_at)?,
    })
  }
}

pub const DELIVERY_COLUMNS: &str = "id, qr_value, operator_name, remarks, \
  gps_lat, gps_lng, location, confirmed_at";

pub struct RawDelivery {
  pub id:            i64,
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
  pub gps_lat:       Option<f64>,
  pub gps_lng:       Option<f64>,
  pub location:      String,
  pub confirmed_at:  String,
}

impl RawDelivery {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      qr_value:      row.get(1)?,
      operator_name: row.get(2)?,
      remarks:       row.get(3)?,
      gps_lat:       row.get(4)?,
      gps_lng:       row.get(5)?,
      location:      row.get(6)?,
      confirmed_at:  row.get(7)?,
    })
  }

  pub fn into_delivery(self) -> Result<Delivery> {
    Ok(Delivery {
      id:            self.id,
      qr_value:      self.qr_value,
      operator_name: self.operator_name,
      remarks:       self.remarks,
      gps_lat:       self.gps_lat,
      gps_lng:       self.gps_lng,
      location:      self.location,
      confirmed_at:  decode_dt(&self.confirmed_at)?,
    })
  }
}
