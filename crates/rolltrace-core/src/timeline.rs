//! The per-roll timeline read model.
//!
//! Phase records are written under whatever QR was scanned at the time, so a
//! timeline is assembled on read: resolve the roll's forward closure once,
//! then pick each phase's record from among every QR in it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  phase::{Delivery, Dispatch, JobUsage},
  roll::{Roll, RollStatus},
  store::TrackStore,
};

// ─── Phase payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InwardData {
  pub roll_id:  String,
  pub supplier: String,
  pub gsm:      i64,
  pub width:    i64,
  pub lot_no:   String,
  pub status:   RollStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexoStartData {
  pub operator_name: Option<String>,
  pub job_id:        Option<String>,
  pub machine:       Option<String>,
  pub remarks:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexoEndData {
  pub operator_name:  Option<String>,
  pub meters_printed: Option<f64>,
  pub wastage:        Option<f64>,
  pub remarks:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchData {
  /// The label scanned at dispatch.
  pub qr_value:      String,
  pub customer:      Option<String>,
  pub dispatch_qty:  f64,
  pub vehicle_no:    Option<String>,
  pub invoice_no:    Option<String>,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryData {
  /// The label scanned by the receiver.
  pub qr_value:      String,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub location:      String,
}

impl From<&Dispatch> for DispatchData {
  fn from(d: &Dispatch) -> Self {
    Self {
      qr_value:      d.qr_value.clone(),
      customer:      d.customer.clone(),
      dispatch_qty:  d.dispatch_qty,
      vehicle_no:    d.vehicle_no.clone(),
      invoice_no:    d.invoice_no.clone(),
      operator_name: d.operator_name.clone(),
      remarks:       d.remarks.clone(),
    }
  }
}

impl From<&Delivery> for DeliveryData {
  fn from(d: &Delivery) -> Self {
    Self {
      qr_value:      d.qr_value.clone(),
      operator_name: d.operator_name.clone(),
      remarks:       d.remarks.clone(),
      lat:           d.gps_lat,
      lng:           d.gps_lng,
      location:      d.location.clone(),
    }
  }
}

// ─── View ────────────────────────────────────────────────────────────────────

/// One phase of the timeline. `completed` is true exactly when the phase's
/// defining timestamp exists; without it, `data` is absent too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseView<T> {
  pub completed: bool,
  pub time:      Option<DateTime<Utc>>,
  pub data:      Option<T>,
}

impl<T> PhaseView<T> {
  fn new(time: Option<DateTime<Utc>>, data: Option<T>) -> Self {
    match time {
      Some(at) => Self { completed: true, time: Some(at), data },
      None => Self { completed: false, time: None, data: None },
    }
  }
}

/// The fixed five phases, in workflow order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phases {
  pub inward:      PhaseView<InwardData>,
  pub flexo_start: PhaseView<FlexoStartData>,
  pub flexo_end:   PhaseView<FlexoEndData>,
  pub dispatch:    PhaseView<DispatchData>,
  pub delivery:    PhaseView<DeliveryData>,
}

/// The five key timestamps, flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestones {
  pub inward:      DateTime<Utc>,
  pub print_start: Option<DateTime<Utc>>,
  pub print_end:   Option<DateTime<Utc>>,
  pub dispatch:    Option<DateTime<Utc>>,
  pub delivered:   Option<DateTime<Utc>>,
}

/// Everything known about one roll, whichever of its labels was queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineView {
  /// The QR as queried; may be any label in `linked_qrs`.
  pub qr_value:      String,
  pub root_qr_value: String,
  pub roll_id:       String,
  pub status:        RollStatus,
  pub phases:        Phases,
  pub timeline:      Milestones,
  /// The root's forward closure, sorted.
  pub linked_qrs:    Vec<String>,
}

/// Assemble the [`TimelineView`] for `roll`.
///
/// Print start comes from the roll's first job and print end from its latest
/// one, so a second run that is still open leaves `flexo_end` incomplete.
/// Dispatch and delivery take the newest record under any linked QR.
pub async fn build_timeline<S: TrackStore>(
  store: &S,
  roll: &Roll,
  queried_qr: &str,
) -> Result<TimelineView, S::Error> {
  let linked_qrs: Vec<String> =
    store.closure_of(&roll.qr_value).await?.into_iter().collect();

  let job_first = store.first_job(roll.id).await?;
  let job_last = store.latest_job(roll.id).await?;
  let dispatch = store.latest_dispatch(&linked_qrs).await?;
  let delivery = store.latest_delivery(&linked_qrs).await?;

  let inward = PhaseView::new(
    Some(roll.created_at),
    Some(InwardData {
      roll_id:  roll.roll_id.clone(),
      supplier: roll.supplier.clone(),
      gsm:      roll.gsm,
      width:    roll.width,
      lot_no:   roll.lot_no.clone(),
      status:   roll.status,
    }),
  );

  let flexo_start = PhaseView::new(
    job_first.as_ref().and_then(|j| j.start_time),
    job_first.as_ref().map(flexo_start_data),
  );

  let flexo_end = PhaseView::new(
    job_last.as_ref().and_then(|j| j.end_time),
    job_last.as_ref().map(flexo_end_data),
  );

  let dispatch = PhaseView::new(
    dispatch.as_ref().map(|d| d.dispatched_at),
    dispatch.as_ref().map(DispatchData::from),
  );

  let delivery = PhaseView::new(
    delivery.as_ref().map(|d| d.confirmed_at),
    delivery.as_ref().map(DeliveryData::from),
  );

  let timeline = Milestones {
    inward:      roll.created_at,
    print_start: flexo_start.time,
    print_end:   flexo_end.time,
    dispatch:    dispatch.time,
    delivered:   delivery.time,
  };

  Ok(TimelineView {
    qr_value: queried_qr.to_owned(),
    root_qr_value: roll.qr_value.clone(),
    roll_id: roll.roll_id.clone(),
    status: roll.status,
    phases: Phases { inward, flexo_start, flexo_end, dispatch, delivery },
    timeline,
    linked_qrs,
  })
}

fn flexo_start_data(job: &JobUsage) -> FlexoStartData {
  FlexoStartData {
    operator_name: job.operator_name.clone(),
    job_id:        job.job_id.clone(),
    machine:       job.machine.clone(),
    remarks:       job.remarks.clone(),
  }
}

fn flexo_end_data(job: &JobUsage) -> FlexoEndData {
  FlexoEndData {
    operator_name:  job.operator_name.clone(),
    meters_printed: job.meters_printed,
    wastage:        job.wastage,
    remarks:        job.remarks.clone(),
  }
}
