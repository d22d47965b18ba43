//! Phase transition handlers.
//!
//! Every scan after intake follows the same steps: validate the QR, link it
//! to the previous label if one was given, resolve the roll, write the phase
//! record, then set the roll's status. Intake is the exception: it creates
//! the roll under the exact QR scanned, which becomes the root.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  geocode::{Geocoder, NoGeocoder, locate},
  phase::{JobCompletion, NewDelivery, NewDispatch, NewJobUsage},
  resolve::roll_by_any_qr,
  roll::{NewRoll, Roll, RollStatus},
  store::TrackStore,
  timeline::{TimelineView, build_timeline},
};

/// Upper bound on one reverse-geocoding lookup during delivery.
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(3);

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// The label scanned now and, if the roll was relabeled, the one it replaced.
#[derive(Debug, Clone, Default)]
pub struct Scan {
  pub qr_value:          String,
  pub previous_qr_value: Option<String>,
}

impl Scan {
  pub fn new(qr_value: impl Into<String>) -> Self {
    Self { qr_value: qr_value.into(), previous_qr_value: None }
  }

  pub fn relabeled(
    previous_qr_value: impl Into<String>,
    qr_value: impl Into<String>,
  ) -> Self {
    Self {
      qr_value:          qr_value.into(),
      previous_qr_value: Some(previous_qr_value.into()),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct PrintStart {
  pub scan:          Scan,
  pub job_id:        Option<String>,
  pub machine:       Option<String>,
  pub operator_name: Option<String>,
  pub remarks:       Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PrintEnd {
  pub scan:           Scan,
  pub meters_printed: f64,
  pub wastage:        f64,
  pub operator_name:  Option<String>,
  pub remarks:        Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchScan {
  pub scan:          Scan,
  pub operator_name: Option<String>,
  pub vehicle_no:    Option<String>,
  pub dispatch_qty:  f64,
  pub customer:      Option<String>,
  pub invoice_no:    Option<String>,
  pub remarks:       Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryScan {
  pub scan:          Scan,
  pub operator_name: Option<String>,
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub remarks:       Option<String>,
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// The step a handler completed, as reported back to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
  InwardSaved,
  PrintingStarted,
  PrintingCompleted,
  Dispatched,
  Delivered,
}

/// Response body of every phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
  pub status:        Stage,
  pub roll_id:       String,
  /// Set by intake only: the QR the roll was taken in under.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub qr_value:      Option<String>,
  /// Set by every handler except intake.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub root_qr_value: Option<String>,
}

impl Outcome {
  fn resolved(status: Stage, roll: &Roll, root: String) -> Self {
    Self {
      status,
      roll_id: roll.roll_id.clone(),
      qr_value: None,
      root_qr_value: Some(root),
    }
  }
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Entry point for every roll operation, bundling the store with the
/// geocoder used at delivery.
pub struct Tracker<S, G = NoGeocoder> {
  store:           Arc<S>,
  geocoder:        Arc<G>,
  geocode_timeout: Duration,
}

impl<S, G> Clone for Tracker<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:           Arc::clone(&self.store),
      geocoder:        Arc::clone(&self.geocoder),
      geocode_timeout: self.geocode_timeout,
    }
  }
}

impl<S: TrackStore> Tracker<S> {
  /// A tracker that records every delivery location as unknown.
  pub fn without_geocoder(store: Arc<S>) -> Self {
    Self::new(store, Arc::new(NoGeocoder))
  }
}

impl<S, G> Tracker<S, G>
where
  S: TrackStore,
  G: Geocoder,
{
  pub fn new(store: Arc<S>, geocoder: Arc<G>) -> Self {
    Self { store, geocoder, geocode_timeout: DEFAULT_GEOCODE_TIMEOUT }
  }

  pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
    self.geocode_timeout = timeout;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Transitions ───────────────────────────────────────────────────────

  /// Take a roll in under the exact QR scanned, creating it or overwriting
  /// its details. Status becomes [`RollStatus::InStock`].
  pub async fn inward(&self, input: NewRoll) -> Result<Outcome> {
    let qr_value = required("qr_value", &input.qr_value)?;
    let roll_id = required("roll_id", &input.roll_id)?;

    let roll = self
      .store
      .upsert_roll(NewRoll { qr_value, roll_id, ..input })
      .await
      .map_err(Error::store)?;

    tracing::info!(qr = %roll.qr_value, roll_id = %roll.roll_id, "roll taken in");

    Ok(Outcome {
      status:        Stage::InwardSaved,
      roll_id:       roll.roll_id,
      qr_value:      Some(roll.qr_value),
      root_qr_value: None,
    })
  }

  /// Open a print job. Status becomes [`RollStatus::InUse`].
  pub async fn print_start(&self, input: PrintStart) -> Result<Outcome> {
    let (roll, root) = self.arrive(&input.scan).await?;

    let job = self
      .store
      .start_job(NewJobUsage {
        roll:          roll.id,
        job_id:        input.job_id,
        machine:       input.machine,
        operator_name: input.operator_name,
        remarks:       input.remarks,
      })
      .await
      .map_err(Error::store)?;
    self.advance(&roll, RollStatus::InUse).await?;

    tracing::info!(root_qr = %root, roll_id = %roll.roll_id, job = job.id, "printing started");
    Ok(Outcome::resolved(Stage::PrintingStarted, &roll, root))
  }

  /// Close the roll's latest print job. With no job on record nothing is
  /// written, but the status still becomes
  /// [`RollStatus::PrintingCompleted`].
  pub async fn print_end(&self, input: PrintEnd) -> Result<Outcome> {
    let (roll, root) = self.arrive(&input.scan).await?;

    let closed = self
      .store
      .complete_latest_job(roll.id, JobCompletion {
        meters_printed: input.meters_printed,
        wastage:        input.wastage,
        operator_name:  input.operator_name,
        remarks:        input.remarks,
      })
      .await
      .map_err(Error::store)?;
    self.advance(&roll, RollStatus::PrintingCompleted).await?;

    match closed {
      Some(job) => tracing::info!(
        root_qr = %root,
        roll_id = %roll.roll_id,
        job = job.id,
        "printing completed"
      ),
      None => tracing::info!(
        root_qr = %root,
        roll_id = %roll.roll_id,
        "printing completed with no job on record"
      ),
    }
    Ok(Outcome::resolved(Stage::PrintingCompleted, &roll, root))
  }

  /// Record a dispatch under the QR scanned now. Status becomes
  /// [`RollStatus::Dispatched`].
  pub async fn dispatch(&self, input: DispatchScan) -> Result<Outcome> {
    let (roll, root) = self.arrive(&input.scan).await?;

    self
      .store
      .record_dispatch(NewDispatch {
        qr_value:      input.scan.qr_value.trim().to_owned(),
        operator_name: input.operator_name,
        vehicle_no:    input.vehicle_no,
        dispatch_qty:  input.dispatch_qty,
        customer:      input.customer,
        invoice_no:    input.invoice_no,
        remarks:       input.remarks,
      })
      .await
      .map_err(Error::store)?;
    self.advance(&roll, RollStatus::Dispatched).await?;

    tracing::info!(root_qr = %root, roll_id = %roll.roll_id, "roll dispatched");
    Ok(Outcome::resolved(Stage::Dispatched, &roll, root))
  }

  /// Record receipt at the customer under the QR scanned now, with a
  /// best-effort place name for the coordinates. Status becomes
  /// [`RollStatus::Delivered`].
  pub async fn deliver(&self, input: DeliveryScan) -> Result<Outcome> {
    let (roll, root) = self.arrive(&input.scan).await?;

    let location =
      locate(self.geocoder.as_ref(), input.lat, input.lng, self.geocode_timeout)
        .await;

    self
      .store
      .record_delivery(NewDelivery {
        qr_value: input.scan.qr_value.trim().to_owned(),
        operator_name: input.operator_name,
        remarks: input.remarks,
        gps_lat: input.lat,
        gps_lng: input.lng,
        location,
      })
      .await
      .map_err(Error::store)?;
    self.advance(&roll, RollStatus::Delivered).await?;

    tracing::info!(root_qr = %root, roll_id = %roll.roll_id, "roll delivered");
    Ok(Outcome::resolved(Stage::Delivered, &roll, root))
  }

  // ── Queries ───────────────────────────────────────────────────────────

  /// Resolve any label to its roll. `Ok((None, root))` if nothing was ever
  /// taken in under the root.
  pub async fn lookup(&self, qr: &str) -> Result<(Option<Roll>, String)> {
    roll_by_any_qr(self.store.as_ref(), qr.trim())
      .await
      .map_err(Error::store)
  }

  /// The timeline of whichever roll `qr` belongs to.
  pub async fn timeline(&self, qr: &str) -> Result<TimelineView> {
    let qr = qr.trim();
    let (roll, _) = self.lookup(qr).await?;
    let roll = roll.ok_or_else(|| Error::RollNotFound(qr.to_owned()))?;
    self.timeline_as(&roll, qr).await
  }

  /// The timeline of `roll`, reported as if queried by `queried_qr`.
  pub async fn timeline_as(
    &self,
    roll: &Roll,
    queried_qr: &str,
  ) -> Result<TimelineView> {
    build_timeline(self.store.as_ref(), roll, queried_qr)
      .await
      .map_err(Error::store)
  }

  /// Customer on the newest dispatch recorded under any of `roll`'s labels.
  /// Blank customers read as `None`.
  pub async fn latest_customer(&self, roll: &Roll) -> Result<Option<String>> {
    let store = self.store.as_ref();
    let labels: Vec<String> = store
      .closure_of(&roll.qr_value)
      .await
      .map_err(Error::store)?
      .into_iter()
      .collect();
    let dispatch = store.latest_dispatch(&labels).await.map_err(Error::store)?;
    Ok(
      dispatch
        .and_then(|d| d.customer)
        .filter(|c| !c.trim().is_empty()),
    )
  }

  // ── Steps shared by every post-intake handler ─────────────────────────

  /// Validate, link and resolve. A link written here is kept even when the
  /// roll then turns out not to exist.
  async fn arrive(&self, scan: &Scan) -> Result<(Roll, String)> {
    let current = required("qr_value", &scan.qr_value)?;

    if let Some(previous) = scan.previous_qr_value.as_deref().map(str::trim) {
      let linked = self
        .store
        .add_link(previous, &current)
        .await
        .map_err(Error::store)?;
      if linked {
        tracing::debug!(previous, current = %current, "qr relabeled");
      }
    }

    let (roll, root) = self.lookup(&current).await?;
    tracing::debug!(qr = %current, root_qr = %root, found = roll.is_some(), "qr resolved");

    let roll = roll.ok_or(Error::RollNotFound(current))?;
    Ok((roll, root))
  }

  async fn advance(&self, roll: &Roll, status: RollStatus) -> Result<()> {
    self.store.set_status(roll.id, status).await.map_err(Error::store)
  }
}

/// Trimmed `value`, or [`Error::MissingField`] if that leaves nothing.
fn required(field: &'static str, value: &str) -> Result<String> {
  let value = value.trim();
  if value.is_empty() {
    return Err(Error::MissingField(field));
  }
  Ok(value.to_owned())
}
