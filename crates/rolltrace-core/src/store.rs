//! The `LinkStore` and `TrackStore` traits and supporting query types.
//!
//! The traits are implemented by storage backends (e.g.
//! `rolltrace-store-sqlite`). The resolver and the workflow depend on this
//! abstraction, not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use crate::{
  link::QrLink,
  phase::{
    Delivery, Dispatch, JobCompletion, JobUsage, NewDelivery, NewDispatch,
    NewJobUsage,
  },
  resolve,
  roll::{NewRoll, Roll, RollStatus},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`TrackStore::list_dispatches`] and
/// [`TrackStore::list_deliveries`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  /// Case-insensitive substring over the record's QR and free-text fields.
  pub text:     Option<String>,
  /// Case-insensitive substring over the customer. Ignored for deliveries,
  /// which carry no customer.
  pub customer: Option<String>,
  pub limit:    Option<usize>,
}

// ─── Link graph ──────────────────────────────────────────────────────────────

/// The QR relabeling graph. Append-only: edges are never updated or removed.
pub trait LinkStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Record that `previous` was relabeled as `current`.
  ///
  /// A no-op when [`QrLink::is_linkable`] rejects the pair or when the exact
  /// pair is already stored. Must stay idempotent under concurrent calls.
  /// Returns whether a new edge was written.
  fn add_link<'a>(
    &'a self,
    previous: &'a str,
    current: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All edges whose `previous_qr_value == qr`, oldest first.
  fn links_from<'a>(
    &'a self,
    qr: &'a str,
  ) -> impl Future<Output = Result<Vec<QrLink>, Self::Error>> + Send + 'a;

  /// All edges whose `current_qr_value == qr`, newest first.
  fn links_to<'a>(
    &'a self,
    qr: &'a str,
  ) -> impl Future<Output = Result<Vec<QrLink>, Self::Error>> + Send + 'a;

  /// The most recently created edge into `qr`, if any.
  fn latest_link_to<'a>(
    &'a self,
    qr: &'a str,
  ) -> impl Future<Output = Result<Option<QrLink>, Self::Error>> + Send + 'a {
    async move { Ok(self.links_to(qr).await?.into_iter().next()) }
  }

  /// Distinct `current_qr_value`s of every edge leaving any QR in
  /// `frontier`. One round trip per breadth-first level.
  fn successors<'a>(
    &'a self,
    frontier: &'a [String],
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// The root `qr` resolves to, as [`resolve::resolve_root`] defines it.
  ///
  /// Backends that can should answer from one consistent read of the graph,
  /// so edges added mid-walk are not seen. The default walks step by step.
  fn root_of<'a>(
    &'a self,
    qr: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a
  where
    Self: Sized,
  {
    resolve::resolve_root(self, qr)
  }

  /// The forward closure of `root`, as [`resolve::forward_closure`] defines
  /// it, under the same consistency rule as [`LinkStore::root_of`].
  fn closure_of<'a>(
    &'a self,
    root: &'a str,
  ) -> impl Future<Output = Result<BTreeSet<String>, Self::Error>> + Send + 'a
  where
    Self: Sized,
  {
    resolve::forward_closure(self, root)
  }
}

// ─── Rolls and phase records ─────────────────────────────────────────────────

/// Rolls plus the four phase-record kinds.
///
/// Timestamps (`created_at`, `start_time`, `dispatched_at`, ...) are always
/// assigned by the store.
pub trait TrackStore: LinkStore {
  // ── Rolls ─────────────────────────────────────────────────────────────

  /// Create the roll keyed by exactly `input.qr_value`, or overwrite its
  /// details if it exists. The status is reset to
  /// [`RollStatus::InStock`]; `created_at` is kept from the first intake.
  fn upsert_roll(
    &self,
    input: NewRoll,
  ) -> impl Future<Output = Result<Roll, Self::Error>> + Send + '_;

  /// The roll whose root QR is exactly `qr`. No link resolution.
  fn get_roll_by_qr<'a>(
    &'a self,
    qr: &'a str,
  ) -> impl Future<Output = Result<Option<Roll>, Self::Error>> + Send + 'a;

  fn set_status(
    &self,
    roll: i64,
    status: RollStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Number of rolls per status. Statuses with no rolls may be omitted.
  fn count_by_status(
    &self,
  ) -> impl Future<Output = Result<Vec<(RollStatus, u64)>, Self::Error>> + Send + '_;

  /// Rolls whose roll code or root QR contains `text` (case-insensitive),
  /// newest first.
  fn search_rolls<'a>(
    &'a self,
    text: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Roll>, Self::Error>> + Send + 'a;

  /// Rolls whose most recent job has no end time, newest job first.
  fn rolls_with_open_job(
    &self,
  ) -> impl Future<Output = Result<Vec<Roll>, Self::Error>> + Send + '_;

  // ── Print jobs ────────────────────────────────────────────────────────

  fn start_job(
    &self,
    input: NewJobUsage,
  ) -> impl Future<Output = Result<JobUsage, Self::Error>> + Send + '_;

  /// Close the most recently created job for `roll`.
  ///
  /// Returns `None`, writing nothing, when the roll has no job at all.
  fn complete_latest_job(
    &self,
    roll: i64,
    completion: JobCompletion,
  ) -> impl Future<Output = Result<Option<JobUsage>, Self::Error>> + Send + '_;

  /// The earliest-created job for `roll`.
  fn first_job(
    &self,
    roll: i64,
  ) -> impl Future<Output = Result<Option<JobUsage>, Self::Error>> + Send + '_;

  /// The most recently created job for `roll`.
  fn latest_job(
    &self,
    roll: i64,
  ) -> impl Future<Output = Result<Option<JobUsage>, Self::Error>> + Send + '_;

  // ── Dispatch ──────────────────────────────────────────────────────────

  fn record_dispatch(
    &self,
    input: NewDispatch,
  ) -> impl Future<Output = Result<Dispatch, Self::Error>> + Send + '_;

  /// The most recent dispatch recorded under any QR in `qrs`.
  fn latest_dispatch<'a>(
    &'a self,
    qrs: &'a [String],
  ) -> impl Future<Output = Result<Option<Dispatch>, Self::Error>> + Send + 'a;

  fn list_dispatches<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Dispatch>, Self::Error>> + Send + 'a;

  /// Distinct non-empty dispatch customers, sorted.
  fn customers(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Delivery ──────────────────────────────────────────────────────────

  fn record_delivery(
    &self,
    input: NewDelivery,
  ) -> impl Future<Output = Result<Delivery, Self::Error>> + Send + '_;

  /// The most recent delivery recorded under any QR in `qrs`.
  fn latest_delivery<'a>(
    &'a self,
    qrs: &'a [String],
  ) -> impl Future<Output = Result<Option<Delivery>, Self::Error>> + Send + 'a;

  fn list_deliveries<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<Delivery>, Self::Error>> + Send + 'a;
}
