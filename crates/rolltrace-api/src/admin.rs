//! Handlers for the `/admin` dashboard endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/summary/` | Counts by status and the customer list; `/admin/overview/` is an alias |
//! | `GET`  | `/admin/active/` | Rolls whose latest print job is still open |
//! | `GET`  | `/admin/search/` | `?q=` over roll code and root QR; optional `customer` |
//! | `GET`  | `/admin/dispatches/` | Newest first; `q`, `customer`, `limit` |
//! | `GET`  | `/admin/deliveries/` | Newest first; `q`, `customer`, `limit` |

use std::collections::{BTreeMap, HashMap};

use axum::{
  Json,
  extract::{Query, State},
};
use rolltrace_core::{
  Tracker,
  geocode::Geocoder,
  phase::{Delivery, Dispatch},
  roll::{Roll, RollStatus},
  store::{RecordQuery, TrackStore},
  timeline::TimelineView,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::error::ApiError;

/// Most rolls a search returns.
const SEARCH_LIMIT: usize = 50;

/// Records a dispatch or delivery listing returns when not given `limit`.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Most records a dispatch or delivery listing returns, whatever is asked.
const MAX_LIST_LIMIT: usize = 500;

// ─── Response types ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Summary {
  /// `TOTAL` plus one entry per status, zeros included.
  pub counts:    BTreeMap<String, u64>,
  pub customers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Listing<T> {
  pub count:   usize,
  pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Listing<T> {
  fn from(results: Vec<T>) -> Self { Self { count: results.len(), results } }
}

/// A dispatch or delivery together with the roll its QR resolves to.
#[derive(Debug, Serialize)]
pub struct RecordSummary<T> {
  pub record:        T,
  /// Absent when the record's QR resolves to no roll.
  pub roll_id:       Option<String>,
  pub root_qr_value: Option<String>,
}

// ─── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Free-text filter.
  pub q:        Option<String>,
  /// Case-insensitive substring of the dispatch customer.
  pub customer: Option<String>,
  pub limit:    Option<usize>,
}

impl ListParams {
  fn customer(&self) -> Option<&str> {
    self.customer.as_deref().map(str::trim).filter(|c| !c.is_empty())
  }

  fn limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
  }

  fn record_query(&self) -> RecordQuery {
    RecordQuery {
      text:     self.q.clone().filter(|q| !q.trim().is_empty()),
      customer: self.customer().map(str::to_owned),
      limit:    Some(self.limit()),
    }
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// `GET /admin/summary/`
pub async fn summary<S, G>(
  State(tracker): State<Tracker<S, G>>,
) -> Result<Json<Summary>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let store = tracker.store();
  let per_status = store
    .count_by_status()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let customers = store
    .customers()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let mut counts: BTreeMap<String, u64> =
    RollStatus::iter().map(|s| (s.to_string(), 0)).collect();
  for (status, n) in &per_status {
    counts.insert(status.to_string(), *n);
  }
  counts.insert("TOTAL".to_owned(), per_status.iter().map(|(_, n)| n).sum());

  Ok(Json(Summary { counts, customers }))
}

// ─── Active ──────────────────────────────────────────────────────────────────

/// `GET /admin/active/`
pub async fn active<S, G>(
  State(tracker): State<Tracker<S, G>>,
) -> Result<Json<Listing<TimelineView>>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let rolls = tracker
    .store()
    .rolls_with_open_job()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(timelines(&tracker, &rolls).await?.into()))
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// `GET /admin/search/?q=<text>[&customer=<text>]`
///
/// With `customer`, every roll matching `q` is checked before the result is
/// cut to [`SEARCH_LIMIT`].
pub async fn search<S, G>(
  State(tracker): State<Tracker<S, G>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Listing<TimelineView>>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let text = params.q.as_deref().unwrap_or_default();
  let customer = params.customer();
  let fetch = if customer.is_some() { usize::MAX } else { SEARCH_LIMIT };
  let mut rolls = tracker
    .store()
    .search_rolls(text, fetch)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  if let Some(customer) = customer {
    let mut cache = RollCache::default();
    let mut matched = Vec::new();
    for roll in rolls {
      if matched.len() == SEARCH_LIMIT {
        break;
      }
      if cache.dispatched_to(&tracker, &roll, customer).await? {
        matched.push(roll);
      }
    }
    rolls = matched;
  }

  Ok(Json(timelines(&tracker, &rolls).await?.into()))
}

// ─── Record listings ─────────────────────────────────────────────────────────

/// `GET /admin/dispatches/[?q=..][&customer=..][&limit=..]`
pub async fn dispatches<S, G>(
  State(tracker): State<Tracker<S, G>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Listing<RecordSummary<Dispatch>>>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let records = tracker
    .store()
    .list_dispatches(&params.record_query())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let mut rolls = RollCache::default();
  let mut results = Vec::with_capacity(records.len());
  for record in records {
    let roll = rolls.get(&tracker, &record.qr_value).await?;
    results.push(summarize(record, roll));
  }

  Ok(Json(results.into()))
}

/// `GET /admin/deliveries/[?q=..][&customer=..][&limit=..]`
///
/// Deliveries carry no customer of their own; `customer` matches against
/// the latest dispatch of the roll the delivery resolves to. With
/// `customer`, older records are read until `limit` of them match.
pub async fn deliveries<S, G>(
  State(tracker): State<Tracker<S, G>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Listing<RecordSummary<Delivery>>>, ApiError>
where
  S: TrackStore + 'static,
  G: Geocoder + 'static,
{
  let customer = params.customer();
  let limit = params.limit();
  let mut query = params.record_query();
  if customer.is_some() {
    query.limit = Some(usize::MAX);
  }

  let records = tracker
    .store()
    .list_deliveries(&query)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let mut rolls = RollCache::default();
  let mut results = Vec::new();
  for record in records {
    if results.len() == limit {
      break;
    }
    let roll = rolls.get(&tracker, &record.qr_value).await?;
    if let Some(customer) = customer {
      let Some(roll) = &roll else { continue };
      if !rolls.dispatched_to(&tracker, roll, customer).await? {
        continue;
      }
    }
    results.push(summarize(record, roll));
  }

  Ok(Json(results.into()))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Per-request memo of QR → roll and roll → latest dispatch customer, so
/// records sharing a roll resolve once.
#[derive(Default)]
struct RollCache {
  resolved:  HashMap<String, Option<Roll>>,
  customers: HashMap<i64, Option<String>>,
}

impl RollCache {
  async fn get<S, G>(
    &mut self,
    tracker: &Tracker<S, G>,
    qr: &str,
  ) -> Result<Option<Roll>, ApiError>
  where
    S: TrackStore,
    G: Geocoder,
  {
    if let Some(roll) = self.resolved.get(qr) {
      return Ok(roll.clone());
    }
    let (roll, _) = tracker.lookup(qr).await?;
    self.resolved.insert(qr.to_owned(), roll.clone());
    Ok(roll)
  }

  /// Whether `roll`'s latest dispatch customer contains `needle`, ignoring
  /// case.
  async fn dispatched_to<S, G>(
    &mut self,
    tracker: &Tracker<S, G>,
    roll: &Roll,
    needle: &str,
  ) -> Result<bool, ApiError>
  where
    S: TrackStore,
    G: Geocoder,
  {
    let customer = match self.customers.get(&roll.id) {
      Some(customer) => customer.clone(),
      None => {
        let customer = tracker.latest_customer(roll).await?;
        self.customers.insert(roll.id, customer.clone());
        customer
      }
    };
    Ok(customer_matches(customer.as_deref(), needle))
  }
}

fn summarize<T>(record: T, roll: Option<Roll>) -> RecordSummary<T> {
  match roll {
    Some(roll) => RecordSummary {
      record,
      roll_id: Some(roll.roll_id),
      root_qr_value: Some(roll.qr_value),
    },
    None => RecordSummary { record, roll_id: None, root_qr_value: None },
  }
}

async fn timelines<S, G>(
  tracker: &Tracker<S, G>,
  rolls: &[Roll],
) -> Result<Vec<TimelineView>, ApiError>
where
  S: TrackStore,
  G: Geocoder,
{
  let mut views = Vec::with_capacity(rolls.len());
  for roll in rolls {
    views.push(tracker.timeline_as(roll, &roll.qr_value).await?);
  }
  Ok(views)
}

fn customer_matches(customer: Option<&str>, needle: &str) -> bool {
  let needle = needle.to_lowercase();
  customer.is_some_and(|c| c.to_lowercase().contains(&needle))
}
