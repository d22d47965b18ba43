//! [`SqliteStore`]: the SQLite implementation of [`LinkStore`] and
//! [`TrackStore`].

use std::{
  collections::{BTreeSet, HashSet, VecDeque},
  path::Path,
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use rolltrace_core::{
  link::QrLink,
  phase::{
    Delivery, Dispatch, JobCompletion, JobUsage, NewDelivery, NewDispatch,
    NewJobUsage,
  },
  roll::{NewRoll, Roll, RollStatus},
  store::{LinkStore, RecordQuery, TrackStore},
};

use crate::{
  Result,
  encode::{
    DELIVERY_COLUMNS, DISPATCH_COLUMNS, JOB_COLUMNS, LINK_COLUMNS, ROLL_COLUMNS,
    RawDelivery, RawDispatch, RawJob, RawLink, RawRoll, decode_status,
    encode_dt, encode_status, like_pattern, placeholders, sql_limit,
  },
  schema::SCHEMA,
};

/// Page size for listings that were not given an explicit limit.
const DEFAULT_LIMIT: usize = 50;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A roll tracker store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_links(&self, column: &'static str, qr: &str, order: &'static str) -> Result<Vec<QrLink>> {
    let qr = qr.to_owned();

    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LINK_COLUMNS} FROM qr_links WHERE {column} = ?1 ORDER BY id {order}"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![qr], RawLink::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLink::into_link).collect()
  }

  async fn job_for_roll(&self, roll: i64, order: &'static str) -> Result<Option<JobUsage>> {
    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {JOB_COLUMNS} FROM job_usages WHERE roll = ?1
                 ORDER BY id {order} LIMIT 1"
              ),
              rusqlite::params![roll],
              RawJob::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }
}

// ─── LinkStore impl ──────────────────────────────────────────────────────────

impl LinkStore for SqliteStore {
  type Error = crate::Error;

  async fn add_link(&self, previous: &str, current: &str) -> Result<bool> {
    if !QrLink::is_linkable(previous, current) {
      return Ok(false);
    }

    let previous = previous.to_owned();
    let current  = current.to_owned();
    let at_str   = encode_dt(Utc::now());

    // The UNIQUE pair constraint turns a racing duplicate into a no-op.
    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO qr_links (previous_qr_value, current_qr_value, linked_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![previous, current, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted)
  }

  async fn links_from(&self, qr: &str) -> Result<Vec<QrLink>> {
    self.query_links("previous_qr_value", qr, "ASC").await
  }

  async fn links_to(&self, qr: &str) -> Result<Vec<QrLink>> {
    self.query_links("current_qr_value", qr, "DESC").await
  }

  async fn latest_link_to(&self, qr: &str) -> Result<Option<QrLink>> {
    let qr = qr.to_owned();

    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {LINK_COLUMNS} FROM qr_links WHERE current_qr_value = ?1
                 ORDER BY id DESC LIMIT 1"
              ),
              rusqlite::params![qr],
              RawLink::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn successors(&self, frontier: &[String]) -> Result<Vec<String>> {
    if frontier.is_empty() {
      return Ok(Vec::new());
    }
    let frontier = frontier.to_vec();

    let next = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT DISTINCT current_qr_value FROM qr_links
           WHERE previous_qr_value IN ({})",
          placeholders(1, frontier.len())
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(frontier.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(next)
  }

  async fn root_of(&self, qr: &str) -> Result<String> {
    let qr = qr.to_owned();

    // One read transaction per walk, so every step sees the same edges.
    let root = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let root = {
          let mut stmt = tx.prepare_cached(
            "SELECT previous_qr_value FROM qr_links WHERE current_qr_value = ?1
             ORDER BY id DESC LIMIT 1",
          )?;
          let mut visited = HashSet::from([qr.clone()]);
          let mut current = qr;
          loop {
            let previous: Option<String> = stmt
              .query_row(rusqlite::params![current], |row| row.get(0))
              .optional()?;
            let Some(previous) = previous else { break };
            if !visited.insert(previous.clone()) {
              break;
            }
            current = previous;
          }
          current
        };
        tx.commit()?;
        Ok(root)
      })
      .await?;

    Ok(root)
  }

  async fn closure_of(&self, root: &str) -> Result<BTreeSet<String>> {
    let root = root.to_owned();

    let seen = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let seen = {
          let mut stmt = tx.prepare_cached(
            "SELECT current_qr_value FROM qr_links WHERE previous_qr_value = ?1",
          )?;
          let mut seen = BTreeSet::from([root.clone()]);
          let mut queue = VecDeque::from([root]);
          while let Some(qr) = queue.pop_front() {
            let next = stmt
              .query_map(rusqlite::params![qr], |row| row.get::<_, String>(0))?
              .collect::<rusqlite::Result<Vec<_>>>()?;
            for qr in next {
              if seen.insert(qr.clone()) {
                queue.push_back(qr);
              }
            }
          }
          seen
        };
        tx.commit()?;
        Ok(seen)
      })
      .await?;

    Ok(seen)
  }
}

// ─── TrackStore impl ─────────────────────────────────────────────────────────

impl TrackStore for SqliteStore {
  // ── Rolls ─────────────────────────────────────────────────────────────────

  async fn upsert_roll(&self, input: NewRoll) -> Result<Roll> {
    let at_str     = encode_dt(Utc::now());
    let status_str = encode_status(RollStatus::InStock);

    let raw: RawRoll = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO rolls (roll_id, qr_value, supplier, gsm, width, lot_no, status, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (qr_value) DO UPDATE SET
             roll_id  = excluded.roll_id,
             supplier = excluded.supplier,
             gsm      = excluded.gsm,
             width    = excluded.width,
             lot_no   = excluded.lot_no,
             status   = excluded.status",
          rusqlite::params![
            input.roll_id,
            input.qr_value,
            input.supplier,
            input.gsm,
            input.width,
            input.lot_no,
            status_str,
            at_str,
          ],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {ROLL_COLUMNS} FROM rolls WHERE qr_value = ?1"),
          rusqlite::params![input.qr_value],
          RawRoll::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_roll()
  }

  async fn get_roll_by_qr(&self, qr: &str) -> Result<Option<Roll>> {
    let qr = qr.to_owned();

    let raw: Option<RawRoll> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ROLL_COLUMNS} FROM rolls WHERE qr_value = ?1"),
              rusqlite::params![qr],
              RawRoll::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRoll::into_roll).transpose()
  }

  async fn set_status(&self, roll: i64, status: RollStatus) -> Result<()> {
    let status_str = encode_status(status);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE rolls SET status = ?1 WHERE id = ?2",
          rusqlite::params![status_str, roll],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_by_status(&self) -> Result<Vec<(RollStatus, u64)>> {
    let raws: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM rolls GROUP BY status")?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(status, n)| Ok((decode_status(&status)?, n.max(0) as u64)))
      .collect()
  }

  async fn search_rolls(&self, text: &str, limit: usize) -> Result<Vec<Roll>> {
    let pattern   = like_pattern(text.trim());
    let limit_val = sql_limit(limit);

    let raws: Vec<RawRoll> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          r"SELECT {ROLL_COLUMNS} FROM rolls
            WHERE roll_id LIKE ?1 ESCAPE '\' OR qr_value LIKE ?1 ESCAPE '\'
            ORDER BY id DESC
            LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit_val], RawRoll::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoll::into_roll).collect()
  }

  async fn rolls_with_open_job(&self) -> Result<Vec<Roll>> {
    let raws: Vec<RawRoll> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT r.id, r.roll_id, r.qr_value, r.supplier, r.gsm, r.width,
                  r.lot_no, r.status, r.created_at
           FROM rolls r
           JOIN job_usages j
             ON j.id = (SELECT MAX(id) FROM job_usages WHERE roll = r.id)
           WHERE j.end_time IS NULL
           ORDER BY j.id DESC",
        )?;
        let rows = stmt
          .query_map([], RawRoll::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoll::into_roll).collect()
  }

  // ── Print jobs ────────────────────────────────────────────────────────────

  async fn start_job(&self, input: NewJobUsage) -> Result<JobUsage> {
    let started_at = Utc::now();
    let at_str     = encode_dt(started_at);
    let row        = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO job_usages (roll, job_id, machine, operator_name, remarks, start_time)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            row.roll,
            row.job_id,
            row.machine,
            row.operator_name,
            row.remarks,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(JobUsage {
      id,
      roll:           input.roll,
      job_id:         input.job_id,
      machine:        input.machine,
      operator_name:  input.operator_name,
      remarks:        input.remarks,
      start_time:     Some(started_at),
      end_time:       None,
      meters_printed: None,
      wastage:        None,
    })
  }

  async fn complete_latest_job(
    &self,
    roll:       i64,
    completion: JobCompletion,
  ) -> Result<Option<JobUsage>> {
    let at_str = encode_dt(Utc::now());

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let latest: Option<i64> = tx
          .query_row(
            "SELECT id FROM job_usages WHERE roll = ?1 ORDER BY id DESC LIMIT 1",
            rusqlite::params![roll],
            |row| row.get(0),
          )
          .optional()?;

        let Some(id) = latest else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE job_usages SET
             meters_printed = ?1,
             wastage        = ?2,
             end_time       = ?3,
             operator_name  = COALESCE(?4, operator_name),
             remarks        = COALESCE(?5, remarks)
           WHERE id = ?6",
          rusqlite::params![
            completion.meters_printed,
            completion.wastage,
            at_str,
            completion.operator_name,
            completion.remarks,
            id,
          ],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {JOB_COLUMNS} FROM job_usages WHERE id = ?1"),
          rusqlite::params![id],
          RawJob::from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn first_job(&self, roll: i64) -> Result<Option<JobUsage>> {
    self.job_for_roll(roll, "ASC").await
  }

  async fn latest_job(&self, roll: i64) -> Result<Option<JobUsage>> {
    self.job_for_roll(roll, "DESC").await
  }

  // ── Dispatch ──────────────────────────────────────────────────────────────

  async fn record_dispatch(&self, input: NewDispatch) -> Result<Dispatch> {
    let dispatched_at = Utc::now();
    let at_str        = encode_dt(dispatched_at);
    let row           = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO dispatches (
             qr_value, operator_name, vehicle_no, dispatch_qty,
             customer, invoice_no, remarks, dispatched_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            row.qr_value,
            row.operator_name,
            row.vehicle_no,
            row.dispatch_qty,
            row.customer,
            row.invoice_no,
            row.remarks,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Dispatch {
      id,
      qr_value: input.qr_value,
      operator_name: input.operator_name,
      vehicle_no: input.vehicle_no,
      dispatch_qty: input.dispatch_qty,
      customer: input.customer,
      invoice_no: input.invoice_no,
      remarks: input.remarks,
      dispatched_at,
    })
  }

  async fn latest_dispatch(&self, qrs: &[String]) -> Result<Option<Dispatch>> {
    if qrs.is_empty() {
      return Ok(None);
    }
    let qrs = qrs.to_vec();

    let raw: Option<RawDispatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DISPATCH_COLUMNS} FROM dispatches
                 WHERE qr_value IN ({})
                 ORDER BY id DESC LIMIT 1",
                placeholders(1, qrs.len())
              ),
              rusqlite::params_from_iter(qrs.iter()),
              RawDispatch::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDispatch::into_dispatch).transpose()
  }

  async fn list_dispatches(&self, query: &RecordQuery) -> Result<Vec<Dispatch>> {
    let text_pattern     = query.text.as_deref().map(str::trim).map(like_pattern);
    let customer_pattern = query.customer.as_deref().map(str::trim).map(like_pattern);
    let limit_val        = sql_limit(query.limit.unwrap_or(DEFAULT_LIMIT));

    let raws: Vec<RawDispatch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          r"SELECT {DISPATCH_COLUMNS} FROM dispatches
            WHERE (?1 IS NULL
                   OR qr_value      LIKE ?1 ESCAPE '\'
                   OR operator_name LIKE ?1 ESCAPE '\'
                   OR vehicle_no    LIKE ?1 ESCAPE '\'
                   OR customer      LIKE ?1 ESCAPE '\'
                   OR invoice_no    LIKE ?1 ESCAPE '\'
                   OR remarks       LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR customer LIKE ?2 ESCAPE '\')
            ORDER BY id DESC
            LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![text_pattern, customer_pattern, limit_val],
            RawDispatch::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDispatch::into_dispatch).collect()
  }

  async fn customers(&self) -> Result<Vec<String>> {
    let customers = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT TRIM(customer) AS c FROM dispatches
           WHERE customer IS NOT NULL AND TRIM(customer) != ''
           ORDER BY c",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(customers)
  }

  // ── Delivery ──────────────────────────────────────────────────────────────

  async fn record_delivery(&self, input: NewDelivery) -> Result<Delivery> {
    let confirmed_at = Utc::now();
    let at_str       = encode_dt(confirmed_at);
    let row          = input.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO deliveries (
             qr_value, operator_name, remarks, gps_lat, gps_lng, location, confirmed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            row.qr_value,
            row.operator_name,
            row.remarks,
            row.gps_lat,
            row.gps_lng,
            row.location,
            at_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Delivery {
      id,
      qr_value: input.qr_value,
      operator_name: input.operator_name,
      remarks: input.remarks,
      gps_lat: input.gps_lat,
      gps_lng: input.gps_lng,
      location: input.location,
      confirmed_at,
    })
  }

  async fn latest_delivery(&self, qrs: &[String]) -> Result<Option<Delivery>> {
    if qrs.is_empty() {
      return Ok(None);
    }
    let qrs = qrs.to_vec();

    let raw: Option<RawDelivery> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DELIVERY_COLUMNS} FROM deliveries
                 WHERE qr_value IN ({})
                 ORDER BY id DESC LIMIT 1",
                placeholders(1, qrs.len())
              ),
              rusqlite::params_from_iter(qrs.iter()),
              RawDelivery::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDelivery::into_delivery).transpose()
  }

  async fn list_deliveries(&self, query: &RecordQuery) -> Result<Vec<Delivery>> {
    let text_pattern = query.text.as_deref().map(str::trim).map(like_pattern);
    let limit_val    = sql_limit(query.limit.unwrap_or(DEFAULT_LIMIT));

    let raws: Vec<RawDelivery> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          r"SELECT {DELIVERY_COLUMNS} FROM deliveries
            WHERE (?1 IS NULL
                   OR qr_value      LIKE ?1 ESCAPE '\'
                   OR operator_name LIKE ?1 ESCAPE '\'
                   OR remarks       LIKE ?1 ESCAPE '\'
                   OR location      LIKE ?1 ESCAPE '\')
            ORDER BY id DESC
            LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![text_pattern, limit_val],
            RawDelivery::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDelivery::into_delivery).collect()
  }
}
