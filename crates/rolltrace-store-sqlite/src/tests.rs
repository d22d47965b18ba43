//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use rolltrace_core::{
  Error as CoreError, Tracker,
  phase::{JobCompletion, NewDelivery, NewDispatch, NewJobUsage},
  resolve::{forward_closure, resolve_root},
  roll::{NewRoll, RollStatus},
  store::{LinkStore, RecordQuery, TrackStore},
  workflow::{DeliveryScan, DispatchScan, PrintEnd, PrintStart, Scan, Stage},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn tracker() -> Tracker<SqliteStore> {
  Tracker::without_geocoder(Arc::new(store().await))
}

fn new_roll(qr: &str, roll_id: &str) -> NewRoll {
  NewRoll {
    qr_value: qr.into(),
    roll_id:  roll_id.into(),
    supplier: "Jindal".into(),
    gsm:      80,
    width:    1200,
    lot_no:   "L-7".into(),
  }
}

fn print_end(scan: Scan, meters: f64, waste: f64) -> PrintEnd {
  PrintEnd { scan, meters_printed: meters, wastage: waste, ..Default::default() }
}

// ─── Links ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_link_is_idempotent() {
  let s = store().await;

  assert!(s.add_link("Q1", "Q2").await.unwrap());
  assert!(!s.add_link("Q1", "Q2").await.unwrap());

  assert_eq!(s.links_from("Q1").await.unwrap().len(), 1);
  assert_eq!(s.links_to("Q2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn add_link_ignores_blank_and_self_links() {
  let s = store().await;

  assert!(!s.add_link("", "Q2").await.unwrap());
  assert!(!s.add_link("Q1", "").await.unwrap());
  assert!(!s.add_link("Q1", "Q1").await.unwrap());

  assert!(s.links_from("Q1").await.unwrap().is_empty());
  assert!(s.links_to("Q1").await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_duplicate_links_store_one_edge() {
  let s = store().await;

  let (a, b) = tokio::join!(s.add_link("Q1", "Q2"), s.add_link("Q1", "Q2"));
  assert!(a.unwrap() ^ b.unwrap());
  assert_eq!(s.links_from("Q1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn links_to_lists_newest_first() {
  let s = store().await;
  s.add_link("A", "X").await.unwrap();
  s.add_link("B", "X").await.unwrap();

  let links = s.links_to("X").await.unwrap();
  let previous: Vec<_> = links.iter().map(|l| l.previous_qr_value.as_str()).collect();
  assert_eq!(previous, ["B", "A"]);

  let latest = s.latest_link_to("X").await.unwrap().unwrap();
  assert_eq!(latest.previous_qr_value, "B");
  assert_eq!(resolve_root(&s, "X").await.unwrap(), "B");
}

#[tokio::test]
async fn resolve_root_terminates_on_stored_cycle() {
  let s = store().await;
  s.add_link("A", "B").await.unwrap();
  s.add_link("B", "C").await.unwrap();
  s.add_link("C", "A").await.unwrap();

  assert_eq!(resolve_root(&s, "A").await.unwrap(), "B");
  let closure = forward_closure(&s, "A").await.unwrap();
  assert_eq!(closure.len(), 3);
}

#[tokio::test]
async fn single_read_walks_agree_with_stepwise_walks() {
  let s = store().await;
  for (previous, current) in [
    ("Q1", "Q2"),
    ("Q2", "Q3"),
    ("X", "Q2"),
    ("Q3", "Q4"),
    ("Q4", "Q2"),
    ("Q1", "Q5"),
    ("A", "A2"),
  ] {
    s.add_link(previous, current).await.unwrap();
  }

  for qr in ["Q1", "Q2", "Q3", "Q4", "Q5", "X", "A2", "never-seen"] {
    assert_eq!(s.root_of(qr).await.unwrap(), resolve_root(&s, qr).await.unwrap(), "{qr}");
    assert_eq!(
      s.closure_of(qr).await.unwrap(),
      forward_closure(&s, qr).await.unwrap(),
      "{qr}"
    );
  }
}

#[tokio::test]
async fn single_read_root_walk_handles_deep_chains() {
  let s = store().await;
  for i in 0..150 {
    s.add_link(&format!("Q{i}"), &format!("Q{}", i + 1)).await.unwrap();
  }

  assert_eq!(s.root_of("Q150").await.unwrap(), "Q0");
  assert_eq!(s.closure_of("Q0").await.unwrap().len(), 151);
}

#[tokio::test]
async fn concurrent_relabel_sees_a_whole_graph() {
  let s = store().await;
  s.add_link("Q1", "Q2").await.unwrap();
  s.add_link("Q2", "Q3").await.unwrap();

  // Either the walk runs before the new edge into Q2 or entirely after it.
  let (root, linked) = tokio::join!(s.root_of("Q3"), s.add_link("X", "Q2"));
  assert!(linked.unwrap());
  let root = root.unwrap();
  assert!(root == "Q1" || root == "X", "{root}");
  assert_eq!(s.root_of("Q3").await.unwrap(), "X");
}

#[tokio::test]
async fn successors_returns_distinct_next_level() {
  let s = store().await;
  s.add_link("Q1", "Q2").await.unwrap();
  s.add_link("Q1", "Q3").await.unwrap();
  s.add_link("Q9", "Q3").await.unwrap();

  let mut next = s
    .successors(&["Q1".to_owned(), "Q9".to_owned()])
    .await
    .unwrap();
  next.sort();
  assert_eq!(next, ["Q2", "Q3"]);
  assert!(s.successors(&[]).await.unwrap().is_empty());
}

// ─── Rolls ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_roll_creates_then_overwrites_keeping_created_at() {
  let s = store().await;

  let first = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  assert_eq!(first.status, RollStatus::InStock);
  s.set_status(first.id, RollStatus::Dispatched).await.unwrap();

  let second = s
    .upsert_roll(NewRoll { qr_value: "Q1".into(), roll_id: "R1-b".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(second.id, first.id);
  assert_eq!(second.created_at, first.created_at);
  assert_eq!(second.roll_id, "R1-b");
  assert_eq!(second.supplier, "");
  assert_eq!(second.gsm, 0);
  assert_eq!(second.status, RollStatus::InStock);
}

#[tokio::test]
async fn roll_codes_need_not_be_unique() {
  let s = store().await;
  s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  s.upsert_roll(new_roll("Q2", "R1")).await.unwrap();

  assert_eq!(s.search_rolls("R1", 50).await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_roll_by_qr_is_exact() {
  let s = store().await;
  s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  s.add_link("Q1", "Q2").await.unwrap();

  assert!(s.get_roll_by_qr("Q1").await.unwrap().is_some());
  assert!(s.get_roll_by_qr("Q2").await.unwrap().is_none());
}

#[tokio::test]
async fn search_rolls_matches_code_or_qr_case_insensitively() {
  let s = store().await;
  s.upsert_roll(new_roll("upi://pay?pa=abc", "ROLL-001")).await.unwrap();
  s.upsert_roll(new_roll("Q2", "ROLL-002")).await.unwrap();
  s.upsert_roll(new_roll("Q3", "OTHER")).await.unwrap();

  assert_eq!(s.search_rolls("roll-", 50).await.unwrap().len(), 2);
  assert_eq!(s.search_rolls("PAY?PA", 50).await.unwrap().len(), 1);
  assert_eq!(s.search_rolls("", 50).await.unwrap().len(), 3);
  assert_eq!(s.search_rolls("", 2).await.unwrap().len(), 2);
  assert!(s.search_rolls("%", 50).await.unwrap().is_empty());
}

#[tokio::test]
async fn count_by_status_groups_rolls() {
  let s = store().await;
  let a = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  s.upsert_roll(new_roll("Q2", "R2")).await.unwrap();
  s.set_status(a.id, RollStatus::InUse).await.unwrap();

  let mut counts = s.count_by_status().await.unwrap();
  counts.sort_by_key(|(status, _)| status.to_string());
  assert_eq!(counts, [(RollStatus::InStock, 1), (RollStatus::InUse, 1)]);
}

// ─── Print jobs ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_latest_job_closes_newest_only() {
  let s = store().await;
  let roll = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();

  let first = s
    .start_job(NewJobUsage { roll: roll.id, job_id: Some("J1".into()), ..Default::default() })
    .await
    .unwrap();
  let second = s
    .start_job(NewJobUsage { roll: roll.id, job_id: Some("J2".into()), ..Default::default() })
    .await
    .unwrap();

  let closed = s
    .complete_latest_job(roll.id, JobCompletion {
      meters_printed: 100.0,
      wastage: 5.0,
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(closed.id, second.id);
  assert!(!closed.is_open());
  assert_eq!(closed.meters_printed, Some(100.0));

  let first_again = s.first_job(roll.id).await.unwrap().unwrap();
  assert_eq!(first_again.id, first.id);
  assert!(first_again.is_open());
  assert_eq!(s.latest_job(roll.id).await.unwrap().unwrap().id, second.id);
}

#[tokio::test]
async fn complete_latest_job_without_jobs_writes_nothing() {
  let s = store().await;
  let roll = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();

  let closed = s
    .complete_latest_job(roll.id, JobCompletion::default())
    .await
    .unwrap();
  assert!(closed.is_none());
  assert!(s.latest_job(roll.id).await.unwrap().is_none());
}

#[tokio::test]
async fn completion_keeps_start_operator_unless_given() {
  let s = store().await;
  let roll = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  s.start_job(NewJobUsage {
    roll: roll.id,
    operator_name: Some("Asha".into()),
    remarks: Some("start".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  let closed = s
    .complete_latest_job(roll.id, JobCompletion {
      remarks: Some("ink smear".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(closed.operator_name.as_deref(), Some("Asha"));
  assert_eq!(closed.remarks.as_deref(), Some("ink smear"));
}

#[tokio::test]
async fn rolls_with_open_job_looks_at_latest_job() {
  let s = store().await;
  let open = s.upsert_roll(new_roll("Q1", "R1")).await.unwrap();
  let done = s.upsert_roll(new_roll("Q2", "R2")).await.unwrap();
  s.upsert_roll(new_roll("Q3", "R3")).await.unwrap();

  s.start_job(NewJobUsage { roll: open.id, ..Default::default() }).await.unwrap();
  s.start_job(NewJobUsage { roll: done.id, ..Default::default() }).await.unwrap();
  s.complete_latest_job(done.id, JobCompletion::default()).await.unwrap();

  let active = s.rolls_with_open_job().await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].id, open.id);
}

// ─── Dispatch and delivery ───────────────────────────────────────────────────

fn dispatch_to(qr: &str, customer: &str) -> NewDispatch {
  NewDispatch {
    qr_value: qr.into(),
    customer: Some(customer.into()),
    dispatch_qty: 1.0,
    ..Default::default()
  }
}

#[tokio::test]
async fn latest_dispatch_picks_newest_in_set() {
  let s = store().await;
  s.record_dispatch(dispatch_to("Q2", "Acme")).await.unwrap();
  let newest = s.record_dispatch(dispatch_to("Q3", "Globex")).await.unwrap();
  s.record_dispatch(dispatch_to("ZZ", "Initech")).await.unwrap();

  let qrs = vec!["Q1".to_owned(), "Q2".to_owned(), "Q3".to_owned()];
  let latest = s.latest_dispatch(&qrs).await.unwrap().unwrap();
  assert_eq!(latest.id, newest.id);
  assert!(s.latest_dispatch(&[]).await.unwrap().is_none());
}

#[tokio::test]
async fn list_dispatches_filters_by_text_and_customer() {
  let s = store().await;
  s.record_dispatch(dispatch_to("Q1", "Acme Packaging")).await.unwrap();
  s.record_dispatch(NewDispatch {
    vehicle_no: Some("MH12AB1234".into()),
    ..dispatch_to("Q2", "Globex")
  })
  .await
  .unwrap();

  let all = s.list_dispatches(&RecordQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].qr_value, "Q2");

  let by_customer = s
    .list_dispatches(&RecordQuery { customer: Some("acme".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_customer.len(), 1);
  assert_eq!(by_customer[0].qr_value, "Q1");

  let by_text = s
    .list_dispatches(&RecordQuery { text: Some("mh12".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_text.len(), 1);
  assert_eq!(by_text[0].qr_value, "Q2");

  let limited = s
    .list_dispatches(&RecordQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn customers_are_distinct_and_sorted() {
  let s = store().await;
  s.record_dispatch(dispatch_to("Q1", "Globex")).await.unwrap();
  s.record_dispatch(dispatch_to("Q2", "Acme")).await.unwrap();
  s.record_dispatch(dispatch_to("Q3", "Globex")).await.unwrap();
  s.record_dispatch(dispatch_to("Q4", "  ")).await.unwrap();
  s.record_dispatch(NewDispatch { qr_value: "Q5".into(), ..Default::default() })
    .await
    .unwrap();

  assert_eq!(s.customers().await.unwrap(), ["Acme", "Globex"]);
}

#[tokio::test]
async fn deliveries_round_trip_and_filter() {
  let s = store().await;
  s.record_delivery(NewDelivery {
    qr_value: "Q4".into(),
    gps_lat: Some(18.52),
    gps_lng: Some(73.85),
    location: "Pune".into(),
    ..Default::default()
  })
  .await
  .unwrap();

  let latest = s
    .latest_delivery(&["Q4".to_owned()])
    .await
    .unwrap()
    .unwrap();
  assert_eq!(latest.location, "Pune");
  assert_eq!(latest.gps_lat, Some(18.52));

  let found = s
    .list_deliveries(&RecordQuery { text: Some("pune".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  let none = s
    .list_deliveries(&RecordQuery { text: Some("Mumbai".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(none.is_empty());
}

// ─── Workflow, end to end ────────────────────────────────────────────────────

#[tokio::test]
async fn print_cycle_on_one_label_completes_flexo_end() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  t.print_start(PrintStart { scan: Scan::new("Q1"), ..Default::default() })
    .await
    .unwrap();
  let out = t.print_end(print_end(Scan::new("Q1"), 100.0, 5.0)).await.unwrap();
  assert_eq!(out.status, Stage::PrintingCompleted);
  assert_eq!(out.root_qr_value.as_deref(), Some("Q1"));

  let view = t.timeline("Q1").await.unwrap();
  assert!(view.phases.flexo_end.completed);
  let end = view.phases.flexo_end.data.unwrap();
  assert_eq!(end.meters_printed, Some(100.0));
  assert_eq!(end.wastage, Some(5.0));
  assert_eq!(view.status, RollStatus::PrintingCompleted);
}

#[tokio::test]
async fn relabel_at_print_start_resolves_from_either_label() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  let out = t
    .print_start(PrintStart { scan: Scan::relabeled("Q1", "Q2"), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(out.root_qr_value.as_deref(), Some("Q1"));

  for qr in ["Q1", "Q2"] {
    let view = t.timeline(qr).await.unwrap();
    assert_eq!(view.qr_value, qr);
    assert_eq!(view.root_qr_value, "Q1");
    assert!(view.phases.flexo_start.completed);
    assert!(!view.phases.flexo_end.completed);
    assert_eq!(view.linked_qrs, ["Q1", "Q2"]);
  }
}

#[tokio::test]
async fn dispatch_three_labels_deep_shows_from_root() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  t.print_start(PrintStart { scan: Scan::relabeled("Q1", "Q2"), ..Default::default() })
    .await
    .unwrap();
  t.print_end(print_end(Scan::relabeled("Q2", "Q3"), 40.0, 1.0)).await.unwrap();
  t.dispatch(DispatchScan {
    scan: Scan::relabeled("Q3", "Q4"),
    customer: Some("Acme".into()),
    dispatch_qty: 12.5,
    ..Default::default()
  })
  .await
  .unwrap();

  let view = t.timeline("Q1").await.unwrap();
  assert!(view.phases.dispatch.completed);
  let dispatch = view.phases.dispatch.data.unwrap();
  assert_eq!(dispatch.qr_value, "Q4");
  assert_eq!(dispatch.customer.as_deref(), Some("Acme"));
  assert_eq!(view.timeline.dispatch, view.phases.dispatch.time);
  assert_eq!(view.linked_qrs, ["Q1", "Q2", "Q3", "Q4"]);
  assert_eq!(view.status, RollStatus::Dispatched);
}

#[tokio::test]
async fn delivery_without_geocoder_records_unknown_location() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  let out = t
    .deliver(DeliveryScan {
      scan: Scan::relabeled("Q1", "Q5"),
      lat: Some(18.5),
      lng: Some(73.8),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(out.status, Stage::Delivered);

  let view = t.timeline("Q5").await.unwrap();
  let delivery = view.phases.delivery.data.unwrap();
  assert_eq!(delivery.location, rolltrace_core::geocode::UNKNOWN_LOCATION);
  assert_eq!(delivery.lat, Some(18.5));
  assert_eq!(view.status, RollStatus::Delivered);
  assert!(view.timeline.delivered.is_some());
}

#[tokio::test]
async fn unknown_qr_is_not_found() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();

  assert!(matches!(t.timeline("nope").await, Err(CoreError::RollNotFound(_))));
  let (roll, root) = t.lookup("nope").await.unwrap();
  assert!(roll.is_none());
  assert_eq!(root, "nope");
}

#[tokio::test]
async fn not_found_scan_keeps_its_link() {
  let t = tracker().await;

  let err = t
    .print_start(PrintStart { scan: Scan::relabeled("X1", "X2"), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::RollNotFound(ref qr) if qr == "X2"));
  assert_eq!(t.store().links_to("X2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_qr_is_rejected_before_any_write() {
  let t = tracker().await;

  let err = t
    .print_start(PrintStart { scan: Scan::relabeled("Q0", "   "), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::MissingField("qr_value")));
  assert!(t.store().links_from("Q0").await.unwrap().is_empty());

  let err = t.inward(new_roll("Q1", "")).await.unwrap_err();
  assert!(matches!(err, CoreError::MissingField("roll_id")));
  assert!(t.store().get_roll_by_qr("Q1").await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_print_end_without_job_skips_record() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();

  let (a, b) = tokio::join!(
    t.print_end(print_end(Scan::new("Q1"), 10.0, 1.0)),
    t.print_end(print_end(Scan::new("Q1"), 20.0, 2.0)),
  );
  assert_eq!(a.unwrap().status, Stage::PrintingCompleted);
  assert_eq!(b.unwrap().status, Stage::PrintingCompleted);

  let roll = t.store().get_roll_by_qr("Q1").await.unwrap().unwrap();
  assert_eq!(roll.status, RollStatus::PrintingCompleted);
  assert!(t.store().latest_job(roll.id).await.unwrap().is_none());

  let view = t.timeline("Q1").await.unwrap();
  assert!(!view.phases.flexo_start.completed);
  assert!(!view.phases.flexo_end.completed);
}

#[tokio::test]
async fn reintake_keeps_root_and_resets_status() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  t.dispatch(DispatchScan { scan: Scan::new("Q1"), ..Default::default() })
    .await
    .unwrap();

  let out = t.inward(new_roll(" Q1 ", "R1-new")).await.unwrap();
  assert_eq!(out.status, Stage::InwardSaved);
  assert_eq!(out.qr_value.as_deref(), Some("Q1"));
  assert_eq!(out.roll_id, "R1-new");

  let view = t.timeline("Q1").await.unwrap();
  assert_eq!(view.status, RollStatus::InStock);
  assert!(view.phases.dispatch.completed);
}

#[tokio::test]
async fn second_open_run_leaves_flexo_end_incomplete() {
  let t = tracker().await;
  t.inward(new_roll("Q1", "R1")).await.unwrap();
  let start = || PrintStart { scan: Scan::new("Q1"), ..Default::default() };
  t.print_start(start()).await.unwrap();
  t.print_end(print_end(Scan::new("Q1"), 50.0, 0.0)).await.unwrap();
  t.print_start(start()).await.unwrap();

  let view = t.timeline("Q1").await.unwrap();
  assert!(view.phases.flexo_start.completed);
  assert!(!view.phases.flexo_end.completed);
  assert!(view.phases.flexo_end.data.is_none());
  assert_eq!(view.status, RollStatus::InUse);
}
