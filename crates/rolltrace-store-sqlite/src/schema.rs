//! SQL schema for the roll tracker SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per physical roll, keyed by the QR scanned at intake.
CREATE TABLE IF NOT EXISTS rolls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    roll_id     TEXT NOT NULL,            -- operator-entered, not unique
    qr_value    TEXT NOT NULL UNIQUE,     -- root QR; never changes
    supplier    TEXT NOT NULL DEFAULT '',
    gsm         INTEGER NOT NULL DEFAULT 0,
    width       INTEGER NOT NULL DEFAULT 0,
    lot_no      TEXT NOT NULL DEFAULT '',
    status      TEXT NOT NULL DEFAULT 'IN_STOCK',
    created_at  TEXT NOT NULL             -- ISO 8601 UTC; first intake
);

-- Relabeling edges. Strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS qr_links (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    previous_qr_value  TEXT NOT NULL,
    current_qr_value   TEXT NOT NULL,
    linked_at          TEXT NOT NULL,
    UNIQUE (previous_qr_value, current_qr_value),
    CHECK  (previous_qr_value != current_qr_value)
);

-- Print runs. Opened at print-start, closed at print-end.
CREATE TABLE IF NOT EXISTS job_usages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    roll            INTEGER NOT NULL REFERENCES rolls(id),
    job_id          TEXT,
    machine         TEXT,
    operator_name   TEXT,
    remarks         TEXT,
    start_time      TEXT,
    end_time        TEXT,                 -- NULL while the job is open
    meters_printed  REAL,
    wastage         REAL
);

-- Keyed by the QR scanned at dispatch, which need not be the root.
CREATE TABLE IF NOT EXISTS dispatches (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    qr_value       TEXT NOT NULL,
    operator_name  TEXT,
    vehicle_no     TEXT,
    dispatch_qty   REAL NOT NULL DEFAULT 0,
    customer       TEXT,
    invoice_no     TEXT,
    remarks        TEXT,
    dispatched_at  TEXT NOT NULL
);

-- Keyed by the QR scanned by the receiver.
CREATE TABLE IF NOT EXISTS deliveries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    qr_value       TEXT NOT NULL,
    operator_name  TEXT,
    remarks        TEXT,
    gps_lat        REAL,
    gps_lng        REAL,
    location       TEXT NOT NULL,
    confirmed_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS qr_links_previous_idx ON qr_links(previous_qr_value);
CREATE INDEX IF NOT EXISTS qr_links_current_idx  ON qr_links(current_qr_value);
CREATE INDEX IF NOT EXISTS job_usages_roll_idx   ON job_usages(roll);
CREATE INDEX IF NOT EXISTS dispatches_qr_idx     ON dispatches(qr_value);
CREATE INDEX IF NOT EXISTS deliveries_qr_idx     ON deliveries(qr_value);

PRAGMA user_version = 1;
";
