//! SQLite schema for the LinkPulse result store.
//!
//! `speed_results` is the append-only measurement log; `app_meta` is a
//! free-form key/value table reserved for app-level counters and flags.
//! Timestamps are stored as unix seconds (UTC).

/// Creates both tables with the current full schema. Idempotent.
pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS speed_results (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    download       REAL,
    upload         REAL,
    ping           REAL,
    server         TEXT NOT NULL,
    server_country TEXT NOT NULL DEFAULT 'n/a',
    timestamp      INTEGER NOT NULL,
    success        INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS app_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Additive column upgrades for databases created by earlier schema
/// revisions (which lacked `server_country` and `success`). Applied with
/// `ALTER TABLE ... ADD COLUMN`; a "duplicate column name" failure is
/// expected on current databases and treated as a no-op.
pub const UPGRADE_COLUMNS: &[(&str, &str)] = &[
    ("server_country", "TEXT NOT NULL DEFAULT 'n/a'"),
    ("success", "INTEGER NOT NULL DEFAULT 1"),
];
