//! ResultStore — SQLite-backed measurement log for LinkPulse.
//!
//! Provides the append/query/prune operations over `speed_results` and
//! the key/value operations over `app_meta`. The store supports on-disk
//! and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::schema;
use crate::types::{MeasurementRecord, NewRecord};

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe result store backed by SQLite.
///
/// Cloning is cheap; all clones share one connection behind a mutex,
/// which is the single-writer discipline the datastore requires.
#[derive(Clone)]
pub struct ResultStore {
    conn: Arc<Mutex<Connection>>,
}

impl ResultStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(map_err!(Open))?;
        let store = Self::from_connection(conn)?;
        debug!(?path, "result store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_err!(Open))?;
        let store = Self::from_connection(conn)?;
        debug!("in-memory result store opened");
        Ok(store)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "journal_mode", "wal")
            .map_err(map_err!(Open))?;
        conn.busy_timeout(Duration::from_millis(5_000))
            .map_err(map_err!(Open))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    /// Idempotently ensure the schema exists. Safe on every startup;
    /// never destroys existing data.
    ///
    /// Databases created before `server_country` and `success` existed
    /// are upgraded in place by adding the missing columns. Only "duplicate column name"
    /// is tolerated; any other migration failure propagates.
    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(map_err!(Migrate))?;
        for (column, decl) in schema::UPGRADE_COLUMNS {
            if add_column_if_missing(&conn, "speed_results", column, decl)? {
                debug!(column, "schema upgraded with new column");
            }
        }
        Ok(())
    }

    /// Append one measurement attempt. Assigns the completion timestamp
    /// if the record carries none. Returns the assigned row id.
    pub fn append(&self, record: &NewRecord) -> StoreResult<i64> {
        let conn = self.conn()?;
        let timestamp = record.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
        conn.execute(
            "INSERT INTO speed_results
                 (download, upload, ping, server, server_country, timestamp, success)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.download_mbps,
                record.upload_mbps,
                record.ping_ms,
                record.server_name,
                record.server_country,
                timestamp.unix_timestamp(),
                record.success,
            ],
        )
        .map_err(map_err!(Write))?;
        Ok(conn.last_insert_rowid())
    }

    /// All records, ascending by timestamp (id breaks ties).
    pub fn query_all(&self) -> StoreResult<Vec<MeasurementRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, download, upload, ping, server, server_country, timestamp, success
                 FROM speed_results
                 ORDER BY timestamp ASC, id ASC",
            )
            .map_err(map_err!(Read))?;
        let rows = stmt
            .query_map([], row_to_record)
            .map_err(map_err!(Read))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_err!(Read))?;
        Ok(rows)
    }

    /// The `n` most recent records, descending by timestamp.
    pub fn query_recent(&self, n: u32) -> StoreResult<Vec<MeasurementRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, download, upload, ping, server, server_country, timestamp, success
                 FROM speed_results
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(map_err!(Read))?;
        let rows = stmt
            .query_map(params![n], row_to_record)
            .map_err(map_err!(Read))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_err!(Read))?;
        Ok(rows)
    }

    /// Delete all records strictly older than `now - retention`.
    /// Returns the number of rows removed.
    pub fn prune_older_than(&self, retention: Duration) -> StoreResult<u64> {
        self.prune_before(OffsetDateTime::now_utc() - retention)
    }

    /// Delete all records with a timestamp strictly before `cutoff`.
    ///
    /// A single `DELETE` statement, so the removal is atomic: all
    /// qualifying rows go, or none do on error.
    pub fn prune_before(&self, cutoff: OffsetDateTime) -> StoreResult<u64> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM speed_results WHERE timestamp < ?1",
                params![cutoff.unix_timestamp()],
            )
            .map_err(map_err!(Write))?;
        if deleted > 0 {
            debug!(deleted, "pruned stale records");
        }
        Ok(deleted as u64)
    }

    /// Count leading failures among the most recent `limit` records,
    /// stopping at the first success. A store with fewer than `limit`
    /// rows returns the count of failures found.
    pub fn count_consecutive_failures(&self, limit: u32) -> StoreResult<u32> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT success FROM speed_results
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(map_err!(Read))?;
        let mut rows = stmt.query(params![limit]).map_err(map_err!(Read))?;
        let mut count = 0;
        while let Some(row) = rows.next().map_err(map_err!(Read))? {
            let success: bool = row.get(0).map_err(map_err!(Read))?;
            if success {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Look up an `app_meta` value by key.
    pub fn meta_get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_err!(Read))
    }

    /// Insert or update an `app_meta` entry.
    pub fn meta_set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(map_err!(Write))?;
        Ok(())
    }
}

/// Add a column to `table`, treating "duplicate column name" as a no-op.
/// Returns true if the column was actually added.
fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    decl: &str,
) -> StoreResult<bool> {
    let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {decl}");
    match conn.execute(&sql, []) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(_, Some(msg)))
            if msg.contains("duplicate column name") =>
        {
            Ok(false)
        }
        Err(e) => Err(StoreError::Migrate(e.to_string())),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<MeasurementRecord> {
    let epoch: i64 = row.get(6)?;
    let timestamp = OffsetDateTime::from_unix_timestamp(epoch).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Integer, Box::new(e))
    })?;
    Ok(MeasurementRecord {
        id: row.get(0)?,
        download_mbps: row.get(1)?,
        upload_mbps: row.get(2)?,
        ping_ms: row.get(3)?,
        server_name: row.get(4)?,
        server_country: row.get(5)?,
        timestamp,
        success: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn open_store() -> ResultStore {
        let store = ResultStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn success_at(ts: OffsetDateTime) -> NewRecord {
        NewRecord::success(95.2, 11.4, Some(18.0), "ExampleNet", "DE").at(ts)
    }

    // ── Schema ─────────────────────────────────────────────────────

    #[test]
    fn initialize_is_idempotent() {
        let store = open_store();
        store.initialize().unwrap();
        store.initialize().unwrap();
        assert!(store.query_all().unwrap().is_empty());
    }

    #[test]
    fn initialize_preserves_existing_rows() {
        let store = open_store();
        store.append(&NewRecord::failure()).unwrap();
        store.initialize().unwrap();
        assert_eq!(store.query_all().unwrap().len(), 1);
    }

    #[test]
    fn initialize_upgrades_legacy_schema() {
        // Databases written by the original tool lack server_country
        // and success.
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE speed_results (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 download REAL, upload REAL, ping REAL,
                 server TEXT NOT NULL, timestamp INTEGER NOT NULL
             );
             INSERT INTO speed_results (download, upload, ping, server, timestamp)
             VALUES (50.0, 10.0, 20.0, 'LegacyNet', 1000);",
        )
        .unwrap();
        let store = ResultStore {
            conn: Arc::new(Mutex::new(conn)),
        };

        store.initialize().unwrap();
        store.initialize().unwrap();

        let rows = store.query_all().unwrap();
        assert_eq!(rows.len(), 1);
        // Upgrade defaults: legacy rows count as successful, no country.
        assert!(rows[0].success);
        assert_eq!(rows[0].server_country, "n/a");
        assert_eq!(rows[0].download_mbps, Some(50.0));
    }

    #[test]
    fn initialize_propagates_genuine_migration_failures() {
        // A legacy database that still needs the column upgrade, on a
        // connection that cannot write: the ALTER TABLE must surface as
        // a migration error, not be swallowed like "duplicate column".
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE speed_results (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 download REAL, upload REAL, ping REAL,
                 server TEXT NOT NULL, timestamp INTEGER NOT NULL
             );
             CREATE TABLE app_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
        )
        .unwrap();
        conn.pragma_update(None, "query_only", "on").unwrap();
        let store = ResultStore {
            conn: Arc::new(Mutex::new(conn)),
        };

        let err = store.initialize().unwrap_err();
        assert!(matches!(err, StoreError::Migrate(_)), "got {err:?}");
    }

    // ── Append / query ─────────────────────────────────────────────

    #[test]
    fn append_assigns_monotonic_ids() {
        let store = open_store();
        let a = store.append(&NewRecord::failure()).unwrap();
        let b = store.append(&NewRecord::failure()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn append_assigns_timestamp_when_absent() {
        let store = open_store();
        store.append(&NewRecord::failure()).unwrap();
        let rows = store.query_all().unwrap();
        assert!(rows[0].timestamp.unix_timestamp() > 0);
    }

    #[test]
    fn query_all_ascending_query_recent_descending() {
        let store = open_store();
        let t1 = datetime!(2026-08-01 10:00 UTC);
        let t2 = datetime!(2026-08-02 10:00 UTC);
        let t3 = datetime!(2026-08-03 10:00 UTC);
        store.append(&success_at(t2)).unwrap();
        store.append(&success_at(t1)).unwrap();
        store.append(&success_at(t3)).unwrap();

        let all = store.query_all().unwrap();
        assert_eq!(
            all.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
            vec![t1, t2, t3]
        );

        let recent = store.query_recent(2).unwrap();
        assert_eq!(
            recent.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
            vec![t3, t2]
        );
    }

    #[test]
    fn failure_row_round_trips_with_sentinels() {
        let store = open_store();
        store.append(&NewRecord::failure()).unwrap();
        let rows = store.query_all().unwrap();
        let row = &rows[0];
        assert!(!row.success);
        assert_eq!(row.download_mbps, None);
        assert_eq!(row.upload_mbps, None);
        assert_eq!(row.ping_ms, None);
        assert_eq!(row.server_name, "n/a");
        assert_eq!(row.server_country, "n/a");
    }

    // ── Consecutive failures ───────────────────────────────────────

    #[test]
    fn consecutive_failures_counts_trailing_run() {
        let store = open_store();
        let base = datetime!(2026-08-01 00:00 UTC);
        store.append(&success_at(base)).unwrap();
        for i in 1..=3u64 {
            store
                .append(&NewRecord::failure().at(base + Duration::from_secs(i * 60)))
                .unwrap();
        }
        assert_eq!(store.count_consecutive_failures(10).unwrap(), 3);
    }

    #[test]
    fn consecutive_failures_capped_by_limit() {
        let store = open_store();
        let base = datetime!(2026-08-01 00:00 UTC);
        for i in 0..6u64 {
            store
                .append(&NewRecord::failure().at(base + Duration::from_secs(i * 60)))
                .unwrap();
        }
        assert_eq!(store.count_consecutive_failures(4).unwrap(), 4);
    }

    #[test]
    fn consecutive_failures_short_history_not_padded() {
        let store = open_store();
        store.append(&NewRecord::failure()).unwrap();
        store
            .append(&NewRecord::failure().at(datetime!(2026-08-01 00:01 UTC)))
            .unwrap();
        assert_eq!(store.count_consecutive_failures(10).unwrap(), 2);
    }

    #[test]
    fn consecutive_failures_reset_by_recent_success() {
        let store = open_store();
        let base = datetime!(2026-08-01 00:00 UTC);
        for i in 0..4u64 {
            store
                .append(&NewRecord::failure().at(base + Duration::from_secs(i * 60)))
                .unwrap();
        }
        assert_eq!(store.count_consecutive_failures(4).unwrap(), 4);

        store
            .append(&success_at(base + Duration::from_secs(5 * 60)))
            .unwrap();
        assert_eq!(store.count_consecutive_failures(4).unwrap(), 0);
    }

    #[test]
    fn consecutive_failures_empty_store_is_zero() {
        let store = open_store();
        assert_eq!(store.count_consecutive_failures(4).unwrap(), 0);
    }

    // ── Pruning ────────────────────────────────────────────────────

    #[test]
    fn prune_removes_only_strictly_older_rows() {
        let store = open_store();
        let cutoff = datetime!(2026-06-01 00:00 UTC);
        store
            .append(&success_at(cutoff - Duration::from_secs(86_400))) // 91st day
            .unwrap();
        store
            .append(&success_at(cutoff + Duration::from_secs(86_400))) // 89th day
            .unwrap();
        store.append(&success_at(cutoff)).unwrap(); // exactly at cutoff stays

        assert_eq!(store.prune_before(cutoff).unwrap(), 1);
        let remaining = store.query_all().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.timestamp >= cutoff));
    }

    #[test]
    fn prune_is_idempotent() {
        let store = open_store();
        let cutoff = datetime!(2026-06-01 00:00 UTC);
        store
            .append(&success_at(cutoff - Duration::from_secs(10)))
            .unwrap();
        assert_eq!(store.prune_before(cutoff).unwrap(), 1);
        assert_eq!(store.prune_before(cutoff).unwrap(), 0);
    }

    #[test]
    fn prune_older_than_retention_window() {
        let store = open_store();
        let now = OffsetDateTime::now_utc();
        let day = Duration::from_secs(86_400);
        store.append(&success_at(now - 91 * day)).unwrap();
        store.append(&success_at(now - 89 * day)).unwrap();

        assert_eq!(store.prune_older_than(90 * day).unwrap(), 1);
        let remaining = store.query_all().unwrap();
        assert_eq!(remaining.len(), 1);
        // Stored timestamps are truncated to whole seconds.
        assert_eq!(
            remaining[0].timestamp.unix_timestamp(),
            (now - 89 * day).unix_timestamp()
        );
    }

    // ── Meta ───────────────────────────────────────────────────────

    #[test]
    fn meta_get_missing_returns_none() {
        let store = open_store();
        assert_eq!(store.meta_get("nope").unwrap(), None);
    }

    #[test]
    fn meta_set_and_update() {
        let store = open_store();
        store.meta_set("last_report_at", "2026-08-24").unwrap();
        assert_eq!(
            store.meta_get("last_report_at").unwrap().as_deref(),
            Some("2026-08-24")
        );

        store.meta_set("last_report_at", "2026-08-31").unwrap();
        assert_eq!(
            store.meta_get("last_report_at").unwrap().as_deref(),
            Some("2026-08-31")
        );
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("linkpulse.db");

        {
            let store = ResultStore::open(&db_path).unwrap();
            store.initialize().unwrap();
            store
                .append(&success_at(datetime!(2026-08-01 10:00 UTC)))
                .unwrap();
        }

        let store = ResultStore::open(&db_path).unwrap();
        store.initialize().unwrap();
        let rows = store.query_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].server_name, "ExampleNet");
    }
}
