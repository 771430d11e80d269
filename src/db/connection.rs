use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::db::StoreError;

/// Default ledger location when the host process does not configure one.
pub const DEFAULT_DB_PATH: &str = "trading_bot.db";

/// Environment variable overriding the ledger location for
/// [`Database::from_env`].
pub const DB_PATH_ENV: &str = "TRADE_LEDGER_DB";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS trades (
        id TEXT PRIMARY KEY,
        trade_id_legacy INTEGER,
        symbol TEXT,
        strategy_name TEXT,
        status TEXT,
        side TEXT,

        signal_time TEXT,
        entry_time TEXT,
        latency_ms INTEGER,
        regime TEXT,
        adx REAL,
        atr REAL,
        volatility_pct REAL,
        obi_50 REAL,
        volume_30m REAL,
        open_interest REAL,
        funding_rate REAL,
        z_score REAL,

        leverage INTEGER,
        position_size REAL,
        entry_price REAL,
        requested_entry REAL,
        slippage REAL,
        initial_sl REAL,
        initial_tp REAL,
        planned_rrr REAL,
        dc_range REAL,

        stop_loss REAL,
        target REAL,
        highest_price REAL,
        lowest_price REAL,
        stop_loss_order_ids TEXT,
        take_profit_order_ids TEXT,

        exit_price REAL,
        exit_time TEXT,
        exit_reason TEXT,
        fees REAL,
        gross_pnl REAL,
        net_pnl REAL,

        mae REAL,
        mfe REAL,
        duration_mins REAL
    );

    CREATE TABLE IF NOT EXISTS balance_history (
        timestamp TEXT PRIMARY KEY,
        balance REAL,
        pnl_daily REAL
    );
";

/// Handle on the ledger database.
///
/// Holds only the store location; every operation opens its own scoped
/// connection and releases it before returning, so concurrent callers are
/// isolated by SQLite's own WAL-mode locking rather than anything held
/// here.
#[derive(Debug)]
pub struct Database {
    db_path: PathBuf,
}

impl Database {
    /// Open the ledger at `db_path` and ensure the schema exists.
    ///
    /// Idempotent; safe to call on every process start. Switches the
    /// database to WAL mode so readers are not blocked by concurrent
    /// writers. Any failure here is fatal to the caller: nothing else in
    /// the store works without the schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::SchemaInit(format!(
                        "failed to create data directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(&db_path)
            .map_err(|e| StoreError::SchemaInit(format!("failed to open database: {}", e)))?;

        // WAL sticks to the database file, so one pragma at init covers
        // every per-operation connection that follows.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::SchemaInit(format!("failed to enable WAL mode: {}", e)))?;

        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::SchemaInit(format!("failed to create schema: {}", e)))?;

        log::info!("trade ledger initialized at {}", db_path.display());

        Ok(Database { db_path })
    }

    /// Open the ledger at the path named by `TRADE_LEDGER_DB`, falling
    /// back to [`DEFAULT_DB_PATH`].
    pub fn from_env() -> Result<Self, StoreError> {
        let path = std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        Self::new(path)
    }

    /// Scoped connection for a single operation.
    pub(crate) fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn test_init_creates_both_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ledger.db")).unwrap();

        let conn = db.connect().unwrap();
        for table in ["trades", "balance_history"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_init_is_idempotent_and_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let db = Database::new(&path).unwrap();
        db.connect()
            .unwrap()
            .execute(
                "INSERT INTO balance_history (timestamp, balance) VALUES (?1, ?2)",
                params!["2024-06-01 00:00:00", 10_000.0],
            )
            .unwrap();

        // Second init on the same path must not drop anything.
        let db = Database::new(&path).unwrap();
        let count: i64 = db
            .connect()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM balance_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_init_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("ledger.db");
        assert!(Database::new(&nested).is_ok());
        assert!(nested.exists());
    }

    #[test]
    fn test_init_enables_wal() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ledger.db")).unwrap();

        let mode: String = db
            .connect()
            .unwrap()
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_init_failure_on_unusable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let err = Database::new(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaInit(_)));
    }
}
