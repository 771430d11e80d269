use chrono::Utc;
use rusqlite::params;

use crate::db::{Database, StoreError};
use crate::models::BalanceSample;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Database {
    /// Append one balance observation stamped with the current UTC time at
    /// second resolution.
    ///
    /// The timestamp is the primary key: a second sample within the same
    /// second is rejected by the key constraint and surfaces as a write
    /// error rather than replacing the first. Sampling call sites are
    /// spaced well apart by design, so a collision is rare and worth
    /// reporting, not retrying.
    pub fn append_balance_sample(
        &self,
        balance: f64,
        daily_pnl: Option<f64>,
    ) -> Result<BalanceSample, StoreError> {
        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        self.append_balance_at(timestamp, balance, daily_pnl)
    }

    fn append_balance_at(
        &self,
        timestamp: String,
        balance: f64,
        daily_pnl: Option<f64>,
    ) -> Result<BalanceSample, StoreError> {
        let conn = self
            .connect()
            .map_err(|e| StoreError::Write(format!("failed to open connection: {}", e)))?;

        conn.execute(
            "INSERT INTO balance_history (timestamp, balance, pnl_daily) VALUES (?1, ?2, ?3)",
            params![timestamp, balance, daily_pnl],
        )
        .map_err(|e| {
            log::error!("failed to append balance sample at {}: {}", timestamp, e);
            StoreError::Write(format!(
                "failed to append balance sample at {}: {}",
                timestamp, e
            ))
        })?;

        log::debug!("balance sample {} = {}", timestamp, balance);
        Ok(BalanceSample {
            timestamp,
            balance,
            pnl_daily: daily_pnl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn test_db() -> (tempfile::TempDir, Database) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("ledger.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn test_append_stamps_second_resolution_utc() {
        let (_dir, db) = test_db();

        let sample = db.append_balance_sample(10_000.0, None).unwrap();
        assert!(NaiveDateTime::parse_from_str(&sample.timestamp, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(sample.balance, 10_000.0);
        assert_eq!(sample.pnl_daily, None);
    }

    #[test]
    fn test_duplicate_timestamp_is_rejected() {
        let (_dir, db) = test_db();

        db.append_balance_at("2024-06-01 00:00:00".to_string(), 10_000.0, None)
            .unwrap();
        let err = db
            .append_balance_at("2024-06-01 00:00:00".to_string(), 10_050.0, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));

        // The first sample is untouched by the failed write.
        let (count, balance): (i64, f64) = db
            .connect()
            .unwrap()
            .query_row(
                "SELECT COUNT(*), MAX(balance) FROM balance_history",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(balance, 10_000.0);
    }

    #[test]
    fn test_optional_daily_pnl_stored_as_null() {
        let (_dir, db) = test_db();

        db.append_balance_at("2024-06-01 00:00:00".to_string(), 10_000.0, None)
            .unwrap();
        db.append_balance_at("2024-06-01 00:00:01".to_string(), 10_100.0, Some(100.0))
            .unwrap();

        let conn = db.connect().unwrap();
        let without: Option<f64> = conn
            .query_row(
                "SELECT pnl_daily FROM balance_history WHERE timestamp = '2024-06-01 00:00:00'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        let with: Option<f64> = conn
            .query_row(
                "SELECT pnl_daily FROM balance_history WHERE timestamp = '2024-06-01 00:00:01'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(without, None);
        assert_eq!(with, Some(100.0));
    }
}
