//! SQLite-backed trade ledger for a crypto trading bot.
//!
//! Records each trade's full lifecycle (entry context, risk snapshot,
//! management state, and exit performance) plus periodic balance samples,
//! and rebuilds in-memory open-position state after a restart. The two
//! broker order-id lists on every trade round-trip through flat TEXT
//! columns as JSON arrays of strings; that encoding and the column names
//! are restart-compatibility surface and must stay stable.
//!
//! Every operation opens its own scoped connection; concurrent callers
//! rely on SQLite's WAL-mode isolation. Initialization failures are fatal,
//! per-operation failures are logged and returned, never panicked on.
//!
//! ```no_run
//! use trade_ledger::{Database, TradeRecord, TradeSide, TradeStatus, TradeUpdate};
//!
//! # fn main() -> Result<(), trade_ledger::StoreError> {
//! let db = Database::new("trading_bot.db")?;
//!
//! let mut trade = TradeRecord::new("BTCUSDT", "momentum_breakout", TradeSide::Long);
//! trade.entry_price = Some(50_000.0);
//! trade.stop_loss_order_ids = Some(vec!["o1".into(), "o2".into()]);
//! db.record_new_trade(&trade)?;
//!
//! // After a restart, pick up where the bot left off.
//! let open = db.fetch_open_positions()?;
//! assert_eq!(open[0].stop_loss_order_ids, Some(vec!["o1".into(), "o2".into()]));
//!
//! db.update_trade(&trade.id, &TradeUpdate {
//!     status: Some(TradeStatus::Closed),
//!     exit_price: Some(51_000.0),
//!     ..Default::default()
//! })?;
//! db.append_balance_sample(10_250.0, Some(250.0))?;
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod models;

pub use db::{Database, StoreError, DB_PATH_ENV, DEFAULT_DB_PATH};
pub use models::{
    BalanceSample, ExitReason, TradeRecord, TradeSide, TradeStatus, TradeUpdate,
};
