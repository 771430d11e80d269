use rusqlite::{params, Row};

use crate::db::{Database, StoreError};
use crate::models::{ExitReason, TradeRecord, TradeSide, TradeStatus, TradeUpdate};

const TRADE_COLUMNS: &str = "id, trade_id_legacy, symbol, strategy_name, status, side, \
     signal_time, entry_time, latency_ms, regime, adx, atr, volatility_pct, obi_50, \
     volume_30m, open_interest, funding_rate, z_score, \
     leverage, position_size, entry_price, requested_entry, slippage, initial_sl, \
     initial_tp, planned_rrr, dc_range, \
     stop_loss, target, highest_price, lowest_price, stop_loss_order_ids, take_profit_order_ids, \
     exit_price, exit_time, exit_reason, fees, gross_pnl, net_pnl, \
     mae, mfe, duration_mins";

/// Serialize an order-id list for storage. `None` stays NULL; an empty
/// list becomes the JSON text `[]`, keeping "never set" and "set to
/// nothing" distinguishable on read.
fn encode_order_ids(ids: Option<&Vec<String>>) -> Result<Option<String>, StoreError> {
    match ids {
        None => Ok(None),
        Some(ids) => serde_json::to_string(ids)
            .map(Some)
            .map_err(|e| StoreError::Write(format!("failed to encode order ids: {}", e))),
    }
}

/// Restore an order-id list from its stored text. NULL and empty text mean
/// the field was never set; anything else must be a valid JSON array of
/// strings or the row is treated as corrupt.
fn decode_order_ids(
    trade_id: &str,
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<Vec<String>>, StoreError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| {
            log::error!("corrupt {} for trade {}: {}", column, trade_id, e);
            StoreError::Serialization {
                trade_id: trade_id.to_string(),
                column,
                reason: e.to_string(),
            }
        }),
    }
}

/// Maps a row to a trade plus the raw text of its two order-id columns,
/// which are decoded by the caller so a malformed list surfaces as a
/// serialization failure naming the trade rather than a generic row error.
fn map_row_to_trade(row: &Row) -> rusqlite::Result<(TradeRecord, Option<String>, Option<String>)> {
    let status_str: String = row.get(4)?;
    let status = TradeStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown trade status {:?}", status_str).into(),
        )
    })?;

    let side_str: String = row.get(5)?;
    let side = TradeSide::from_str(&side_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown trade side {:?}", side_str).into(),
        )
    })?;

    let exit_reason = match row.get::<_, Option<String>>(35)? {
        Some(s) => Some(ExitReason::from_str(&s).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                35,
                rusqlite::types::Type::Text,
                format!("unknown exit reason {:?}", s).into(),
            )
        })?),
        None => None,
    };

    let stop_loss_order_ids_raw: Option<String> = row.get(31)?;
    let take_profit_order_ids_raw: Option<String> = row.get(32)?;

    let trade = TradeRecord {
        id: row.get(0)?,
        trade_id_legacy: row.get(1)?,
        symbol: row.get(2)?,
        strategy_name: row.get(3)?,
        status,
        side,
        signal_time: row.get(6)?,
        entry_time: row.get(7)?,
        latency_ms: row.get(8)?,
        regime: row.get(9)?,
        adx: row.get(10)?,
        atr: row.get(11)?,
        volatility_pct: row.get(12)?,
        obi_50: row.get(13)?,
        volume_30m: row.get(14)?,
        open_interest: row.get(15)?,
        funding_rate: row.get(16)?,
        z_score: row.get(17)?,
        leverage: row.get(18)?,
        position_size: row.get(19)?,
        entry_price: row.get(20)?,
        requested_entry: row.get(21)?,
        slippage: row.get(22)?,
        initial_sl: row.get(23)?,
        initial_tp: row.get(24)?,
        planned_rrr: row.get(25)?,
        dc_range: row.get(26)?,
        stop_loss: row.get(27)?,
        target: row.get(28)?,
        highest_price: row.get(29)?,
        lowest_price: row.get(30)?,
        stop_loss_order_ids: None,
        take_profit_order_ids: None,
        exit_price: row.get(33)?,
        exit_time: row.get(34)?,
        exit_reason,
        fees: row.get(36)?,
        gross_pnl: row.get(37)?,
        net_pnl: row.get(38)?,
        mae: row.get(39)?,
        mfe: row.get(40)?,
        duration_mins: row.get(41)?,
    };

    Ok((trade, stop_loss_order_ids_raw, take_profit_order_ids_raw))
}

impl Database {
    /// Persist a trade at entry. Insert-or-replace by id: an existing row
    /// with the same identifier is fully overwritten, so callers pass the
    /// complete record, not a delta. A failed write leaves any prior row
    /// unchanged; the caller decides whether to retry.
    pub fn record_new_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        let stop_loss_order_ids = encode_order_ids(trade.stop_loss_order_ids.as_ref())?;
        let take_profit_order_ids = encode_order_ids(trade.take_profit_order_ids.as_ref())?;

        let conn = self
            .connect()
            .map_err(|e| StoreError::Write(format!("failed to open connection: {}", e)))?;

        let sql = format!(
            "INSERT OR REPLACE INTO trades ({}) VALUES (\
                ?1, ?2, ?3, ?4, ?5, ?6, \
                ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, \
                ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, \
                ?28, ?29, ?30, ?31, ?32, ?33, \
                ?34, ?35, ?36, ?37, ?38, ?39, \
                ?40, ?41, ?42)",
            TRADE_COLUMNS
        );

        conn.execute(
            &sql,
            params![
                trade.id,
                trade.trade_id_legacy,
                trade.symbol,
                trade.strategy_name,
                trade.status.as_str(),
                trade.side.as_str(),
                trade.signal_time,
                trade.entry_time,
                trade.latency_ms,
                trade.regime,
                trade.adx,
                trade.atr,
                trade.volatility_pct,
                trade.obi_50,
                trade.volume_30m,
                trade.open_interest,
                trade.funding_rate,
                trade.z_score,
                trade.leverage,
                trade.position_size,
                trade.entry_price,
                trade.requested_entry,
                trade.slippage,
                trade.initial_sl,
                trade.initial_tp,
                trade.planned_rrr,
                trade.dc_range,
                trade.stop_loss,
                trade.target,
                trade.highest_price,
                trade.lowest_price,
                stop_loss_order_ids,
                take_profit_order_ids,
                trade.exit_price,
                trade.exit_time,
                trade.exit_reason.map(|r| r.as_str()),
                trade.fees,
                trade.gross_pnl,
                trade.net_pnl,
                trade.mae,
                trade.mfe,
                trade.duration_mins,
            ],
        )
        .map_err(|e| {
            log::error!("failed to record trade {}: {}", trade.id, e);
            StoreError::Write(format!("failed to record trade {}: {}", trade.id, e))
        })?;

        log::debug!("recorded trade {} ({})", trade.id, trade.symbol);
        Ok(())
    }

    /// Update exactly the populated fields of `update` on the row matching
    /// `id`. Returns the number of rows affected; zero means no row
    /// matched (or a closed trade was targeted by a status change) and the
    /// caller must not assume the change was persisted.
    ///
    /// Any status change is constrained to rows still OPEN, which makes
    /// the OPEN -> CLOSED transition one-way at the store edge.
    pub fn update_trade(&self, id: &str, update: &TradeUpdate) -> Result<usize, StoreError> {
        let mut updates: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = update.status {
            updates.push("status = ?");
            values.push(Box::new(status.as_str()));
        }
        if let Some(stop_loss) = update.stop_loss {
            updates.push("stop_loss = ?");
            values.push(Box::new(stop_loss));
        }
        if let Some(target) = update.target {
            updates.push("target = ?");
            values.push(Box::new(target));
        }
        if let Some(highest_price) = update.highest_price {
            updates.push("highest_price = ?");
            values.push(Box::new(highest_price));
        }
        if let Some(lowest_price) = update.lowest_price {
            updates.push("lowest_price = ?");
            values.push(Box::new(lowest_price));
        }
        if let Some(ids) = &update.stop_loss_order_ids {
            updates.push("stop_loss_order_ids = ?");
            values.push(Box::new(encode_order_ids(Some(ids))?));
        }
        if let Some(ids) = &update.take_profit_order_ids {
            updates.push("take_profit_order_ids = ?");
            values.push(Box::new(encode_order_ids(Some(ids))?));
        }
        if let Some(exit_price) = update.exit_price {
            updates.push("exit_price = ?");
            values.push(Box::new(exit_price));
        }
        if let Some(exit_time) = &update.exit_time {
            updates.push("exit_time = ?");
            values.push(Box::new(exit_time.clone()));
        }
        if let Some(exit_reason) = update.exit_reason {
            updates.push("exit_reason = ?");
            values.push(Box::new(exit_reason.as_str()));
        }
        if let Some(fees) = update.fees {
            updates.push("fees = ?");
            values.push(Box::new(fees));
        }
        if let Some(gross_pnl) = update.gross_pnl {
            updates.push("gross_pnl = ?");
            values.push(Box::new(gross_pnl));
        }
        if let Some(net_pnl) = update.net_pnl {
            updates.push("net_pnl = ?");
            values.push(Box::new(net_pnl));
        }
        if let Some(mae) = update.mae {
            updates.push("mae = ?");
            values.push(Box::new(mae));
        }
        if let Some(mfe) = update.mfe {
            updates.push("mfe = ?");
            values.push(Box::new(mfe));
        }
        if let Some(duration_mins) = update.duration_mins {
            updates.push("duration_mins = ?");
            values.push(Box::new(duration_mins));
        }

        if updates.is_empty() {
            log::debug!("empty update for trade {}, nothing to do", id);
            return Ok(0);
        }

        let mut sql = format!("UPDATE trades SET {} WHERE id = ?", updates.join(", "));
        if update.status.is_some() {
            sql.push_str(" AND status = 'OPEN'");
        }
        values.push(Box::new(id.to_string()));

        let conn = self
            .connect()
            .map_err(|e| StoreError::Write(format!("failed to open connection: {}", e)))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let affected = conn.execute(&sql, param_refs.as_slice()).map_err(|e| {
            log::error!("failed to update trade {}: {}", id, e);
            StoreError::Write(format!("failed to update trade {}: {}", id, e))
        })?;

        if affected == 0 {
            log::warn!("update for trade {} matched no rows", id);
        } else {
            log::debug!("updated trade {} ({} fields)", id, updates.len());
        }
        Ok(affected)
    }

    /// Load every OPEN trade, fully reconstructed, to rebuild in-memory
    /// position state after a restart.
    ///
    /// Reconstruction is all-or-nothing: a row that fails to decode fails
    /// the whole call, because a silently dropped open position means the
    /// bot loses track of live risk. Likewise a storage-level failure is a
    /// hard error, never an empty list - "no open trades" is only ever
    /// `Ok(vec![])`.
    pub fn fetch_open_positions(&self) -> Result<Vec<TradeRecord>, StoreError> {
        let conn = self
            .connect()
            .map_err(|e| StoreError::Read(format!("failed to open connection: {}", e)))?;

        let sql = format!(
            "SELECT {} FROM trades WHERE status = 'OPEN'",
            TRADE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(|e| {
            log::error!("failed to prepare open-positions query: {}", e);
            StoreError::Read(format!("failed to prepare open-positions query: {}", e))
        })?;

        let rows = stmt.query_map([], map_row_to_trade).map_err(|e| {
            log::error!("failed to query open positions: {}", e);
            StoreError::Read(format!("failed to query open positions: {}", e))
        })?;

        let mut positions = Vec::new();
        for row in rows {
            let (mut trade, stop_loss_raw, take_profit_raw) = row.map_err(|e| {
                log::error!("failed to read open position row: {}", e);
                StoreError::Read(format!("failed to read open position row: {}", e))
            })?;

            trade.stop_loss_order_ids =
                decode_order_ids(&trade.id, "stop_loss_order_ids", stop_loss_raw)?;
            trade.take_profit_order_ids =
                decode_order_ids(&trade.id, "take_profit_order_ids", take_profit_raw)?;

            positions.push(trade);
        }

        log::info!("restored {} open position(s) from ledger", positions.len());
        Ok(positions)
    }
}
