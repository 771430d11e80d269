use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a trade. Transitions are one-way: OPEN -> CLOSED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(TradeStatus::Open),
            "CLOSED" => Some(TradeStatus::Closed),
            _ => None,
        }
    }
}

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "LONG",
            TradeSide::Short => "SHORT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LONG" => Some(TradeSide::Long),
            "SHORT" => Some(TradeSide::Short),
            _ => None,
        }
    }
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopHit,
    TargetHit,
    Manual,
    Liquidation,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopHit => "STOP_HIT",
            ExitReason::TargetHit => "TARGET_HIT",
            ExitReason::Manual => "MANUAL",
            ExitReason::Liquidation => "LIQUIDATION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "STOP_HIT" => Some(ExitReason::StopHit),
            "TARGET_HIT" => Some(ExitReason::TargetHit),
            "MANUAL" => Some(ExitReason::Manual),
            "LIQUIDATION" => Some(ExitReason::Liquidation),
            _ => None,
        }
    }
}

/// One trade's full lifecycle, from signal to close.
///
/// Field names match the `trades` table columns one-to-one; the on-disk
/// schema is restart-compatibility surface, so renaming a field here breaks
/// resumption of previously-open trades.
///
/// The two order-id collections distinguish "never set" (`None`, stored as
/// NULL) from "set to nothing" (`Some(vec![])`, stored as the JSON text
/// `[]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub trade_id_legacy: Option<i64>,
    pub symbol: String,
    pub strategy_name: String,
    pub status: TradeStatus,
    pub side: TradeSide,

    // Entry context, immutable once set
    pub signal_time: Option<String>,
    pub entry_time: Option<String>,
    pub latency_ms: Option<i64>,
    pub regime: Option<String>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub volatility_pct: Option<f64>,
    pub obi_50: Option<f64>,
    pub volume_30m: Option<f64>,
    pub open_interest: Option<f64>,
    pub funding_rate: Option<f64>,
    pub z_score: Option<f64>,

    // Risk and setup snapshot, immutable once set
    pub leverage: Option<i32>,
    pub position_size: Option<f64>,
    pub entry_price: Option<f64>,
    pub requested_entry: Option<f64>,
    pub slippage: Option<f64>,
    pub initial_sl: Option<f64>,
    pub initial_tp: Option<f64>,
    pub planned_rrr: Option<f64>,
    pub dc_range: Option<f64>,

    // Management state, mutable while open
    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub highest_price: Option<f64>,
    pub lowest_price: Option<f64>,
    pub stop_loss_order_ids: Option<Vec<String>>,
    pub take_profit_order_ids: Option<Vec<String>>,

    // Outcome, set once at close
    pub exit_price: Option<f64>,
    pub exit_time: Option<String>,
    pub exit_reason: Option<ExitReason>,
    pub fees: Option<f64>,
    pub gross_pnl: Option<f64>,
    pub net_pnl: Option<f64>,

    // Intra-trade health
    pub mae: Option<f64>,
    pub mfe: Option<f64>,
    pub duration_mins: Option<f64>,
}

impl TradeRecord {
    /// New OPEN record with a generated identifier and every optional
    /// field unset. The strategy fills in entry context and risk fields
    /// before persisting.
    pub fn new(
        symbol: impl Into<String>,
        strategy_name: impl Into<String>,
        side: TradeSide,
    ) -> Self {
        let id = format!(
            "TRADE-{}-{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4()
        );

        TradeRecord {
            id,
            trade_id_legacy: None,
            symbol: symbol.into(),
            strategy_name: strategy_name.into(),
            status: TradeStatus::Open,
            side,
            signal_time: None,
            entry_time: None,
            latency_ms: None,
            regime: None,
            adx: None,
            atr: None,
            volatility_pct: None,
            obi_50: None,
            volume_30m: None,
            open_interest: None,
            funding_rate: None,
            z_score: None,
            leverage: None,
            position_size: None,
            entry_price: None,
            requested_entry: None,
            slippage: None,
            initial_sl: None,
            initial_tp: None,
            planned_rrr: None,
            dc_range: None,
            stop_loss: None,
            target: None,
            highest_price: None,
            lowest_price: None,
            stop_loss_order_ids: None,
            take_profit_order_ids: None,
            exit_price: None,
            exit_time: None,
            exit_reason: None,
            fees: None,
            gross_pnl: None,
            net_pnl: None,
            mae: None,
            mfe: None,
            duration_mins: None,
        }
    }
}

/// Partial update for an existing trade, covering only the columns that
/// are legitimately mutable after entry. `None` fields are left untouched.
///
/// Closing a trade means one update carrying `status: Closed` together
/// with the outcome fields; the store constrains that transition to rows
/// still OPEN. Entry and risk columns are immutable and have no field
/// here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub status: Option<TradeStatus>,

    pub stop_loss: Option<f64>,
    pub target: Option<f64>,
    pub highest_price: Option<f64>,
    pub lowest_price: Option<f64>,
    pub stop_loss_order_ids: Option<Vec<String>>,
    pub take_profit_order_ids: Option<Vec<String>>,

    pub exit_price: Option<f64>,
    pub exit_time: Option<String>,
    pub exit_reason: Option<ExitReason>,
    pub fees: Option<f64>,
    pub gross_pnl: Option<f64>,
    pub net_pnl: Option<f64>,

    pub mae: Option<f64>,
    pub mfe: Option<f64>,
    pub duration_mins: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_strings_round_trip() {
        for status in [TradeStatus::Open, TradeStatus::Closed] {
            assert_eq!(TradeStatus::from_str(status.as_str()), Some(status));
        }
        for side in [TradeSide::Long, TradeSide::Short] {
            assert_eq!(TradeSide::from_str(side.as_str()), Some(side));
        }
        for reason in [
            ExitReason::StopHit,
            ExitReason::TargetHit,
            ExitReason::Manual,
            ExitReason::Liquidation,
        ] {
            assert_eq!(ExitReason::from_str(reason.as_str()), Some(reason));
        }
    }

    #[test]
    fn test_unknown_wire_strings_rejected() {
        assert_eq!(TradeStatus::from_str("open"), None);
        assert_eq!(TradeStatus::from_str("PENDING"), None);
        assert_eq!(TradeSide::from_str("BUY"), None);
        assert_eq!(ExitReason::from_str("stop_hit"), None);
    }

    #[test]
    fn test_new_record_starts_open() {
        let trade = TradeRecord::new("BTCUSDT", "trend_follow", TradeSide::Long);
        assert!(trade.id.starts_with("TRADE-"));
        assert_eq!(trade.status, TradeStatus::Open);
        assert!(trade.stop_loss_order_ids.is_none());
        assert!(trade.exit_price.is_none());
    }
}
