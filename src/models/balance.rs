use serde::{Deserialize, Serialize};

/// One point-in-time account balance observation.
///
/// `timestamp` is the primary key, formatted `YYYY-MM-DD HH:MM:SS` in UTC
/// at second resolution; at most one sample per distinct second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSample {
    pub timestamp: String,
    pub balance: f64,
    pub pnl_daily: Option<f64>,
}
