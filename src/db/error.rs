use thiserror::Error;

/// Errors surfaced by the ledger store.
///
/// `SchemaInit` is fatal by contract: every other operation depends on the
/// schema, so callers abort startup on it. The remaining kinds are
/// per-operation failures that are logged at the operation boundary and
/// returned to the caller; the store never retries and never panics.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("schema initialization failed: {0}")]
    SchemaInit(String),

    #[error("storage write failed: {0}")]
    Write(String),

    #[error("storage read failed: {0}")]
    Read(String),

    /// Malformed order-id text on read. Distinct from "no orders" (NULL):
    /// a row that fails to decode fails the whole fetch rather than being
    /// silently coerced to an empty collection.
    #[error("corrupt {column} for trade {trade_id}: {reason}")]
    Serialization {
        trade_id: String,
        column: &'static str,
        reason: String,
    },
}
