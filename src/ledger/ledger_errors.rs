use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised by the mutation coordinator and replay driver
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected before any storage access: non-positive quantity, negative
    /// price or commission, non-positive fx rate.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A disposal exceeded the held quantity. The whole atomic unit rolls
    /// back; the transaction is not persisted.
    #[error(
        "Insufficient balance for {ticker} in portfolio {portfolio_id}: requested {requested}, available {available}"
    )]
    InsufficientBalance {
        portfolio_id: String,
        ticker: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// A rebuilt position disagrees with the lot queue it was replayed from.
    /// Data-integrity defect: surfaced, never auto-corrected.
    #[error("Replay divergence for {ticker} in portfolio {portfolio_id}: {details}")]
    ReplayDivergence {
        portfolio_id: String,
        ticker: String,
        details: String,
    },
}
