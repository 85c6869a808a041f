use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PnlError>;

/// Errors surfaced by the FIFO lot matcher
#[derive(Debug, Error)]
pub enum PnlError {
    /// A disposal exhausted the lot queue with quantity still unmatched. The
    /// history is corrupt (oversold ticker) and must not be reported on.
    #[error("Oversold ticker {ticker}: {deficit} units disposed without a matching lot")]
    Oversold { ticker: String, deficit: Decimal },
}
