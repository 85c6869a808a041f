use super::lot_matcher::RealizedOperation;
use crate::errors::Result;

/// Trait defining the contract for realized-PnL reporting.
pub trait PnlServiceTrait: Send + Sync {
    fn compute_realized_pnl(&self, portfolio_id: &str) -> Result<Vec<RealizedOperation>>;
    fn compute_realized_pnl_for_ticker(
        &self,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Vec<RealizedOperation>>;
}
