use log::debug;
use std::sync::Arc;

use crate::pnl::lot_matcher::{LotMatcher, RealizedOperation};
use crate::pnl::pnl_traits::PnlServiceTrait;
use crate::transactions::TransactionRepositoryTrait;
use crate::Result;

/// Read-only realized-PnL reporting over committed history.
///
/// Never takes the mutation lock: a report racing a mutation sees either the
/// pre- or post-commit history, never a partial one.
pub struct PnlService {
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    matcher: LotMatcher,
}

impl PnlService {
    pub fn new(transaction_repository: Arc<dyn TransactionRepositoryTrait>) -> Self {
        Self {
            transaction_repository,
            matcher: LotMatcher::new(),
        }
    }
}

impl PnlServiceTrait for PnlService {
    fn compute_realized_pnl(&self, portfolio_id: &str) -> Result<Vec<RealizedOperation>> {
        let history = self
            .transaction_repository
            .get_transactions_by_portfolio(portfolio_id)?;

        debug!(
            "Computing realized PnL for portfolio {} over {} transactions",
            portfolio_id,
            history.len()
        );

        self.matcher.match_realized(&history).map_err(Into::into)
    }

    fn compute_realized_pnl_for_ticker(
        &self,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Vec<RealizedOperation>> {
        let ticker = ticker.trim().to_uppercase();
        let history = self
            .transaction_repository
            .get_transactions_for_ticker(portfolio_id, &ticker)?;

        self.matcher.match_realized(&history).map_err(Into::into)
    }
}
