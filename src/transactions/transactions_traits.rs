use super::transactions_model::Transaction;
use crate::errors::Result;

/// Trait defining the contract for transaction history reads.
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction>;
    fn get_transactions_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;
    fn get_transactions_for_ticker(
        &self,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Vec<Transaction>>;
}
