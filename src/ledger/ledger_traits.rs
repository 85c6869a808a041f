use async_trait::async_trait;

use crate::errors::Result;
use crate::positions::Position;
use crate::transactions::{NewTransaction, Transaction, TransactionUpdate};

/// Trait defining the contract for ledger mutations and reads.
///
/// Mutating operations serialize per (portfolio, ticker) and run their
/// storage writes as one atomic unit.
#[async_trait]
pub trait LedgerServiceTrait: Send + Sync {
    /// Appends a transaction and folds it into the derived position.
    /// Returns the post-mutation position; a position closed by the
    /// transaction is returned with zero quantity after its row is deleted.
    async fn record_transaction(&self, new_transaction: NewTransaction) -> Result<Position>;

    /// Corrects an existing transaction in place, then rebuilds every
    /// affected position from full history.
    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction>;

    /// Removes a transaction, then rebuilds the affected position from the
    /// remaining history. Returns the removed transaction.
    async fn delete_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    /// Rebuilds one position from its full transaction history. `None` means
    /// the replayed history leaves nothing held.
    async fn rebuild_position(&self, portfolio_id: &str, ticker: &str)
        -> Result<Option<Position>>;

    fn get_position(&self, portfolio_id: &str, ticker: &str) -> Result<Option<Position>>;
    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction>;
    fn get_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>>;
}
