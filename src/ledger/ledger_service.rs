use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use async_trait::async_trait;

use crate::db::{DbPool, DbTransactionExecutor};
use crate::errors::Result;
use crate::ledger::ledger_errors::LedgerError;
use crate::ledger::ledger_traits::LedgerServiceTrait;
use crate::ledger::locks::LockRegistry;
use crate::ledger::projector::PositionProjector;
use crate::pnl::LotMatcher;
use crate::positions::positions_repository::{
    delete_position_tx, find_position_tx, upsert_position_tx,
};
use crate::positions::{is_quantity_significant, Position, PositionRepositoryTrait};
use crate::transactions::transactions_repository::{
    delete_transaction_tx, insert_transaction_tx, load_ticker_history_tx, update_transaction_tx,
};
use crate::transactions::{
    NewTransaction, Transaction, TransactionDb, TransactionRepositoryTrait, TransactionUpdate,
};

/// Coordinates ledger mutations: validation, per-holding locking, the atomic
/// insert-plus-projection unit, and full-history rebuilds after corrections.
pub struct LedgerService {
    pool: Arc<DbPool>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    position_repository: Arc<dyn PositionRepositoryTrait>,
    locks: Arc<LockRegistry>,
    projector: PositionProjector,
    matcher: LotMatcher,
}

impl LedgerService {
    pub fn new(
        pool: Arc<DbPool>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        position_repository: Arc<dyn PositionRepositoryTrait>,
        locks: Arc<LockRegistry>,
    ) -> Self {
        Self {
            pool,
            transaction_repository,
            position_repository,
            locks,
            projector: PositionProjector::new(),
            matcher: LotMatcher::new(),
        }
    }

    /// Numeric preconditions, checked before any storage access.
    fn check_amounts(
        amount: &Decimal,
        unit_price: &Decimal,
        commission: &Decimal,
        fx_rate_to_base: &Decimal,
    ) -> std::result::Result<(), LedgerError> {
        if *amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if *unit_price < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "unit price cannot be negative, got {}",
                unit_price
            )));
        }
        if *commission < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "commission cannot be negative, got {}",
                commission
            )));
        }
        if *fx_rate_to_base <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "fx rate must be positive, got {}",
                fx_rate_to_base
            )));
        }
        Ok(())
    }

    /// Rebuilds one position row from its full persisted history, inside the
    /// caller's storage transaction.
    ///
    /// The folded quantity is cross-checked against the FIFO lot queue
    /// replayed from the same history; a mismatch fails the whole unit with
    /// a divergence error rather than persisting either answer.
    fn rebuild_position_tx(
        &self,
        conn: &mut SqliteConnection,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Option<Position>> {
        let history = load_ticker_history_tx(conn, portfolio_id, ticker)?;

        let Some(position) = self.projector.project(portfolio_id, ticker, &history) else {
            delete_position_tx(conn, portfolio_id, ticker)?;
            return Ok(None);
        };

        let open_quantity = self
            .matcher
            .open_quantity(&history, ticker)
            .map_err(crate::errors::Error::Pnl)?;
        if is_quantity_significant(&(position.quantity - open_quantity)) {
            return Err(LedgerError::ReplayDivergence {
                portfolio_id: portfolio_id.to_string(),
                ticker: ticker.to_string(),
                details: format!(
                    "projected quantity {} does not match open lot quantity {}",
                    position.quantity, open_quantity
                ),
            }
            .into());
        }

        if position.is_open() {
            upsert_position_tx(conn, &position)?;
            Ok(Some(position))
        } else {
            delete_position_tx(conn, portfolio_id, ticker)?;
            Ok(None)
        }
    }
}

#[async_trait]
impl LedgerServiceTrait for LedgerService {
    async fn record_transaction(&self, new_transaction: NewTransaction) -> Result<Position> {
        new_transaction.validate()?;
        let mut input = new_transaction.normalized();
        Self::check_amounts(
            &input.amount,
            &input.unit_price,
            &input.commission,
            &input.fx_rate_to_base,
        )?;

        if input.id.is_none() {
            input.id = Some(Uuid::new_v4().to_string());
        }

        let portfolio_id = input.portfolio_id.clone();
        let ticker = input.ticker.clone();

        let _guard = self.locks.acquire(&portfolio_id, &ticker).await;

        self.pool.execute(|conn| -> Result<Position> {
            let current = find_position_tx(conn, &portfolio_id, &ticker)?;

            if input.kind.is_disposal() {
                let available = current
                    .as_ref()
                    .map(|position| position.quantity)
                    .unwrap_or(Decimal::ZERO);
                if input.amount > available {
                    return Err(LedgerError::InsufficientBalance {
                        portfolio_id: portfolio_id.clone(),
                        ticker: ticker.clone(),
                        requested: input.amount,
                        available,
                    }
                    .into());
                }
            }

            let db_row: TransactionDb = input.clone().into();
            let transaction = insert_transaction_tx(conn, &db_row)?;

            let mut position = current.unwrap_or_else(|| {
                Position::new(
                    portfolio_id.clone(),
                    ticker.clone(),
                    transaction.currency.clone(),
                    transaction.recorded_at,
                )
            });
            self.projector.apply(&mut position, &transaction);

            if position.is_open() {
                upsert_position_tx(conn, &position)?;
            } else {
                delete_position_tx(conn, &portfolio_id, &ticker)?;
                position.quantity = Decimal::ZERO;
            }

            debug!(
                "Recorded {} {} x {} for {} in portfolio {}",
                transaction.kind.as_str(),
                transaction.amount,
                transaction.ticker,
                transaction.unit_price,
                portfolio_id
            );
            Ok(position)
        })
    }

    async fn update_transaction(&self, update: TransactionUpdate) -> Result<Transaction> {
        update.validate()?;
        let update = update.normalized();
        Self::check_amounts(
            &update.amount,
            &update.unit_price,
            &update.commission,
            &update.fx_rate_to_base,
        )?;

        let existing = self.transaction_repository.get_transaction(&update.id)?;

        // A correction can move the transaction to another holding; both the
        // old and the new key rebuild inside one unit.
        let _guards = self
            .locks
            .acquire_pair(
                (&existing.portfolio_id, &existing.ticker),
                (&update.portfolio_id, &update.ticker),
            )
            .await;

        self.pool.execute(|conn| -> Result<Transaction> {
            let updated = update_transaction_tx(conn, update.clone().into())?;

            self.rebuild_position_tx(conn, &existing.portfolio_id, &existing.ticker)?;
            if existing.portfolio_id != updated.portfolio_id
                || existing.ticker != updated.ticker
            {
                self.rebuild_position_tx(conn, &updated.portfolio_id, &updated.ticker)?;
            }

            debug!("Corrected transaction {}", updated.id);
            Ok(updated)
        })
    }

    async fn delete_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let existing = self.transaction_repository.get_transaction(transaction_id)?;

        let _guard = self
            .locks
            .acquire(&existing.portfolio_id, &existing.ticker)
            .await;

        self.pool.execute(|conn| -> Result<Transaction> {
            let deleted = delete_transaction_tx(conn, transaction_id)?;
            self.rebuild_position_tx(conn, &deleted.portfolio_id, &deleted.ticker)?;

            debug!("Deleted transaction {}", deleted.id);
            Ok(deleted)
        })
    }

    async fn rebuild_position(
        &self,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Option<Position>> {
        let ticker = ticker.trim().to_uppercase();

        let _guard = self.locks.acquire(portfolio_id, &ticker).await;

        self.pool
            .execute(|conn| self.rebuild_position_tx(conn, portfolio_id, &ticker))
    }

    fn get_position(&self, portfolio_id: &str, ticker: &str) -> Result<Option<Position>> {
        let ticker = ticker.trim().to_uppercase();
        self.position_repository.get_position(portfolio_id, &ticker)
    }

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        self.position_repository
            .get_positions_by_portfolio(portfolio_id)
    }

    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.transaction_repository.get_transaction(transaction_id)
    }

    fn get_transactions(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        self.transaction_repository
            .get_transactions_by_portfolio(portfolio_id)
    }
}
