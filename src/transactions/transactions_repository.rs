use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::transactions;
use crate::transactions::transactions_errors::TransactionError;
use crate::transactions::transactions_model::*;
use crate::transactions::transactions_traits::TransactionRepositoryTrait;

/// Repository for reading transaction history from the database.
///
/// Mutations go through the transaction-scoped helpers at the bottom of this
/// file so the coordinator can compose them into one atomic unit.
pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let mut conn = get_connection(&self.pool)?;
        find_transaction_tx(&mut conn, transaction_id)?
            .ok_or_else(|| TransactionError::NotFound(transaction_id.to_string()).into())
    }

    fn get_transactions_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions::table
            .filter(transactions::portfolio_id.eq(portfolio_id))
            .select(TransactionDb::as_select())
            .order((
                transactions::occurred_at.asc(),
                transactions::recorded_at.asc(),
                transactions::id.asc(),
            ))
            .load::<TransactionDb>(&mut conn)?;

        rows.into_iter()
            .map(|row| Transaction::try_from(row).map_err(Into::into))
            .collect()
    }

    fn get_transactions_for_ticker(
        &self,
        portfolio_id: &str,
        ticker: &str,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        load_ticker_history_tx(&mut conn, portfolio_id, ticker)
    }
}

// --- Transaction-scoped row helpers ---
// Plain functions over an explicit connection, composable inside one
// DbTransactionExecutor unit.

pub(crate) fn find_transaction_tx(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> Result<Option<Transaction>> {
    let row = transactions::table
        .find(transaction_id)
        .select(TransactionDb::as_select())
        .first::<TransactionDb>(conn)
        .optional()?;

    row.map(|db| Transaction::try_from(db).map_err(Into::into))
        .transpose()
}

/// Full ordered history for one (portfolio, ticker) key. Ordering is the
/// replay order: occurred_at, then recorded_at, then id as a stable tie-break.
pub(crate) fn load_ticker_history_tx(
    conn: &mut SqliteConnection,
    portfolio_id: &str,
    ticker: &str,
) -> Result<Vec<Transaction>> {
    let rows = transactions::table
        .filter(transactions::portfolio_id.eq(portfolio_id))
        .filter(transactions::ticker.eq(ticker))
        .select(TransactionDb::as_select())
        .order((
            transactions::occurred_at.asc(),
            transactions::recorded_at.asc(),
            transactions::id.asc(),
        ))
        .load::<TransactionDb>(conn)?;

    rows.into_iter()
        .map(|row| Transaction::try_from(row).map_err(Into::into))
        .collect()
}

pub(crate) fn insert_transaction_tx(
    conn: &mut SqliteConnection,
    transaction: &TransactionDb,
) -> Result<Transaction> {
    let inserted = diesel::insert_into(transactions::table)
        .values(transaction)
        .get_result::<TransactionDb>(conn)?;

    Transaction::try_from(inserted).map_err(Into::into)
}

/// Updates a row in place, keeping the original recorded_at so same-day
/// ordering does not shift under a correction.
pub(crate) fn update_transaction_tx(
    conn: &mut SqliteConnection,
    mut transaction: TransactionDb,
) -> Result<Transaction> {
    let existing = transactions::table
        .find(&transaction.id)
        .select(TransactionDb::as_select())
        .first::<TransactionDb>(conn)
        .optional()?
        .ok_or_else(|| TransactionError::NotFound(transaction.id.clone()))?;

    transaction.recorded_at = existing.recorded_at;

    let updated = diesel::update(transactions::table.find(&transaction.id))
        .set(&transaction)
        .get_result::<TransactionDb>(conn)?;

    Transaction::try_from(updated).map_err(Into::into)
}

pub(crate) fn delete_transaction_tx(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> Result<Transaction> {
    let existing = find_transaction_tx(conn, transaction_id)?
        .ok_or_else(|| TransactionError::NotFound(transaction_id.to_string()))?;

    diesel::delete(transactions::table.filter(transactions::id.eq(transaction_id)))
        .execute(conn)?;

    Ok(existing)
}
