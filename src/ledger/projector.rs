use log::warn;
use rust_decimal::Decimal;

use crate::positions::{is_quantity_significant, Position};
use crate::transactions::Transaction;

/// Folds transactions into position state: quantity plus the
/// commission-inclusive weighted-average cost basis.
///
/// The same fold runs incrementally (one transaction under the mutation
/// lock) and over a full ordered history (replay driver); both paths must
/// land on identical state.
#[derive(Default, Debug, Clone)]
pub struct PositionProjector {}

impl PositionProjector {
    pub fn new() -> Self {
        PositionProjector {}
    }

    /// Folds one committed transaction into the position.
    pub fn apply(&self, position: &mut Position, transaction: &Transaction) {
        if position.currency != transaction.currency {
            warn!(
                "Transaction {} currency ({}) differs from position {} currency ({}); position currency kept",
                transaction.id, transaction.currency, position.id, position.currency
            );
        }

        if transaction.kind.is_acquisition() {
            let total_cost = position.quantity * position.average_cost
                + transaction.amount * transaction.unit_price
                + transaction.commission;
            let new_quantity = position.quantity + transaction.amount;

            position.average_cost = if new_quantity.is_zero() {
                Decimal::ZERO
            } else {
                total_cost / new_quantity
            };
            position.quantity = new_quantity;
            position.accumulated_commission += transaction.commission;
        } else {
            if transaction.amount > position.quantity {
                warn!(
                    "Transaction {} disposes {} of {} but only {} held; clamping at zero",
                    transaction.id, transaction.amount, transaction.ticker, position.quantity
                );
            }
            let new_quantity = (position.quantity - transaction.amount).max(Decimal::ZERO);

            if is_quantity_significant(&new_quantity) {
                // Disposals only reduce quantity; the remaining units keep
                // their historical cost basis.
                position.quantity = new_quantity;
            } else {
                // Closed out. The row is deleted at zero, so the fold resets
                // to the state a fresh row would start from; incremental and
                // replay paths agree on what a later re-entry sees.
                position.quantity = Decimal::ZERO;
                position.average_cost = Decimal::ZERO;
                position.accumulated_commission = Decimal::ZERO;
            }
        }

        position.updated_at = transaction.recorded_at;
    }

    /// Pure fold over a ticker history from empty state. Returns `None` for
    /// an empty history. Ordering is re-derived internally: (occurred_at,
    /// recorded_at, id) ascending.
    pub fn project(
        &self,
        portfolio_id: &str,
        ticker: &str,
        transactions: &[Transaction],
    ) -> Option<Position> {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.recorded_at.cmp(&b.recorded_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let first = ordered.first()?;
        let mut position = Position::new(
            portfolio_id.to_string(),
            ticker.to_string(),
            first.currency.clone(),
            first.recorded_at,
        );

        for transaction in ordered {
            self.apply(&mut position, transaction);
        }

        Some(position)
    }
}
