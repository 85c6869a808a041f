use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::constants::{GAIN_DECIMAL_PRECISION, REPORT_DECIMAL_PRECISION};
use crate::pnl::pnl_errors::{PnlError, Result};
use crate::positions::is_quantity_significant;
use crate::transactions::{Transaction, TransactionKind};
use crate::utils::decimal_serde::*;

/// An open purchase quantity, consumed oldest-first.
///
/// A lot only ever moves forward: open, partially consumed zero or more
/// times, then closed and dropped from the queue. Closed lots are never
/// reopened.
#[derive(Debug, Clone)]
pub struct Lot {
    pub opened_at: NaiveDate,
    pub open_quantity: Decimal,
    pub initial_quantity: Decimal,
    pub unit_price: Decimal,
    pub currency: String,
    pub fx_rate_to_base: Decimal,
    /// Commission paid on the original acquisition; allocation is re-derived
    /// from this on every partial sale.
    pub commission: Decimal,
    /// Monotone remainder of the commission not yet allocated to a disposal.
    pub remaining_commission: Decimal,
}

/// One (lot, sell) pairing in reporting currency. A single SELL spanning
/// several lots emits one of these per lot consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedOperation {
    pub ticker: String,
    pub sell_date: NaiveDate,
    pub buy_date: NaiveDate,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost_basis_base: Decimal,
    #[serde(with = "decimal_serde")]
    pub proceeds_base: Decimal,
    #[serde(with = "decimal_serde")]
    pub buy_fee_base: Decimal,
    #[serde(with = "decimal_serde")]
    pub sell_fee_base: Decimal,
    #[serde(with = "decimal_serde")]
    pub gain_base: Decimal,
    pub currency: String,
}

/// Replays a portfolio's transaction history into per-ticker FIFO lot queues
/// and emits realized-gain records for every SELL.
///
/// The queues are rebuilt from scratch on every call; nothing is shared
/// across requests.
#[derive(Default, Debug, Clone)]
pub struct LotMatcher {}

impl LotMatcher {
    pub fn new() -> Self {
        LotMatcher {}
    }

    /// Matches realized operations over a portfolio history.
    ///
    /// Input ordering is re-derived internally: (occurred_at, recorded_at, id)
    /// ascending, so callers cannot accidentally replay out of order.
    pub fn match_realized(&self, transactions: &[Transaction]) -> Result<Vec<RealizedOperation>> {
        let (operations, _) = self.replay(transactions)?;
        Ok(operations)
    }

    /// Sum of open-lot quantities for one ticker after replaying the history.
    /// Used by the replay driver's conservation check.
    pub fn open_quantity(&self, transactions: &[Transaction], ticker: &str) -> Result<Decimal> {
        let (_, queues) = self.replay(transactions)?;
        Ok(queues
            .get(ticker)
            .map(|queue| queue.iter().map(|lot| lot.open_quantity).sum())
            .unwrap_or(Decimal::ZERO))
    }

    /// Open lots per ticker after replaying the history.
    pub fn open_lots(&self, transactions: &[Transaction]) -> Result<HashMap<String, Vec<Lot>>> {
        let (_, queues) = self.replay(transactions)?;
        Ok(queues
            .into_iter()
            .map(|(ticker, queue)| (ticker, queue.into_iter().collect()))
            .collect())
    }

    fn replay(
        &self,
        transactions: &[Transaction],
    ) -> Result<(Vec<RealizedOperation>, HashMap<String, VecDeque<Lot>>)> {
        debug!("Replaying {} transactions into lot queues", transactions.len());

        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.recorded_at.cmp(&b.recorded_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut queues: HashMap<String, VecDeque<Lot>> = HashMap::new();
        let mut operations: Vec<RealizedOperation> = Vec::new();

        for transaction in ordered {
            let queue = queues.entry(transaction.ticker.clone()).or_default();

            if transaction.kind.is_acquisition() {
                queue.push_back(Lot {
                    opened_at: transaction.occurred_at,
                    open_quantity: transaction.amount,
                    initial_quantity: transaction.amount,
                    unit_price: transaction.unit_price,
                    currency: transaction.currency.clone(),
                    fx_rate_to_base: transaction.fx_rate_to_base,
                    commission: transaction.commission,
                    remaining_commission: transaction.commission,
                });
                continue;
            }

            let mut remaining = transaction.amount;
            while remaining > Decimal::ZERO {
                let Some(lot) = queue.front_mut() else {
                    return Err(PnlError::Oversold {
                        ticker: transaction.ticker.clone(),
                        deficit: remaining,
                    });
                };

                let matched = remaining.min(lot.open_quantity);
                let closes_lot = !is_quantity_significant(&(lot.open_quantity - matched));

                // Buy-side commission for this chunk: proportional to the lot's
                // original commission, capped by the running remainder. The
                // chunk that closes the lot takes the whole remainder so the
                // allocations sum exactly to the original commission.
                let buy_fee = if closes_lot {
                    lot.remaining_commission
                } else if lot.initial_quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    (matched / lot.initial_quantity * lot.commission)
                        .min(lot.remaining_commission)
                };
                lot.remaining_commission -= buy_fee;
                lot.open_quantity -= matched;

                if transaction.kind == TransactionKind::Sell {
                    let sell_fee = if transaction.amount.is_zero() {
                        Decimal::ZERO
                    } else {
                        matched / transaction.amount * transaction.commission
                    };

                    let cost_basis = matched * lot.unit_price * lot.fx_rate_to_base
                        + buy_fee * lot.fx_rate_to_base;
                    let proceeds = matched * transaction.unit_price * transaction.fx_rate_to_base
                        - sell_fee * transaction.fx_rate_to_base;

                    // Each emitted field is rounded exactly once, from the
                    // full-precision values; the gain is not derived from the
                    // already-rounded cost/proceeds.
                    operations.push(RealizedOperation {
                        ticker: transaction.ticker.clone(),
                        sell_date: transaction.occurred_at,
                        buy_date: lot.opened_at,
                        quantity: matched,
                        cost_basis_base: cost_basis.round_dp(REPORT_DECIMAL_PRECISION),
                        proceeds_base: proceeds.round_dp(REPORT_DECIMAL_PRECISION),
                        buy_fee_base: (buy_fee * lot.fx_rate_to_base)
                            .round_dp(REPORT_DECIMAL_PRECISION),
                        sell_fee_base: (sell_fee * transaction.fx_rate_to_base)
                            .round_dp(REPORT_DECIMAL_PRECISION),
                        gain_base: (proceeds - cost_basis).round_dp(GAIN_DECIMAL_PRECISION),
                        currency: transaction.currency.clone(),
                    });
                }

                if closes_lot {
                    queue.pop_front();
                }
                remaining -= matched;
            }
        }

        Ok((operations, queues))
    }
}
