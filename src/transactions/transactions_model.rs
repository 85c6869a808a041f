use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::transactions::transactions_constants::*;
use crate::transactions::transactions_errors::TransactionError;
use crate::utils::decimal_serde::*;

/// Closed set of ledger event kinds. Anything else is rejected at parse time
/// instead of being coerced downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => TRANSACTION_KIND_BUY,
            TransactionKind::Sell => TRANSACTION_KIND_SELL,
            TransactionKind::Deposit => TRANSACTION_KIND_DEPOSIT,
            TransactionKind::Withdrawal => TRANSACTION_KIND_WITHDRAWAL,
        }
    }

    /// Kinds that open or add to a holding
    pub fn is_acquisition(&self) -> bool {
        matches!(self, TransactionKind::Buy | TransactionKind::Deposit)
    }

    /// Kinds that reduce a holding
    pub fn is_disposal(&self) -> bool {
        matches!(self, TransactionKind::Sell | TransactionKind::Withdrawal)
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s == TRANSACTION_KIND_BUY => Ok(TransactionKind::Buy),
            s if s == TRANSACTION_KIND_SELL => Ok(TransactionKind::Sell),
            s if s == TRANSACTION_KIND_DEPOSIT => Ok(TransactionKind::Deposit),
            s if s == TRANSACTION_KIND_WITHDRAWAL => Ok(TransactionKind::Withdrawal),
            _ => Err(format!("Unknown transaction kind: {}", s)),
        }
    }
}

/// Domain model representing one immutable ledger event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub portfolio_id: String,
    pub ticker: String,
    pub kind: TransactionKind,
    #[serde(with = "decimal_serde")]
    pub amount: Decimal,
    #[serde(with = "decimal_serde")]
    pub unit_price: Decimal,
    pub currency: String,
    #[serde(with = "decimal_serde")]
    pub commission: Decimal,
    /// Rate to the reporting currency captured at transaction time, never
    /// re-resolved afterwards.
    #[serde(with = "decimal_serde")]
    pub fx_rate_to_base: Decimal,
    pub occurred_at: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Database model for transactions
#[derive(
    Queryable, Selectable, Identifiable, Insertable, AsChangeset, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TransactionDb {
    pub id: String,
    pub portfolio_id: String,
    pub ticker: String,
    pub kind: String,
    pub amount: String,
    pub unit_price: String,
    pub currency: String,
    pub commission: String,
    pub fx_rate_to_base: String,
    pub occurred_at: NaiveDate,
    pub recorded_at: NaiveDateTime,
    pub comment: Option<String>,
}

/// Input model for recording a new transaction
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub id: Option<String>,
    pub portfolio_id: String,
    pub ticker: String,
    pub kind: TransactionKind,
    #[serde(with = "decimal_serde")]
    pub amount: Decimal,
    #[serde(with = "decimal_serde")]
    pub unit_price: Decimal,
    pub currency: String,
    #[serde(with = "decimal_serde")]
    pub commission: Decimal,
    #[serde(with = "decimal_serde")]
    pub fx_rate_to_base: Decimal,
    pub occurred_at: NaiveDate,
    pub comment: Option<String>,
}

impl NewTransaction {
    /// Validates the structural fields of the input; numeric preconditions are
    /// checked by the mutation coordinator before storage is touched.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.portfolio_id.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Portfolio ID cannot be empty".to_string(),
            ));
        }
        if self.ticker.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Ticker cannot be empty".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Currency cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the input with ticker and currency trimmed and upper-cased.
    pub fn normalized(mut self) -> Self {
        self.ticker = self.ticker.trim().to_uppercase();
        self.currency = self.currency.trim().to_uppercase();
        self
    }
}

/// Input model for correcting an existing transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub id: String,
    pub portfolio_id: String,
    pub ticker: String,
    pub kind: TransactionKind,
    #[serde(with = "decimal_serde")]
    pub amount: Decimal,
    #[serde(with = "decimal_serde")]
    pub unit_price: Decimal,
    pub currency: String,
    #[serde(with = "decimal_serde")]
    pub commission: Decimal,
    #[serde(with = "decimal_serde")]
    pub fx_rate_to_base: Decimal,
    pub occurred_at: NaiveDate,
    pub comment: Option<String>,
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.id.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Transaction ID is required for updates".to_string(),
            ));
        }
        if self.portfolio_id.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Portfolio ID cannot be empty".to_string(),
            ));
        }
        if self.ticker.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Ticker cannot be empty".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(TransactionError::InvalidData(
                "Currency cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn normalized(mut self) -> Self {
        self.ticker = self.ticker.trim().to_uppercase();
        self.currency = self.currency.trim().to_uppercase();
        self
    }
}

// Conversion implementations
impl TryFrom<TransactionDb> for Transaction {
    type Error = TransactionError;

    fn try_from(db: TransactionDb) -> Result<Self, Self::Error> {
        let kind = TransactionKind::from_str(&db.kind).map_err(TransactionError::InvalidData)?;

        let parse = |field: &str, value: &str| {
            Decimal::from_str(value).map_err(|e| {
                TransactionError::InvalidData(format!(
                    "Transaction {}: invalid {} '{}': {}",
                    db.id, field, value, e
                ))
            })
        };

        Ok(Self {
            kind,
            amount: parse("amount", &db.amount)?,
            unit_price: parse("unit_price", &db.unit_price)?,
            commission: parse("commission", &db.commission)?,
            fx_rate_to_base: parse("fx_rate_to_base", &db.fx_rate_to_base)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            ticker: db.ticker,
            currency: db.currency,
            occurred_at: db.occurred_at,
            recorded_at: DateTime::from_naive_utc_and_offset(db.recorded_at, Utc),
            comment: db.comment,
        })
    }
}

impl From<NewTransaction> for TransactionDb {
    fn from(domain: NewTransaction) -> Self {
        Self {
            id: domain.id.unwrap_or_default(),
            portfolio_id: domain.portfolio_id,
            ticker: domain.ticker,
            kind: domain.kind.as_str().to_string(),
            amount: domain.amount.to_string(),
            unit_price: domain.unit_price.to_string(),
            currency: domain.currency,
            commission: domain.commission.to_string(),
            fx_rate_to_base: domain.fx_rate_to_base.to_string(),
            occurred_at: domain.occurred_at,
            recorded_at: Utc::now().naive_utc(),
            comment: domain.comment,
        }
    }
}

impl From<TransactionUpdate> for TransactionDb {
    fn from(domain: TransactionUpdate) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            ticker: domain.ticker,
            kind: domain.kind.as_str().to_string(),
            amount: domain.amount.to_string(),
            unit_price: domain.unit_price.to_string(),
            currency: domain.currency,
            commission: domain.commission.to_string(),
            fx_rate_to_base: domain.fx_rate_to_base.to_string(),
            occurred_at: domain.occurred_at,
            // Preserved from the existing row by the repository; recorded_at is
            // the same-day ordering tie-break and must not move on correction.
            recorded_at: Utc::now().naive_utc(),
            comment: domain.comment,
        }
    }
}
