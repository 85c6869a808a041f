use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::QUANTITY_THRESHOLD;
use crate::errors::{Error, ValidationError};
use crate::utils::decimal_serde::*;

/// Quantities under this threshold are round-off dust, not holdings.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold = Decimal::from_str(QUANTITY_THRESHOLD).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Derived state for one (portfolio, ticker) holding.
///
/// A persisted row always has significant quantity; reaching zero deletes the
/// row instead of leaving residual dust behind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub portfolio_id: String,
    pub ticker: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    /// Break-even price per unit: the commission-inclusive weighted average of
    /// all acquisitions still held. Disposals never move it.
    #[serde(with = "decimal_serde")]
    pub average_cost: Decimal,
    #[serde(with = "decimal_serde")]
    pub accumulated_commission: Decimal,
    pub currency: String,
    pub inception_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn new(
        portfolio_id: String,
        ticker: String,
        currency: String,
        date: DateTime<Utc>,
    ) -> Self {
        Position {
            id: format!("POS-{}-{}", ticker, portfolio_id),
            portfolio_id,
            ticker,
            quantity: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            accumulated_commission: Decimal::ZERO,
            currency,
            inception_date: date,
            updated_at: date,
        }
    }

    pub fn is_open(&self) -> bool {
        self.quantity.is_sign_positive() && is_quantity_significant(&self.quantity)
    }
}

/// Database model for positions
#[derive(Queryable, Selectable, Identifiable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionDb {
    pub id: String,
    pub portfolio_id: String,
    pub ticker: String,
    pub quantity: String,
    pub average_cost: String,
    pub accumulated_commission: String,
    pub currency: String,
    pub inception_date: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<PositionDb> for Position {
    type Error = Error;

    fn try_from(db: PositionDb) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: &str| {
            Decimal::from_str(value).map_err(|e| {
                Error::Validation(ValidationError::InvalidInput(format!(
                    "Position {}: invalid {} '{}': {}",
                    db.id, field, value, e
                )))
            })
        };

        Ok(Self {
            quantity: parse("quantity", &db.quantity)?,
            average_cost: parse("average_cost", &db.average_cost)?,
            accumulated_commission: parse("accumulated_commission", &db.accumulated_commission)?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            ticker: db.ticker,
            currency: db.currency,
            inception_date: DateTime::from_naive_utc_and_offset(db.inception_date, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
        })
    }
}

impl From<&Position> for PositionDb {
    fn from(domain: &Position) -> Self {
        Self {
            id: domain.id.clone(),
            portfolio_id: domain.portfolio_id.clone(),
            ticker: domain.ticker.clone(),
            quantity: domain.quantity.to_string(),
            average_cost: domain.average_cost.to_string(),
            accumulated_commission: domain.accumulated_commission.to_string(),
            currency: domain.currency.clone(),
            inception_date: domain.inception_date.naive_utc(),
            updated_at: domain.updated_at.naive_utc(),
        }
    }
}
