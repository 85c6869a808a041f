use chrono::NaiveDate;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use crate::db::{run_migrations, DbPool};
use crate::errors::Error;
use crate::ledger::{LedgerError, LedgerService, LedgerServiceTrait, LockRegistry};
use crate::positions::{PositionRepository, PositionRepositoryTrait};
use crate::transactions::{
    NewTransaction, TransactionError, TransactionKind, TransactionRepository,
    TransactionRepositoryTrait, TransactionUpdate,
};

fn test_pool() -> Arc<DbPool> {
    // A single connection keeps every call on the same in-memory database.
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = Pool::builder().max_size(1).build(manager).expect("pool");
    run_migrations(&pool).expect("migrations");
    Arc::new(pool)
}

fn service() -> LedgerService {
    let pool = test_pool();
    let transactions: Arc<dyn TransactionRepositoryTrait> =
        Arc::new(TransactionRepository::new(pool.clone()));
    let positions: Arc<dyn PositionRepositoryTrait> =
        Arc::new(PositionRepository::new(pool.clone()));
    LedgerService::new(pool, transactions, positions, Arc::new(LockRegistry::new()))
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn new_transaction(
    id: &str,
    kind: TransactionKind,
    date_str: &str,
    amount: Decimal,
    unit_price: Decimal,
    commission: Decimal,
) -> NewTransaction {
    NewTransaction {
        id: Some(id.to_string()),
        portfolio_id: "PF1".to_string(),
        ticker: "AAPL".to_string(),
        kind,
        amount,
        unit_price,
        currency: "USD".to_string(),
        commission,
        fx_rate_to_base: dec!(1),
        occurred_at: date(date_str),
        comment: None,
    }
}

#[tokio::test]
async fn test_record_buy_creates_position() {
    let service = service();

    let position = service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(5),
        ))
        .await
        .unwrap();

    assert_eq!(position.quantity, dec!(10));
    assert_eq!(position.average_cost, dec!(100.5));
    assert_eq!(position.accumulated_commission, dec!(5));

    let stored = service.get_position("PF1", "AAPL").unwrap().unwrap();
    assert_eq!(stored.quantity, dec!(10));
    assert_eq!(stored.average_cost, dec!(100.5));
}

#[tokio::test]
async fn test_second_buy_reweights_average_cost() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();
    let position = service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Buy,
            "2024-02-10",
            dec!(10),
            dec!(200),
            dec!(0),
        ))
        .await
        .unwrap();

    assert_eq!(position.quantity, dec!(20));
    assert_eq!(position.average_cost, dec!(150));
}

#[tokio::test]
async fn test_oversell_rejected_and_nothing_persisted() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();

    let result = service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Sell,
            "2024-02-10",
            dec!(15),
            dec!(120),
            dec!(0),
        ))
        .await;

    match result {
        Err(Error::Ledger(LedgerError::InsufficientBalance {
            requested,
            available,
            ..
        })) => {
            assert_eq!(requested, dec!(15));
            assert_eq!(available, dec!(10));
        }
        other => panic!("expected InsufficientBalance, got {:?}", other.map(|_| ())),
    }

    // The rejected sell left no trace: position and history are unchanged.
    let position = service.get_position("PF1", "AAPL").unwrap().unwrap();
    assert_eq!(position.quantity, dec!(10));
    assert_eq!(service.get_transactions("PF1").unwrap().len(), 1);
}

#[tokio::test]
async fn test_disposal_without_position_rejected() {
    let service = service();

    let result = service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Sell,
            "2024-01-10",
            dec!(1),
            dec!(100),
            dec!(0),
        ))
        .await;

    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InsufficientBalance { .. }))
    ));
    assert!(service.get_transactions("PF1").unwrap().is_empty());
}

#[tokio::test]
async fn test_non_positive_amount_rejected_before_storage() {
    let service = service();

    let result = service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(0),
            dec!(100),
            dec!(0),
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InvalidAmount(_)))
    ));

    let result = service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(1),
            dec!(100),
            dec!(-2),
        ))
        .await;
    assert!(matches!(
        result,
        Err(Error::Ledger(LedgerError::InvalidAmount(_)))
    ));

    assert!(service.get_transactions("PF1").unwrap().is_empty());
}

#[tokio::test]
async fn test_sell_to_zero_deletes_position_row() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();
    let position = service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Sell,
            "2024-02-10",
            dec!(10),
            dec!(150),
            dec!(0),
        ))
        .await
        .unwrap();

    assert_eq!(position.quantity, Decimal::ZERO);
    assert!(service.get_position("PF1", "AAPL").unwrap().is_none());
    // History keeps both events; only the derived row is gone.
    assert_eq!(service.get_transactions("PF1").unwrap().len(), 2);
}

#[tokio::test]
async fn test_ticker_and_currency_are_normalized() {
    let service = service();

    let mut input = new_transaction(
        "t1",
        TransactionKind::Buy,
        "2024-01-10",
        dec!(5),
        dec!(100),
        dec!(0),
    );
    input.ticker = " aapl ".to_string();
    input.currency = "usd".to_string();

    let position = service.record_transaction(input).await.unwrap();

    assert_eq!(position.ticker, "AAPL");
    assert_eq!(position.currency, "USD");
    assert!(service.get_position("PF1", "aapl").unwrap().is_some());
}

#[tokio::test]
async fn test_update_transaction_replays_full_history() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();
    service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Buy,
            "2024-02-10",
            dec!(10),
            dec!(200),
            dec!(0),
        ))
        .await
        .unwrap();

    let updated = service
        .update_transaction(TransactionUpdate {
            id: "t2".to_string(),
            portfolio_id: "PF1".to_string(),
            ticker: "AAPL".to_string(),
            kind: TransactionKind::Buy,
            amount: dec!(10),
            unit_price: dec!(300),
            currency: "USD".to_string(),
            commission: dec!(0),
            fx_rate_to_base: dec!(1),
            occurred_at: date("2024-02-10"),
            comment: Some("price correction".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(updated.unit_price, dec!(300));

    let position = service.get_position("PF1", "AAPL").unwrap().unwrap();
    assert_eq!(position.quantity, dec!(20));
    // (10*100 + 10*300) / 20
    assert_eq!(position.average_cost, dec!(200));
}

#[tokio::test]
async fn test_update_moving_ticker_rebuilds_both_positions() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();

    service
        .update_transaction(TransactionUpdate {
            id: "t1".to_string(),
            portfolio_id: "PF1".to_string(),
            ticker: "MSFT".to_string(),
            kind: TransactionKind::Buy,
            amount: dec!(10),
            unit_price: dec!(100),
            currency: "USD".to_string(),
            commission: dec!(0),
            fx_rate_to_base: dec!(1),
            occurred_at: date("2024-01-10"),
            comment: None,
        })
        .await
        .unwrap();

    assert!(service.get_position("PF1", "AAPL").unwrap().is_none());
    let moved = service.get_position("PF1", "MSFT").unwrap().unwrap();
    assert_eq!(moved.quantity, dec!(10));
}

#[tokio::test]
async fn test_update_that_oversells_history_rolls_back() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();
    service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Sell,
            "2024-02-10",
            dec!(10),
            dec!(150),
            dec!(0),
        ))
        .await
        .unwrap();

    // Shrinking the buy makes the later sell unsatisfiable on replay.
    let result = service
        .update_transaction(TransactionUpdate {
            id: "t1".to_string(),
            portfolio_id: "PF1".to_string(),
            ticker: "AAPL".to_string(),
            kind: TransactionKind::Buy,
            amount: dec!(4),
            unit_price: dec!(100),
            currency: "USD".to_string(),
            commission: dec!(0),
            fx_rate_to_base: dec!(1),
            occurred_at: date("2024-01-10"),
            comment: None,
        })
        .await;

    assert!(result.is_err());

    // The correction rolled back wholesale; the original buy survives.
    let original = service.get_transaction("t1").unwrap();
    assert_eq!(original.amount, dec!(10));
}

#[tokio::test]
async fn test_delete_transaction_replays_remaining_history() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();
    service
        .record_transaction(new_transaction(
            "t2",
            TransactionKind::Buy,
            "2024-02-10",
            dec!(5),
            dec!(200),
            dec!(0),
        ))
        .await
        .unwrap();

    let deleted = service.delete_transaction("t2").await.unwrap();
    assert_eq!(deleted.id, "t2");

    let position = service.get_position("PF1", "AAPL").unwrap().unwrap();
    assert_eq!(position.quantity, dec!(10));
    assert_eq!(position.average_cost, dec!(100));
}

#[tokio::test]
async fn test_delete_last_transaction_removes_position() {
    let service = service();

    service
        .record_transaction(new_transaction(
            "t1",
            TransactionKind::Buy,
            "2024-01-10",
            dec!(10),
            dec!(100),
            dec!(0),
        ))
        .await
        .unwrap();

    service.delete_transaction("t1").await.unwrap();

    assert!(service.get_position("PF1", "AAPL").unwrap().is_none());
    assert!(service.get_transactions("PF1").unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_converges_with_incremental_state() {
    let service = service();

    for (id, kind, date_str, amount, price) in [
        ("t1", TransactionKind::Buy, "2024-01-10", dec!(10), dec!(100)),
        ("t2", TransactionKind::Buy, "2024-02-10", dec!(6), dec!(150)),
        ("t3", TransactionKind::Sell, "2024-03-10", dec!(4), dec!(180)),
        ("t4", TransactionKind::Buy, "2024-04-10", dec!(2), dec!(90)),
    ] {
        service
            .record_transaction(new_transaction(id, kind, date_str, amount, price, dec!(1)))
            .await
            .unwrap();
    }

    let incremental = service.get_position("PF1", "AAPL").unwrap().unwrap();
    let rebuilt = service.rebuild_position("PF1", "AAPL").await.unwrap().unwrap();

    assert_eq!(rebuilt.quantity, incremental.quantity);
    assert_eq!(rebuilt.average_cost, incremental.average_cost);
    assert_eq!(
        rebuilt.accumulated_commission,
        incremental.accumulated_commission
    );
}

#[tokio::test]
async fn test_rebuild_of_empty_history_clears_position() {
    let service = service();
    let rebuilt = service.rebuild_position("PF1", "AAPL").await.unwrap();
    assert!(rebuilt.is_none());
}

#[tokio::test]
async fn test_unknown_transaction_lookup_is_not_found() {
    let service = service();
    let result = service.get_transaction("missing");
    assert!(matches!(
        result,
        Err(Error::Transaction(TransactionError::NotFound(_)))
    ));
}
