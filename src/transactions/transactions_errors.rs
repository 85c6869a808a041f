use diesel::result::Error as DieselError;
use thiserror::Error;

/// Custom error type for transaction-record operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<DieselError> for TransactionError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => TransactionError::NotFound("Record not found".to_string()),
            _ => TransactionError::DatabaseError(err.to_string()),
        }
    }
}
