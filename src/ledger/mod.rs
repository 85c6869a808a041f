pub(crate) mod ledger_errors;
pub(crate) mod ledger_service;
pub(crate) mod ledger_traits;
pub(crate) mod locks;
pub(crate) mod projector;

pub use ledger_errors::LedgerError;
pub use ledger_service::LedgerService;
pub use ledger_traits::LedgerServiceTrait;
pub use locks::LockRegistry;
pub use projector::PositionProjector;

#[cfg(test)]
pub(crate) mod tests;
