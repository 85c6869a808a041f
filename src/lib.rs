pub mod db;

pub mod ledger;
pub mod pnl;
pub mod positions;
pub mod transactions;

pub mod constants;
pub mod errors;
pub mod schema;
pub mod utils;

pub use errors::{Error, Result};
pub use ledger::*;
pub use pnl::*;
pub use positions::*;
pub use transactions::*;
