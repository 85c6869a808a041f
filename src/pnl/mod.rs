pub(crate) mod lot_matcher;
pub(crate) mod pnl_errors;
pub(crate) mod pnl_service;
pub(crate) mod pnl_traits;

pub use lot_matcher::{Lot, LotMatcher, RealizedOperation};
pub use pnl_errors::PnlError;
pub use pnl_service::PnlService;
pub use pnl_traits::PnlServiceTrait;
