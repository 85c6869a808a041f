use super::positions_model::Position;
use crate::errors::Result;

/// Trait defining the contract for position snapshot reads.
pub trait PositionRepositoryTrait: Send + Sync {
    fn get_position(&self, portfolio_id: &str, ticker: &str) -> Result<Option<Position>>;
    fn get_positions_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Position>>;
}
