pub(crate) mod positions_model;
pub(crate) mod positions_repository;
pub(crate) mod positions_traits;

pub use positions_model::{is_quantity_significant, Position, PositionDb};
pub use positions_repository::PositionRepository;
pub use positions_traits::PositionRepositoryTrait;
