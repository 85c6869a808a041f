use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::positions::positions_model::{Position, PositionDb};
use crate::positions::positions_traits::PositionRepositoryTrait;
use crate::schema::positions;

/// Repository for reading position rows.
///
/// Writes happen only inside the coordinator's atomic unit, through the
/// transaction-scoped helpers below.
pub struct PositionRepository {
    pool: Arc<DbPool>,
}

impl PositionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl PositionRepositoryTrait for PositionRepository {
    fn get_position(&self, portfolio_id: &str, ticker: &str) -> Result<Option<Position>> {
        let mut conn = get_connection(&self.pool)?;
        find_position_tx(&mut conn, portfolio_id, ticker)
    }

    fn get_positions_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .select(PositionDb::as_select())
            .order(positions::ticker.asc())
            .load::<PositionDb>(&mut conn)?;

        rows.into_iter().map(Position::try_from).collect()
    }
}

// --- Transaction-scoped row helpers ---

pub(crate) fn find_position_tx(
    conn: &mut SqliteConnection,
    portfolio_id: &str,
    ticker: &str,
) -> Result<Option<Position>> {
    let row = positions::table
        .filter(positions::portfolio_id.eq(portfolio_id))
        .filter(positions::ticker.eq(ticker))
        .select(PositionDb::as_select())
        .first::<PositionDb>(conn)
        .optional()?;

    row.map(Position::try_from).transpose()
}

pub(crate) fn upsert_position_tx(conn: &mut SqliteConnection, position: &Position) -> Result<()> {
    let db: PositionDb = position.into();

    diesel::insert_into(positions::table)
        .values(&db)
        .on_conflict(positions::id)
        .do_update()
        .set(&db)
        .execute(conn)?;

    Ok(())
}

pub(crate) fn delete_position_tx(
    conn: &mut SqliteConnection,
    portfolio_id: &str,
    ticker: &str,
) -> Result<usize> {
    let deleted = diesel::delete(
        positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .filter(positions::ticker.eq(ticker)),
    )
    .execute(conn)?;

    Ok(deleted)
}
