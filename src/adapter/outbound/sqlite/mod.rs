//! SQLite persistence adapter.
//!
//! [`SqliteStore`] implements every store port on one Diesel connection pool.
//! Each concern lives in its own module.

pub mod database;

mod category;
mod conversation;
mod forecast;
mod group;
mod leaderboard;
mod organization;
mod prediction;

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::DatabaseErrorKind;
use diesel::SqliteConnection;

use crate::error::Result;
use database::connection::DbPool;

/// SQLite-backed implementation of the store ports.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }
}

fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}
