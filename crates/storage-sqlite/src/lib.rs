//! SQLite persistence for the CreatorHub engine.
//!
//! Implements the repository traits from `creatorhub-core` with diesel on
//! an r2d2 pool. Reads run directly against the pool; every mutation goes
//! through the [`db::WriteHandle`], which serializes writes onto blocking
//! threads inside an immediate transaction.

pub mod accounts;
pub mod db;
pub mod errors;
pub mod locks;
pub mod oauth_state;
pub mod schema;
pub mod snapshots;
pub mod sync_logs;

use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use creatorhub_core::errors::DatabaseError;
use creatorhub_core::Result;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Apply any pending embedded migrations.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::Internal(format!("migrations failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::db::{create_pool, DbPool, WriteHandle};

    /// A single-connection in-memory database with migrations applied.
    /// `max_size = 1` keeps every caller on the same `:memory:` handle.
    pub fn memory_db() -> (Arc<DbPool>, WriteHandle) {
        let pool = create_pool(":memory:", 1, 1).expect("in-memory pool");
        {
            let mut conn = pool.get().expect("connection");
            super::run_migrations(&mut conn).expect("migrations");
        }
        let writer = WriteHandle::new(Arc::clone(&pool));
        (pool, writer)
    }
}
