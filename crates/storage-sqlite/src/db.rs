//! Pool construction and the serialized write handle.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use creatorhub_core::errors::DatabaseError;
use creatorhub_core::Result;

use crate::errors::StorageError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn create_pool(database_url: &str, max_size: u32, min_idle: u32) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .min_idle(Some(min_idle.min(max_size).max(1)))
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| DatabaseError::Pool(e.to_string()))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| DatabaseError::Pool(e.to_string()).into())
}

/// Runs mutation closures on blocking threads, each inside an immediate
/// transaction. SQLite allows one writer at a time; taking the write lock
/// up front keeps rollbacks from surfacing as SQLITE_BUSY mid-transaction.
#[derive(Clone)]
pub struct WriteHandle {
    pool: Arc<DbPool>,
}

impl WriteHandle {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub async fn exec<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        let joined = tokio::task::spawn_blocking(move || -> std::result::Result<T, StorageError> {
            let mut conn = pool.get().map_err(|e| StorageError::Pool(e.to_string()))?;
            conn.immediate_transaction(|conn| f(conn))
        })
        .await;

        match joined {
            Ok(inner) => inner.map_err(Into::into),
            Err(e) => Err(StorageError::Runtime(format!("write task aborted: {}", e)).into()),
        }
    }
}
