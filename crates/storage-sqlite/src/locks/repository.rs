use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use creatorhub_core::sync::SyncLockRepositoryTrait;
use creatorhub_core::Result;

use crate::db::{DbPool, WriteHandle};
use crate::schema::sync_locks;
use crate::schema::sync_locks::dsl::*;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::sync_locks)]
struct SyncLockDB {
    lock_key: String,
    acquired_at: NaiveDateTime,
    expires_at: NaiveDateTime,
}

/// The unique constraint on `lock_key` is the whole mutual-exclusion story:
/// whoever inserts first owns the lock until release or TTL expiry.
pub struct SyncLockRepository {
    #[allow(dead_code)]
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncLockRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncLockRepositoryTrait for SyncLockRepository {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let key = key.to_string();
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(600));
        self.writer
            .exec(move |conn| {
                let now = Utc::now();
                // Expired rows are garbage from crashed holders; they must
                // never block a fresh acquisition.
                diesel::delete(sync_locks::table.filter(expires_at.lt(now.naive_utc())))
                    .execute(conn)?;

                let row = SyncLockDB {
                    lock_key: key,
                    acquired_at: now.naive_utc(),
                    expires_at: (now + ttl).naive_utc(),
                };
                match diesel::insert_into(sync_locks::table).values(&row).execute(conn) {
                    Ok(_) => Ok(true),
                    Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                        Ok(false)
                    }
                    Err(other) => Err(other.into()),
                }
            })
            .await
    }

    async fn release(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.writer
            .exec(move |conn| {
                diesel::delete(sync_locks::table.filter(lock_key.eq(&key))).execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.writer
            .exec(move |conn| {
                let deleted =
                    diesel::delete(sync_locks::table.filter(expires_at.lt(now.naive_utc())))
                        .execute(conn)?;
                Ok(deleted)
            })
            .await
    }
}
