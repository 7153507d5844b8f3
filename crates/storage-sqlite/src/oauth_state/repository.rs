use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use creatorhub_core::oauth::{PendingState, PendingStateRepositoryTrait};
use creatorhub_core::Result;

use crate::db::{DbPool, WriteHandle};
use crate::schema::oauth_pending_state;
use crate::schema::oauth_pending_state::dsl::*;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::oauth_pending_state)]
struct PendingStateDB {
    state: String,
    code_verifier: String,
    store_id: String,
    expires_at: NaiveDateTime,
}

impl From<PendingStateDB> for PendingState {
    fn from(row: PendingStateDB) -> Self {
        Self {
            state: row.state,
            code_verifier: row.code_verifier,
            store_id: row.store_id,
            expires_at: Utc.from_utc_datetime(&row.expires_at),
        }
    }
}

pub struct PendingStateRepository {
    #[allow(dead_code)]
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PendingStateRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PendingStateRepositoryTrait for PendingStateRepository {
    async fn insert(&self, row: PendingState) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let db_row = PendingStateDB {
                    state: row.state,
                    code_verifier: row.code_verifier,
                    store_id: row.store_id,
                    expires_at: row.expires_at.naive_utc(),
                };
                diesel::insert_into(oauth_pending_state::table)
                    .values(&db_row)
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.writer
            .exec(move |conn| {
                let deleted = diesel::delete(
                    oauth_pending_state::table.filter(expires_at.lt(now.naive_utc())),
                )
                .execute(conn)?;
                Ok(deleted)
            })
            .await
    }

    async fn take(&self, wanted: &str) -> Result<Option<PendingState>> {
        let wanted = wanted.to_string();
        self.writer
            .exec(move |conn| {
                // Select + delete inside the write transaction makes the
                // read destructive: a second take of the same state sees
                // nothing.
                let row = oauth_pending_state::table
                    .filter(state.eq(&wanted))
                    .first::<PendingStateDB>(conn)
                    .optional()?;
                if row.is_some() {
                    diesel::delete(oauth_pending_state::table.filter(state.eq(&wanted)))
                        .execute(conn)?;
                }
                Ok(row.map(PendingState::from))
            })
            .await
    }
}
