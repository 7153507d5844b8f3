use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use creatorhub_core::accounts::{
    AccountStatus, NewStoreAccount, StoreAccount, StoreAccountRepositoryTrait, TokenRotation,
};
use creatorhub_core::Result;

use super::model::StoreAccountDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::store_accounts;
use crate::schema::store_accounts::dsl::*;

pub struct StoreAccountRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl StoreAccountRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl StoreAccountRepositoryTrait for StoreAccountRepository {
    fn find_by_store_id(&self, id: &str) -> Result<Option<StoreAccount>> {
        let mut conn = get_connection(&self.pool)?;
        let row = store_accounts::table
            .filter(store_id.eq(id))
            .first::<StoreAccountDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(StoreAccountDB::into_domain).transpose()
    }

    fn list_all(&self) -> Result<Vec<StoreAccount>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = store_accounts::table
            .order(store_id.asc())
            .load::<StoreAccountDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StoreAccountDB::into_domain).collect()
    }

    fn list_by_status(&self, wanted: AccountStatus) -> Result<Vec<StoreAccount>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = store_accounts::table
            .filter(status.eq(wanted.as_str()))
            .order(store_id.asc())
            .load::<StoreAccountDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StoreAccountDB::into_domain).collect()
    }

    fn list_refresh_candidates(&self, horizon: DateTime<Utc>) -> Result<Vec<StoreAccount>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = store_accounts::table
            .filter(status.eq(AccountStatus::Connected.as_str()))
            .filter(access_expires_at.lt(horizon.naive_utc()))
            .order(store_id.asc())
            .load::<StoreAccountDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(StoreAccountDB::into_domain).collect()
    }

    async fn upsert_connected(&self, account: NewStoreAccount) -> Result<StoreAccount> {
        self.writer
            .exec(move |conn| {
                let now = Utc::now().naive_utc();
                let row = StoreAccountDB {
                    store_id: account.store_id,
                    platform_open_id: account.platform_open_id,
                    access_token_ct: account.access_token_ct,
                    refresh_token_ct: account.refresh_token_ct,
                    access_expires_at: account.access_expires_at.naive_utc(),
                    refresh_expires_at: account.refresh_expires_at.naive_utc(),
                    scope: account.scope,
                    status: AccountStatus::Connected.as_str().to_string(),
                    last_sync_at: None,
                    connected_at: now,
                    updated_at: now,
                };
                // On re-connect the original connected_at and last_sync_at
                // survive; everything token-related is replaced.
                let saved = diesel::insert_into(store_accounts::table)
                    .values(&row)
                    .on_conflict(store_id)
                    .do_update()
                    .set((
                        platform_open_id.eq(&row.platform_open_id),
                        access_token_ct.eq(&row.access_token_ct),
                        refresh_token_ct.eq(&row.refresh_token_ct),
                        access_expires_at.eq(row.access_expires_at),
                        refresh_expires_at.eq(row.refresh_expires_at),
                        scope.eq(&row.scope),
                        status.eq(AccountStatus::Connected.as_str()),
                        updated_at.eq(now),
                    ))
                    .returning(StoreAccountDB::as_returning())
                    .get_result::<StoreAccountDB>(conn)?;
                Ok(saved)
            })
            .await?
            .into_domain()
    }

    async fn rotate_tokens(&self, id: &str, rotation: TokenRotation) -> Result<()> {
        let id = id.to_string();
        self.writer
            .exec(move |conn| {
                let now = Utc::now().naive_utc();
                diesel::update(store_accounts::table.filter(store_id.eq(&id)))
                    .set((
                        access_token_ct.eq(&rotation.access_token_ct),
                        refresh_token_ct.eq(&rotation.refresh_token_ct),
                        access_expires_at.eq(rotation.access_expires_at.naive_utc()),
                        refresh_expires_at.eq(rotation.refresh_expires_at.naive_utc()),
                        updated_at.eq(now),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn set_status(&self, id: &str, new_status: AccountStatus) -> Result<()> {
        let id = id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(store_accounts::table.filter(store_id.eq(&id)))
                    .set((
                        status.eq(new_status.as_str()),
                        updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn mark_synced(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let id = id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(store_accounts::table.filter(store_id.eq(&id)))
                    .set((
                        last_sync_at.eq(Some(at.naive_utc())),
                        updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }
}
