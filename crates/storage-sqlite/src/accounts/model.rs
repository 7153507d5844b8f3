use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use creatorhub_core::accounts::{AccountStatus, StoreAccount};
use creatorhub_core::Result;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::store_accounts)]
pub struct StoreAccountDB {
    pub store_id: String,
    pub platform_open_id: String,
    pub access_token_ct: String,
    pub refresh_token_ct: String,
    pub access_expires_at: NaiveDateTime,
    pub refresh_expires_at: NaiveDateTime,
    pub scope: String,
    pub status: String,
    pub last_sync_at: Option<NaiveDateTime>,
    pub connected_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StoreAccountDB {
    pub fn into_domain(self) -> Result<StoreAccount> {
        Ok(StoreAccount {
            store_id: self.store_id,
            platform_open_id: self.platform_open_id,
            access_token_ct: self.access_token_ct,
            refresh_token_ct: self.refresh_token_ct,
            access_expires_at: Utc.from_utc_datetime(&self.access_expires_at),
            refresh_expires_at: Utc.from_utc_datetime(&self.refresh_expires_at),
            scope: self.scope,
            status: AccountStatus::from_str(&self.status)?,
            last_sync_at: self.last_sync_at.map(|t| Utc.from_utc_datetime(&t)),
            connected_at: Utc.from_utc_datetime(&self.connected_at),
            updated_at: Utc.from_utc_datetime(&self.updated_at),
        })
    }
}
