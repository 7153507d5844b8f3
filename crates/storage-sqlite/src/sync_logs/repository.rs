use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use creatorhub_core::sync::{SyncLogEntry, SyncLogRepositoryTrait, SyncLogStatus};
use creatorhub_core::Result;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_logs;

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::sync_logs)]
struct SyncLogEntryDB {
    id: String,
    store_id: Option<String>,
    job_name: String,
    status: String,
    message: Option<String>,
    error_details: Option<String>,
    duration_ms: Option<i64>,
    started_at: NaiveDateTime,
    completed_at: Option<NaiveDateTime>,
}

impl SyncLogEntryDB {
    fn from_domain(entry: SyncLogEntry) -> Self {
        Self {
            id: entry.id,
            store_id: entry.store_id,
            job_name: entry.job_name,
            status: entry.status.as_str().to_string(),
            message: entry.message,
            error_details: entry.error_details,
            duration_ms: entry.duration_ms,
            started_at: entry.started_at.naive_utc(),
            completed_at: entry.completed_at.map(|t| t.naive_utc()),
        }
    }

    fn into_domain(self) -> Result<SyncLogEntry> {
        Ok(SyncLogEntry {
            id: self.id,
            store_id: self.store_id,
            job_name: self.job_name,
            status: SyncLogStatus::from_str(&self.status)?,
            message: self.message,
            error_details: self.error_details,
            duration_ms: self.duration_ms,
            started_at: Utc.from_utc_datetime(&self.started_at),
            completed_at: self.completed_at.map(|t| Utc.from_utc_datetime(&t)),
        })
    }
}

pub struct SyncLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncLogRepositoryTrait for SyncLogRepository {
    async fn append(&self, entry: SyncLogEntry) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::insert_into(sync_logs::table)
                    .values(&SyncLogEntryDB::from_domain(entry))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    async fn finish(
        &self,
        entry_id: &str,
        status: SyncLogStatus,
        message: Option<String>,
        error_details: Option<String>,
        duration_ms: i64,
    ) -> Result<()> {
        let entry_id = entry_id.to_string();
        self.writer
            .exec(move |conn| {
                diesel::update(sync_logs::table.filter(sync_logs::id.eq(&entry_id)))
                    .set((
                        sync_logs::status.eq(status.as_str()),
                        sync_logs::message.eq(message),
                        sync_logs::error_details.eq(error_details),
                        sync_logs::duration_ms.eq(Some(duration_ms)),
                        sync_logs::completed_at.eq(Some(Utc::now().naive_utc())),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    fn list_recent(&self, store: Option<&str>, limit: i64) -> Result<Vec<SyncLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = sync_logs::table.into_boxed();
        if let Some(store) = store {
            query = query.filter(sync_logs::store_id.eq(store.to_string()));
        }
        let rows = query
            .order(sync_logs::started_at.desc())
            .limit(limit.clamp(1, 500))
            .load::<SyncLogEntryDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(SyncLogEntryDB::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;

    fn repo() -> SyncLogRepository {
        let (pool, writer) = memory_db();
        SyncLogRepository::new(pool, writer)
    }

    #[tokio::test]
    async fn append_then_finish_sets_terminal_fields() {
        let repo = repo();
        let entry = SyncLogEntry::begin("user_daily", None);
        let id = entry.id.clone();
        repo.append(entry).await.unwrap();

        repo.finish(
            &id,
            SyncLogStatus::Success,
            Some("processed=3".to_string()),
            None,
            1234,
        )
        .await
        .unwrap();

        let rows = repo.list_recent(None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, SyncLogStatus::Success);
        assert_eq!(rows[0].duration_ms, Some(1234));
        assert!(rows[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn list_recent_filters_by_store_and_orders_desc() {
        let repo = repo();
        let mut first = SyncLogEntry::begin("user_daily", Some("store_A".to_string()));
        first.started_at = Utc::now() - chrono::Duration::minutes(5);
        repo.append(first).await.unwrap();
        repo.append(SyncLogEntry::begin("user_daily", Some("store_B".to_string())))
            .await
            .unwrap();
        repo.append(SyncLogEntry::begin("user_daily", Some("store_A".to_string())))
            .await
            .unwrap();

        let store_a = repo.list_recent(Some("store_A"), 50).unwrap();
        assert_eq!(store_a.len(), 2);
        assert!(store_a[0].started_at >= store_a[1].started_at);

        let all = repo.list_recent(None, 2).unwrap();
        assert_eq!(all.len(), 2);
    }
}
