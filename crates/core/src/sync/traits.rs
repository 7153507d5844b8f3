use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{SyncLogEntry, SyncLogStatus};
use crate::Result;

#[async_trait]
pub trait SyncLogRepositoryTrait: Send + Sync {
    /// Append a new entry (normally with status RUNNING).
    async fn append(&self, entry: SyncLogEntry) -> Result<()>;

    /// Move an entry to a terminal status. The repository stamps
    /// `completed_at = now`; callers pass the measured duration.
    async fn finish(
        &self,
        id: &str,
        status: SyncLogStatus,
        message: Option<String>,
        error_details: Option<String>,
        duration_ms: i64,
    ) -> Result<()>;

    /// Recent entries ordered by `started_at` descending, optionally
    /// filtered to one store.
    fn list_recent(&self, store_id: Option<&str>, limit: i64) -> Result<Vec<SyncLogEntry>>;
}

/// Durable per-key mutual exclusion.
///
/// `acquire` returns `false` when a live row already holds the key — the
/// only signal callers get; there is no waiter queue and no renewal.
/// Crashed holders are cleaned up by TTL expiry.
#[async_trait]
pub trait SyncLockRepositoryTrait: Send + Sync {
    /// Sweep expired rows, then try to insert `(key, now, now + ttl)`.
    /// Unique violation → `false`; any other non-insert outcome is an error.
    async fn acquire(&self, lock_key: &str, ttl: Duration) -> Result<bool>;

    /// Delete the row for `lock_key`. A no-op when not held.
    async fn release(&self, lock_key: &str) -> Result<()>;

    /// Drop every row with `expires_at < now`. Returns how many went.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
