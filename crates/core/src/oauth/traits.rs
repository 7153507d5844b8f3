use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::PendingState;
use crate::Result;

#[async_trait]
pub trait PendingStateRepositoryTrait: Send + Sync {
    async fn insert(&self, row: PendingState) -> Result<()>;

    /// Delete rows whose `expires_at` has passed. Returns how many went.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Atomically load and delete the row for `state`.
    ///
    /// A second call with the same state returns `None` — this is what
    /// makes verifier retrieval one-shot.
    async fn take(&self, state: &str) -> Result<Option<PendingState>>;
}
