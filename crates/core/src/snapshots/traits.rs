use async_trait::async_trait;

use super::model::{UserDailySnapshot, VideoDailySnapshot};
use crate::Result;

#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    /// Upsert keyed on (store_id, platform_open_id, snapshot_date).
    async fn upsert_user_daily(&self, row: UserDailySnapshot) -> Result<()>;

    /// Upsert each row keyed on (store_id, video_id, snapshot_date), all
    /// within one transaction. Returns the number of rows written.
    async fn upsert_video_daily(&self, rows: Vec<VideoDailySnapshot>) -> Result<usize>;
}
