use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;

use creatorhub_core::snapshots::{
    SnapshotRepositoryTrait, UserDailySnapshot, VideoDailySnapshot,
};
use creatorhub_core::Result;

use super::model::{UserDailySnapshotDB, VideoDailySnapshotDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{user_daily_snapshots, video_daily_snapshots};

pub struct SnapshotRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SnapshotRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub fn get_user_daily(
        &self,
        store: &str,
        date: chrono::NaiveDate,
    ) -> Result<Option<UserDailySnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let row = user_daily_snapshots::table
            .filter(user_daily_snapshots::store_id.eq(store))
            .filter(user_daily_snapshots::snapshot_date.eq(date))
            .first::<UserDailySnapshotDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(UserDailySnapshotDB::into_domain))
    }

    pub fn list_video_daily(
        &self,
        store: &str,
        date: chrono::NaiveDate,
    ) -> Result<Vec<VideoDailySnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = video_daily_snapshots::table
            .filter(video_daily_snapshots::store_id.eq(store))
            .filter(video_daily_snapshots::snapshot_date.eq(date))
            .order(video_daily_snapshots::video_id.asc())
            .load::<VideoDailySnapshotDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(VideoDailySnapshotDB::into_domain).collect())
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for SnapshotRepository {
    async fn upsert_user_daily(&self, row: UserDailySnapshot) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let db_row = UserDailySnapshotDB::from_domain(row);
                diesel::insert_into(user_daily_snapshots::table)
                    .values(&db_row)
                    .on_conflict((
                        user_daily_snapshots::store_id,
                        user_daily_snapshots::snapshot_date,
                    ))
                    .do_update()
                    .set((
                        user_daily_snapshots::platform_open_id.eq(&db_row.platform_open_id),
                        user_daily_snapshots::display_name.eq(&db_row.display_name),
                        user_daily_snapshots::avatar_url.eq(&db_row.avatar_url),
                        user_daily_snapshots::follower_count.eq(db_row.follower_count),
                        user_daily_snapshots::following_count.eq(db_row.following_count),
                        user_daily_snapshots::likes_count.eq(db_row.likes_count),
                        user_daily_snapshots::video_count.eq(db_row.video_count),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .await
    }

    /// All rows for one store run land in a single transaction; each row is
    /// self-keyed so ordering within the batch is irrelevant.
    async fn upsert_video_daily(&self, rows: Vec<VideoDailySnapshot>) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        self.writer
            .exec(move |conn| {
                let mut written = 0usize;
                for row in rows {
                    let db_row = VideoDailySnapshotDB::from_domain(row);
                    written += diesel::insert_into(video_daily_snapshots::table)
                        .values(&db_row)
                        .on_conflict((
                            video_daily_snapshots::store_id,
                            video_daily_snapshots::video_id,
                            video_daily_snapshots::snapshot_date,
                        ))
                        .do_update()
                        .set((
                            video_daily_snapshots::view_count.eq(db_row.view_count),
                            video_daily_snapshots::like_count.eq(db_row.like_count),
                            video_daily_snapshots::comment_count.eq(db_row.comment_count),
                            video_daily_snapshots::share_count.eq(db_row.share_count),
                            video_daily_snapshots::description.eq(&db_row.description),
                            video_daily_snapshots::cover_url.eq(&db_row.cover_url),
                            video_daily_snapshots::share_url.eq(&db_row.share_url),
                            video_daily_snapshots::video_created_at.eq(db_row.video_created_at),
                        ))
                        .execute(conn)?;
                }
                Ok(written)
            })
            .await
    }
}
