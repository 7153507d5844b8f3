use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use creatorhub_core::snapshots::{UserDailySnapshot, VideoDailySnapshot};

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::user_daily_snapshots)]
pub struct UserDailySnapshotDB {
    pub id: String,
    pub store_id: String,
    pub platform_open_id: String,
    pub snapshot_date: NaiveDate,
    pub display_name: String,
    pub avatar_url: String,
    pub follower_count: i32,
    pub following_count: i32,
    pub likes_count: i64,
    pub video_count: i32,
    pub created_at: NaiveDateTime,
}

impl UserDailySnapshotDB {
    pub fn from_domain(row: UserDailySnapshot) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            store_id: row.store_id,
            platform_open_id: row.platform_open_id,
            snapshot_date: row.snapshot_date,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            follower_count: row.follower_count,
            following_count: row.following_count,
            likes_count: row.likes_count,
            video_count: row.video_count,
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn into_domain(self) -> UserDailySnapshot {
        UserDailySnapshot {
            store_id: self.store_id,
            platform_open_id: self.platform_open_id,
            snapshot_date: self.snapshot_date,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            follower_count: self.follower_count,
            following_count: self.following_count,
            likes_count: self.likes_count,
            video_count: self.video_count,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::video_daily_snapshots)]
pub struct VideoDailySnapshotDB {
    pub id: String,
    pub store_id: String,
    pub video_id: String,
    pub snapshot_date: NaiveDate,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub description: String,
    pub cover_url: String,
    pub share_url: String,
    pub video_created_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

impl VideoDailySnapshotDB {
    pub fn from_domain(row: VideoDailySnapshot) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            store_id: row.store_id,
            video_id: row.video_id,
            snapshot_date: row.snapshot_date,
            view_count: row.view_count,
            like_count: row.like_count,
            comment_count: row.comment_count,
            share_count: row.share_count,
            description: row.description,
            cover_url: row.cover_url,
            share_url: row.share_url,
            video_created_at: row.video_created_at.naive_utc(),
            created_at: Utc::now().naive_utc(),
        }
    }

    pub fn into_domain(self) -> VideoDailySnapshot {
        VideoDailySnapshot {
            store_id: self.store_id,
            video_id: self.video_id,
            snapshot_date: self.snapshot_date,
            view_count: self.view_count,
            like_count: self.like_count,
            comment_count: self.comment_count,
            share_count: self.share_count,
            description: self.description,
            cover_url: self.cover_url,
            share_url: self.share_url,
            video_created_at: Utc.from_utc_datetime(&self.video_created_at),
        }
    }
}
