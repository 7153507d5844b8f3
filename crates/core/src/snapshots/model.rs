use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One row per (store, day) with account-level counters.
///
/// Re-running a sync within the same day replaces the counts in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDailySnapshot {
    pub store_id: String,
    pub platform_open_id: String,
    pub snapshot_date: NaiveDate,
    pub display_name: String,
    pub avatar_url: String,
    pub follower_count: i32,
    pub following_count: i32,
    pub likes_count: i64,
    pub video_count: i32,
}

/// One row per (store, video, day).
///
/// Counts are usually monotonic but the platform may correct them downward;
/// the writer does not enforce monotonicity. `video_created_at` is the
/// publication instant of the video itself, not of this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDailySnapshot {
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
    pub video_created_at: DateTime<Utc>,
}
