use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account-level counters from the user info endpoint.
///
/// Every field may be absent when the platform degrades a response;
/// numbers default to 0 and strings to "".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub union_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub follower_count: i32,
    #[serde(default)]
    pub following_count: i32,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub video_count: i32,
}

/// Per-video counters and metadata from the video list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStats {
    #[serde(default)]
    pub id: String,
    /// Seconds since epoch; the platform omits it for drafts.
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub cover_image_url: String,
    #[serde(default)]
    pub share_url: String,
    #[serde(default)]
    pub video_description: String,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub share_count: i64,
}

impl VideoStats {
    /// The video's publication instant.
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.create_time, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// One page of the cursor-based video listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoPage {
    #[serde(default)]
    pub videos: Vec<VideoStats>,
    #[serde(default)]
    pub cursor: i64,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_time_converts_to_utc_instant() {
        let video = VideoStats {
            create_time: 1_700_000_000,
            ..Default::default()
        };
        assert_eq!(video.created_at().timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_create_time_maps_to_epoch() {
        let video: VideoStats = serde_json::from_str(r#"{"id":"v9"}"#).unwrap();
        assert_eq!(video.created_at(), DateTime::<Utc>::UNIX_EPOCH);
    }
}
