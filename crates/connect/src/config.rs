//! Platform connection settings shared by the OAuth and API clients.

use std::time::Duration;

/// Credentials, endpoints and field allow-lists for the video platform.
///
/// Defaults target the platform's v2 open API; deployments override the
/// bases for sandbox tenants.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub client_key: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Base for the user-facing authorization page.
    pub auth_base_url: String,
    /// Base for server-to-server API calls (token, user info, video list).
    pub api_base_url: String,
    /// Requested OAuth scopes, comma-joined into the authorize URL.
    pub scopes: Vec<String>,
    /// `fields` allow-list for user info requests.
    pub user_fields: Vec<String>,
    /// `fields` allow-list for video list requests.
    pub video_fields: Vec<String>,
    pub request_timeout: Duration,
}

impl PlatformConfig {
    pub fn new(client_key: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_key,
            client_secret,
            redirect_uri,
            auth_base_url: "https://www.tiktok.com".to_string(),
            api_base_url: "https://open.tiktokapis.com".to_string(),
            scopes: vec![
                "user.info.basic".to_string(),
                "user.info.stats".to_string(),
                "video.list".to_string(),
            ],
            user_fields: vec![
                "open_id".to_string(),
                "union_id".to_string(),
                "avatar_url".to_string(),
                "display_name".to_string(),
                "follower_count".to_string(),
                "following_count".to_string(),
                "likes_count".to_string(),
                "video_count".to_string(),
            ],
            video_fields: vec![
                "id".to_string(),
                "create_time".to_string(),
                "cover_image_url".to_string(),
                "share_url".to_string(),
                "video_description".to_string(),
                "view_count".to_string(),
                "like_count".to_string(),
                "comment_count".to_string(),
                "share_count".to_string(),
            ],
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_bases(mut self, auth_base_url: String, api_base_url: String) -> Self {
        self.auth_base_url = auth_base_url.trim_end_matches('/').to_string();
        self.api_base_url = api_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn scope_param(&self) -> String {
        self.scopes.join(",")
    }
}
