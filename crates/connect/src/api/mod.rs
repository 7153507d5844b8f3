//! Rate-limited client for the platform's stats endpoints.

mod types;

pub use types::{UserStats, VideoPage, VideoStats};

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use creatorhub_core::pacer::RequestPacer;
use creatorhub_core::retry::{with_retry, RetryPolicy};

use crate::config::PlatformConfig;
use crate::errors::{ApiError, ConnectError, Result};

/// The platform rejects video pages larger than this.
pub const MAX_PAGE_SIZE: u32 = 20;
/// Hard cap on pagination rounds, guarding against a platform that never
/// stops returning `has_more`.
pub const MAX_PAGES: usize = 100;
/// Default ceiling on videos collected per store per run.
pub const DEFAULT_MAX_VIDEOS: usize = 1000;

const MAX_LOG_BODY_CHARS: usize = 512;

/// Progress callback for long listings; receives the running video count.
pub type ProgressFn<'a> = &'a (dyn Fn(usize) + Send + Sync);

/// The slice of the client the sync orchestrator consumes.
#[async_trait]
pub trait PlatformApiTrait: Send + Sync {
    async fn get_user_info(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<UserStats>;

    async fn fetch_all_videos(
        &self,
        access_token: &str,
        max_videos: usize,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<VideoStats>>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    log_id: Option<String>,
}

/// Every request passes the shared pacer before it leaves the process and
/// runs under the retry kernel with the transient-only classifier.
#[derive(Clone)]
pub struct PlatformApiClient {
    http: reqwest::Client,
    config: Arc<PlatformConfig>,
    pacer: Arc<RequestPacer>,
    retry: RetryPolicy,
}

impl PlatformApiClient {
    pub fn new(config: Arc<PlatformConfig>, pacer: Arc<RequestPacer>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            pacer,
            retry: RetryPolicy::default(),
        })
    }

    /// One page of the store's video listing. `max_count` is capped at the
    /// platform limit of 20.
    pub async fn list_videos(
        &self,
        access_token: &str,
        cursor: i64,
        max_count: u32,
        cancel: &CancellationToken,
    ) -> Result<VideoPage> {
        let url = format!(
            "{}/v2/video/list/?fields={}",
            self.config.api_base_url,
            urlencoding::encode(&self.config.video_fields.join(","))
        );
        let body = serde_json::json!({
            "cursor": cursor,
            "max_count": max_count.min(MAX_PAGE_SIZE),
        });

        let result = with_retry(
            &self.retry,
            cancel,
            "video_list",
            ConnectError::is_retryable,
            || {
                let http = self.http.clone();
                let pacer = Arc::clone(&self.pacer);
                let url = url.clone();
                let body = body.clone();
                let token = access_token.to_string();
                async move {
                    pacer.acquire().await;
                    let response = http.post(&url).bearer_auth(&token).json(&body).send().await?;
                    parse_envelope::<VideoPage>(response).await
                }
            },
        )
        .await;
        result.map_err(ConnectError::from)
    }
}

#[async_trait]
impl PlatformApiTrait for PlatformApiClient {
    async fn get_user_info(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<UserStats> {
        let url = format!(
            "{}/v2/user/info/?fields={}",
            self.config.api_base_url,
            urlencoding::encode(&self.config.user_fields.join(","))
        );

        #[derive(Debug, Deserialize)]
        struct UserData {
            user: UserStats,
        }

        let result = with_retry(
            &self.retry,
            cancel,
            "user_info",
            ConnectError::is_retryable,
            || {
                let http = self.http.clone();
                let pacer = Arc::clone(&self.pacer);
                let url = url.clone();
                let token = access_token.to_string();
                async move {
                    pacer.acquire().await;
                    let response = http.get(&url).bearer_auth(&token).send().await?;
                    parse_envelope::<UserData>(response).await.map(|d| d.user)
                }
            },
        )
        .await;
        result.map_err(ConnectError::from)
    }

    /// Walk the full listing from cursor 0 until the platform reports no
    /// more pages, `max_videos` is reached, or a pagination guard trips.
    async fn fetch_all_videos(
        &self,
        access_token: &str,
        max_videos: usize,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<Vec<VideoStats>> {
        let mut videos: Vec<VideoStats> = Vec::new();
        let mut cursor: i64 = 0;
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(ConnectError::Cancelled);
            }
            let page = self
                .list_videos(access_token, cursor, MAX_PAGE_SIZE, cancel)
                .await?;
            let received = page.videos.len();
            videos.extend(page.videos);
            pages += 1;
            if let Some(report) = on_progress {
                report(videos.len());
            }
            debug!(
                "[API] video page {}: {} items (cursor {} -> {}, has_more {})",
                pages, received, cursor, page.cursor, page.has_more
            );

            if videos.len() >= max_videos {
                videos.truncate(max_videos);
                debug!("[API] video cap of {} reached", max_videos);
                break;
            }
            // has_more=false is terminal even with a non-zero next cursor.
            if !page.has_more {
                break;
            }
            if page.cursor == cursor {
                warn!(
                    "[API] pagination cursor did not advance past {}; keeping {} collected videos",
                    cursor,
                    videos.len()
                );
                break;
            }
            if pages >= MAX_PAGES {
                warn!(
                    "[API] stopped after {} pages with {} videos; listing may be truncated",
                    pages,
                    videos.len()
                );
                break;
            }
            cursor = page.cursor;
        }
        Ok(videos)
    }
}

/// Decode the `{data, error}` envelope, surfacing platform error codes as
/// structured `ApiError`s and bare non-2xx statuses as `http_error`.
async fn parse_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => {
            if let Some(error) = envelope.error {
                let code = error.code.unwrap_or_default();
                if !code.is_empty() && code != "ok" {
                    return Err(ApiError::from_envelope(
                        code,
                        error.message.unwrap_or_default(),
                        error.log_id,
                        Some(status),
                    )
                    .into());
                }
            }
            if !(200..300).contains(&status) {
                return Err(ApiError::http(status, preview(&body)).into());
            }
            envelope
                .data
                .ok_or_else(|| ApiError::parse("envelope carried no data").into())
        }
        Err(e) => {
            if !(200..300).contains(&status) {
                return Err(ApiError::http(status, preview(&body)).into());
            }
            Err(ApiError::parse(format!("envelope decode failed: {}", e)).into())
        }
    }
}

fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(MAX_LOG_BODY_CHARS).collect();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        out.push_str("...");
    }
    out
}
