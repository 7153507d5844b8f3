//! The sync orchestrator: fans scheduled work out across connected stores
//! with bounded concurrency, one durable lock per store, and per-store
//! failure isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, warn};
use tokio_util::sync::CancellationToken;

use creatorhub_core::accounts::{AccountStatus, StoreAccount, StoreAccountRepositoryTrait};
use creatorhub_core::oauth::PendingStateRepositoryTrait;
use creatorhub_core::snapshots::{
    snapshot_date_for, SnapshotRepositoryTrait, UserDailySnapshot, VideoDailySnapshot,
};
use creatorhub_core::sync::{SyncLockRepositoryTrait, SyncLogEntry, SyncLogRepositoryTrait, SyncLogStatus};

use crate::api::PlatformApiTrait;
use crate::errors::{ConnectError, Result};
use crate::tokens::TokenServiceTrait;

/// The jobs the scheduler (or the manual trigger) can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJob {
    RefreshTokens,
    UserStats,
    VideoStats,
    All,
}

impl SyncJob {
    pub fn job_name(&self) -> &'static str {
        match self {
            Self::RefreshTokens => "refresh_tokens",
            Self::UserStats => "user_daily",
            Self::VideoStats => "video_daily",
            Self::All => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "refresh_tokens" => Some(Self::RefreshTokens),
            "user" | "user_daily" => Some(Self::UserStats),
            "video" | "video_daily" => Some(Self::VideoStats),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub user_concurrency: usize,
    pub video_concurrency: usize,
    pub refresh_concurrency: usize,
    /// Refresh sweep picks accounts whose access token expires within this.
    pub refresh_horizon: chrono::Duration,
    pub max_videos_per_store: usize,
    pub sync_lock_ttl: Duration,
    pub refresh_lock_ttl: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_concurrency: 30,
            video_concurrency: 20,
            refresh_concurrency: 10,
            refresh_horizon: chrono::Duration::hours(24),
            max_videos_per_store: crate::api::DEFAULT_MAX_VIDEOS,
            sync_lock_ttl: Duration::from_secs(600),
            refresh_lock_ttl: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgressPayload {
    pub job: String,
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
}

/// Receives progress events during a run; the server bridges these into
/// its structured log stream.
pub trait SyncProgressReporter: Send + Sync {
    fn report_progress(&self, payload: SyncProgressPayload);
}

/// Reporter that drops everything, for callers without a progress sink.
pub struct NoopProgressReporter;

impl SyncProgressReporter for NoopProgressReporter {
    fn report_progress(&self, _payload: SyncProgressPayload) {}
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunSummary {
    pub job: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: i64,
    pub cancelled: bool,
}

impl SyncRunSummary {
    fn merge(job: &str, first: SyncRunSummary, second: SyncRunSummary) -> Self {
        Self {
            job: job.to_string(),
            total: first.total + second.total,
            succeeded: first.succeeded + second.succeeded,
            failed: first.failed + second.failed,
            skipped: first.skipped + second.skipped,
            duration_ms: first.duration_ms + second.duration_ms,
            cancelled: first.cancelled || second.cancelled,
        }
    }

    fn counts_message(&self) -> String {
        format!(
            "processed={} success={} failed={} skipped={}",
            self.total, self.succeeded, self.failed, self.skipped
        )
    }
}

enum StoreSyncOutcome {
    Completed(String),
    Skipped(String),
}

pub struct SyncOrchestrator {
    accounts: Arc<dyn StoreAccountRepositoryTrait>,
    snapshots: Arc<dyn SnapshotRepositoryTrait>,
    locks: Arc<dyn SyncLockRepositoryTrait>,
    logs: Arc<dyn SyncLogRepositoryTrait>,
    pending: Arc<dyn PendingStateRepositoryTrait>,
    tokens: Arc<dyn TokenServiceTrait>,
    api: Arc<dyn PlatformApiTrait>,
    reporter: Arc<dyn SyncProgressReporter>,
    config: SyncConfig,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn StoreAccountRepositoryTrait>,
        snapshots: Arc<dyn SnapshotRepositoryTrait>,
        locks: Arc<dyn SyncLockRepositoryTrait>,
        logs: Arc<dyn SyncLogRepositoryTrait>,
        pending: Arc<dyn PendingStateRepositoryTrait>,
        tokens: Arc<dyn TokenServiceTrait>,
        api: Arc<dyn PlatformApiTrait>,
        reporter: Arc<dyn SyncProgressReporter>,
        config: SyncConfig,
    ) -> Self {
        Self {
            accounts,
            snapshots,
            locks,
            logs,
            pending,
            tokens,
            api,
            reporter,
            config,
        }
    }

    /// Run a job across the fleet, or for one store when `store_id` is set.
    ///
    /// `All` runs the user job and then the video job; token refresh is not
    /// a separate phase because `get_valid_access_token` already refreshes
    /// anything inside the expiry window.
    pub async fn run(
        &self,
        job: SyncJob,
        store_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SyncRunSummary> {
        match job {
            SyncJob::All => {
                let user = self.run_job(SyncJob::UserStats, store_id, cancel).await?;
                let video = self.run_job(SyncJob::VideoStats, store_id, cancel).await?;
                Ok(SyncRunSummary::merge("all", user, video))
            }
            other => self.run_job(other, store_id, cancel).await,
        }
    }

    async fn run_job(
        &self,
        job: SyncJob,
        store_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SyncRunSummary> {
        let run_started = Utc::now();
        let run_clock = Instant::now();
        let snapshot_date = snapshot_date_for(run_started);

        let run_entry = SyncLogEntry::begin(job.job_name(), None);
        let run_id = run_entry.id.clone();
        self.append_log(run_entry).await;

        if job == SyncJob::RefreshTokens {
            self.run_maintenance().await;
        }

        let candidates = self.candidates(job, store_id)?;
        let total = candidates.len();
        let stride = (total / 100).max(1);
        let processed = Arc::new(AtomicUsize::new(0));
        debug!(
            "[Sync] {} run {} covering {} store(s)",
            job.job_name(),
            run_id,
            total
        );

        let statuses: Vec<SyncLogStatus> = stream::iter(candidates)
            // Cancellation stops dispatching new stores; stores already
            // in flight drain naturally below.
            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
            .map(|account| {
                let processed = Arc::clone(&processed);
                async move {
                    let status = self
                        .process_store(job, account, snapshot_date, cancel)
                        .await;
                    let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
                    if done % stride == 0 || done == total {
                        self.reporter.report_progress(SyncProgressPayload {
                            job: job.job_name().to_string(),
                            processed: done,
                            total,
                            percent: ((done * 100) / total.max(1)) as u8,
                        });
                    }
                    status
                }
            })
            .buffer_unordered(self.concurrency_for(job))
            .collect()
            .await;

        let mut summary = SyncRunSummary {
            job: job.job_name().to_string(),
            total: statuses.len(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
            duration_ms: run_clock.elapsed().as_millis() as i64,
            cancelled: cancel.is_cancelled(),
        };
        for status in &statuses {
            match status {
                SyncLogStatus::Success => summary.succeeded += 1,
                SyncLogStatus::Failed => summary.failed += 1,
                SyncLogStatus::Skipped => summary.skipped += 1,
                SyncLogStatus::Running => {}
            }
        }

        let (status, message) = if summary.cancelled {
            (SyncLogStatus::Skipped, "cancelled".to_string())
        } else if summary.failed > 0 {
            (SyncLogStatus::Failed, summary.counts_message())
        } else {
            (SyncLogStatus::Success, summary.counts_message())
        };
        self.finish_log(&run_id, status, message, summary.duration_ms)
            .await;
        Ok(summary)
    }

    fn concurrency_for(&self, job: SyncJob) -> usize {
        let n = match job {
            SyncJob::RefreshTokens => self.config.refresh_concurrency,
            SyncJob::UserStats | SyncJob::All => self.config.user_concurrency,
            SyncJob::VideoStats => self.config.video_concurrency,
        };
        n.max(1)
    }

    fn lock_ttl_for(&self, job: SyncJob) -> Duration {
        match job {
            SyncJob::RefreshTokens => self.config.refresh_lock_ttl,
            _ => self.config.sync_lock_ttl,
        }
    }

    /// Wall-clock ceiling for one store's pipeline; the lock TTL is the
    /// crash backstop, this is the cooperative one.
    fn store_timeout_for(&self, job: SyncJob) -> Duration {
        match job {
            SyncJob::RefreshTokens => Duration::from_secs(120),
            SyncJob::UserStats => Duration::from_secs(120),
            SyncJob::VideoStats | SyncJob::All => Duration::from_secs(600),
        }
    }

    fn candidates(&self, job: SyncJob, store_id: Option<&str>) -> Result<Vec<StoreAccount>> {
        if let Some(id) = store_id {
            let account = self.accounts.find_by_store_id(id)?.ok_or_else(|| {
                ConnectError::Core(creatorhub_core::Error::validation(format!(
                    "no connected account for store '{}'",
                    id
                )))
            })?;
            return Ok(vec![account]);
        }
        let accounts = match job {
            SyncJob::RefreshTokens => self
                .accounts
                .list_refresh_candidates(Utc::now() + self.config.refresh_horizon)?,
            _ => self.accounts.list_by_status(AccountStatus::Connected)?,
        };
        Ok(accounts)
    }

    /// The refresh sweep doubles as housekeeping for expired short-lived
    /// rows (pending OAuth state and dead locks).
    async fn run_maintenance(&self) {
        let now = Utc::now();
        match self.pending.sweep_expired(now).await {
            Ok(swept) if swept > 0 => debug!("[Sync] swept {} expired pending-state rows", swept),
            Ok(_) => {}
            Err(err) => warn!("[Sync] pending-state sweep failed: {}", err),
        }
        match self.locks.sweep_expired(now).await {
            Ok(swept) if swept > 0 => debug!("[Sync] swept {} expired lock rows", swept),
            Ok(_) => {}
            Err(err) => warn!("[Sync] lock sweep failed: {}", err),
        }
    }

    /// One store's pipeline: lock → token → fetch → write → unlock, with
    /// the per-store log entry written whatever happens. Never propagates —
    /// a store failure is data for the run summary, not an abort.
    async fn process_store(
        &self,
        job: SyncJob,
        account: StoreAccount,
        snapshot_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> SyncLogStatus {
        let store_id = account.store_id.clone();
        let store_started = Utc::now();
        let store_clock = Instant::now();
        let lock_key = format!("sync:{}", store_id);

        let acquired = match self.locks.acquire(&lock_key, self.lock_ttl_for(job)).await {
            Ok(acquired) => acquired,
            Err(err) => {
                self.write_store_log(
                    job,
                    &store_id,
                    SyncLogStatus::Failed,
                    format!("lock acquire failed: {}", err),
                    Some(format!("{:?}", err)),
                    store_started,
                    store_clock.elapsed(),
                )
                .await;
                return SyncLogStatus::Failed;
            }
        };
        if !acquired {
            self.write_store_log(
                job,
                &store_id,
                SyncLogStatus::Skipped,
                "sync already in progress".to_string(),
                None,
                store_started,
                store_clock.elapsed(),
            )
            .await;
            return SyncLogStatus::Skipped;
        }

        let result = match tokio::time::timeout(
            self.store_timeout_for(job),
            self.sync_store(job, &account, snapshot_date, cancel),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Core(creatorhub_core::Error::Unexpected(
                format!(
                    "store sync timed out after {:?}",
                    self.store_timeout_for(job)
                ),
            ))),
        };

        // Guaranteed release: the lock row must not outlive this pipeline
        // whatever the outcome; TTL expiry is only the crash backstop.
        if let Err(err) = self.locks.release(&lock_key).await {
            warn!("[Sync] failed to release {} ({})", lock_key, err);
        }

        let (status, message, details) = match result {
            Ok(StoreSyncOutcome::Completed(message)) => (SyncLogStatus::Success, message, None),
            Ok(StoreSyncOutcome::Skipped(message)) => (SyncLogStatus::Skipped, message, None),
            Err(ConnectError::Cancelled) => {
                (SyncLogStatus::Skipped, "cancelled".to_string(), None)
            }
            Err(err) => (
                SyncLogStatus::Failed,
                err.to_string(),
                Some(format!("{:?}", err)),
            ),
        };
        self.write_store_log(
            job,
            &store_id,
            status,
            message,
            details,
            store_started,
            store_clock.elapsed(),
        )
        .await;
        status
    }

    async fn sync_store(
        &self,
        job: SyncJob,
        account: &StoreAccount,
        snapshot_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<StoreSyncOutcome> {
        let store_id = account.store_id.as_str();
        let Some(access_token) = self
            .tokens
            .get_valid_access_token(store_id, cancel)
            .await?
        else {
            return Ok(StoreSyncOutcome::Skipped("no valid token".to_string()));
        };

        match job {
            SyncJob::RefreshTokens => Ok(StoreSyncOutcome::Completed("token ok".to_string())),
            SyncJob::UserStats => {
                let message = self
                    .sync_user_stats(account, &access_token, snapshot_date, cancel)
                    .await?;
                Ok(StoreSyncOutcome::Completed(message))
            }
            SyncJob::VideoStats => {
                let message = self
                    .sync_video_stats(account, &access_token, snapshot_date, cancel)
                    .await?;
                Ok(StoreSyncOutcome::Completed(message))
            }
            SyncJob::All => {
                let user = self
                    .sync_user_stats(account, &access_token, snapshot_date, cancel)
                    .await?;
                let video = self
                    .sync_video_stats(account, &access_token, snapshot_date, cancel)
                    .await?;
                Ok(StoreSyncOutcome::Completed(format!("{}; {}", user, video)))
            }
        }
    }

    async fn sync_user_stats(
        &self,
        account: &StoreAccount,
        access_token: &str,
        snapshot_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let stats = self.api.get_user_info(access_token, cancel).await?;
        let open_id = if stats.open_id.is_empty() {
            account.platform_open_id.clone()
        } else {
            stats.open_id.clone()
        };
        self.snapshots
            .upsert_user_daily(UserDailySnapshot {
                store_id: account.store_id.clone(),
                platform_open_id: open_id,
                snapshot_date,
                display_name: stats.display_name,
                avatar_url: stats.avatar_url,
                follower_count: stats.follower_count,
                following_count: stats.following_count,
                likes_count: stats.likes_count,
                video_count: stats.video_count,
            })
            .await?;
        self.tokens.update_last_sync(&account.store_id).await?;
        Ok(format!(
            "user snapshot updated ({} followers)",
            stats.follower_count
        ))
    }

    async fn sync_video_stats(
        &self,
        account: &StoreAccount,
        access_token: &str,
        snapshot_date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let videos = self
            .api
            .fetch_all_videos(
                access_token,
                self.config.max_videos_per_store,
                cancel,
                None,
            )
            .await?;
        let rows: Vec<VideoDailySnapshot> = videos
            .iter()
            .filter(|v| !v.id.is_empty())
            .map(|v| VideoDailySnapshot {
                store_id: account.store_id.clone(),
                video_id: v.id.clone(),
                snapshot_date,
                view_count: v.view_count,
                like_count: v.like_count,
                comment_count: v.comment_count,
                share_count: v.share_count,
                description: v.video_description.clone(),
                cover_url: v.cover_image_url.clone(),
                share_url: v.share_url.clone(),
                video_created_at: v.created_at(),
            })
            .collect();
        let written = self.snapshots.upsert_video_daily(rows).await?;
        self.tokens.update_last_sync(&account.store_id).await?;
        Ok(format!("synced {} videos", written))
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_store_log(
        &self,
        job: SyncJob,
        store_id: &str,
        status: SyncLogStatus,
        message: String,
        details: Option<String>,
        started_at: chrono::DateTime<Utc>,
        elapsed: Duration,
    ) {
        let mut entry = SyncLogEntry::begin(job.job_name(), Some(store_id.to_string()));
        entry.status = status;
        entry.message = Some(message);
        entry.error_details = details;
        entry.started_at = started_at;
        entry.completed_at = Some(Utc::now());
        entry.duration_ms = Some(elapsed.as_millis() as i64);
        self.append_log(entry).await;
    }

    /// Log writes are best-effort: losing a log line must never turn a
    /// successful sync into a failure.
    async fn append_log(&self, entry: SyncLogEntry) {
        if let Err(err) = self.logs.append(entry.clone()).await {
            error!(
                "[Sync] could not persist sync log ({}); entry={}",
                err,
                serde_json::to_string(&entry).unwrap_or_default()
            );
        }
    }

    async fn finish_log(&self, id: &str, status: SyncLogStatus, message: String, duration_ms: i64) {
        if let Err(err) = self
            .logs
            .finish(id, status, Some(message.clone()), None, duration_ms)
            .await
        {
            error!(
                "[Sync] could not finalize run log {} ({}); status={} message={}",
                id,
                err,
                status.as_str(),
                message
            );
        }
    }
}

#[cfg(test)]
mod tests;
