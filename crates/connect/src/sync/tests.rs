use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use creatorhub_core::accounts::{
    AccountStatus, NewStoreAccount, StoreAccount, StoreAccountRepositoryTrait, TokenRotation,
};
use creatorhub_core::oauth::{PendingState, PendingStateRepositoryTrait};
use creatorhub_core::snapshots::{SnapshotRepositoryTrait, UserDailySnapshot, VideoDailySnapshot};
use creatorhub_core::sync::{SyncLockRepositoryTrait, SyncLogEntry, SyncLogRepositoryTrait, SyncLogStatus};
use creatorhub_core::Result as CoreResult;

use super::*;
use crate::api::{PlatformApiTrait, ProgressFn, UserStats, VideoStats};
use crate::errors::{ApiError, Result as ConnectResult};
use crate::tokens::TokenServiceTrait;

// ─────────────────────────────────────────────────────────────────────────
// In-memory fakes
// ─────────────────────────────────────────────────────────────────────────

fn connected_account(store_id: &str) -> StoreAccount {
    StoreAccount {
        store_id: store_id.to_string(),
        platform_open_id: format!("open-{}", store_id),
        access_token_ct: "ct-access".to_string(),
        refresh_token_ct: "ct-refresh".to_string(),
        access_expires_at: Utc::now() + ChronoDuration::hours(20),
        refresh_expires_at: Utc::now() + ChronoDuration::days(30),
        scope: "user.info.basic,video.list".to_string(),
        status: AccountStatus::Connected,
        last_sync_at: None,
        connected_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
struct FakeAccounts {
    accounts: Mutex<HashMap<String, StoreAccount>>,
}

impl FakeAccounts {
    fn with(accounts: Vec<StoreAccount>) -> Self {
        Self {
            accounts: Mutex::new(
                accounts
                    .into_iter()
                    .map(|a| (a.store_id.clone(), a))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl StoreAccountRepositoryTrait for FakeAccounts {
    fn find_by_store_id(&self, store_id: &str) -> CoreResult<Option<StoreAccount>> {
        Ok(self.accounts.lock().unwrap().get(store_id).cloned())
    }

    fn list_all(&self) -> CoreResult<Vec<StoreAccount>> {
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }

    fn list_by_status(&self, status: AccountStatus) -> CoreResult<Vec<StoreAccount>> {
        let mut accounts: Vec<StoreAccount> = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        Ok(accounts)
    }

    fn list_refresh_candidates(&self, horizon: DateTime<Utc>) -> CoreResult<Vec<StoreAccount>> {
        let mut accounts: Vec<StoreAccount> = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.status == AccountStatus::Connected && a.access_expires_at < horizon)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.store_id.cmp(&b.store_id));
        Ok(accounts)
    }

    async fn upsert_connected(&self, account: NewStoreAccount) -> CoreResult<StoreAccount> {
        let mut row = connected_account(&account.store_id);
        row.platform_open_id = account.platform_open_id;
        self.accounts
            .lock()
            .unwrap()
            .insert(row.store_id.clone(), row.clone());
        Ok(row)
    }

    async fn rotate_tokens(&self, _store_id: &str, _rotation: TokenRotation) -> CoreResult<()> {
        Ok(())
    }

    async fn set_status(&self, store_id: &str, status: AccountStatus) -> CoreResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(store_id) {
            account.status = status;
        }
        Ok(())
    }

    async fn mark_synced(&self, store_id: &str, at: DateTime<Utc>) -> CoreResult<()> {
        if let Some(account) = self.accounts.lock().unwrap().get_mut(store_id) {
            account.last_sync_at = Some(at);
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeSnapshots {
    users: Mutex<Vec<UserDailySnapshot>>,
    videos: Mutex<Vec<VideoDailySnapshot>>,
}

#[async_trait]
impl SnapshotRepositoryTrait for FakeSnapshots {
    async fn upsert_user_daily(&self, row: UserDailySnapshot) -> CoreResult<()> {
        self.users.lock().unwrap().push(row);
        Ok(())
    }

    async fn upsert_video_daily(&self, rows: Vec<VideoDailySnapshot>) -> CoreResult<usize> {
        let count = rows.len();
        self.videos.lock().unwrap().extend(rows);
        Ok(count)
    }
}

#[derive(Default)]
struct FakeLocks {
    pre_held: HashSet<String>,
    held: Mutex<HashSet<String>>,
}

impl FakeLocks {
    fn holding(keys: &[&str]) -> Self {
        Self {
            pre_held: keys.iter().map(|k| k.to_string()).collect(),
            held: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl SyncLockRepositoryTrait for FakeLocks {
    async fn acquire(&self, lock_key: &str, _ttl: std::time::Duration) -> CoreResult<bool> {
        if self.pre_held.contains(lock_key) {
            return Ok(false);
        }
        Ok(self.held.lock().unwrap().insert(lock_key.to_string()))
    }

    async fn release(&self, lock_key: &str) -> CoreResult<()> {
        self.held.lock().unwrap().remove(lock_key);
        Ok(())
    }

    async fn sweep_expired(&self, _now: DateTime<Utc>) -> CoreResult<usize> {
        Ok(0)
    }
}

#[derive(Default)]
struct FakeLogs {
    entries: Mutex<Vec<SyncLogEntry>>,
}

impl FakeLogs {
    fn store_entries(&self, store_id: &str) -> Vec<SyncLogEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.store_id.as_deref() == Some(store_id))
            .cloned()
            .collect()
    }

    fn run_entry(&self) -> SyncLogEntry {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.store_id.is_none())
            .cloned()
            .expect("run-level entry present")
    }
}

#[async_trait]
impl SyncLogRepositoryTrait for FakeLogs {
    async fn append(&self, entry: SyncLogEntry) -> CoreResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn finish(
        &self,
        id: &str,
        status: SyncLogStatus,
        message: Option<String>,
        error_details: Option<String>,
        duration_ms: i64,
    ) -> CoreResult<()> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|e| e.id == id) {
            entry.status = status;
            entry.message = message;
            entry.error_details = error_details;
            entry.duration_ms = Some(duration_ms);
            entry.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn list_recent(&self, _store_id: Option<&str>, _limit: i64) -> CoreResult<Vec<SyncLogEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct FakePending;

#[async_trait]
impl PendingStateRepositoryTrait for FakePending {
    async fn insert(&self, _row: PendingState) -> CoreResult<()> {
        Ok(())
    }

    async fn sweep_expired(&self, _now: DateTime<Utc>) -> CoreResult<usize> {
        Ok(0)
    }

    async fn take(&self, _state: &str) -> CoreResult<Option<PendingState>> {
        Ok(None)
    }
}

/// Hands out `AT-<store>` for every store except those listed as dry.
struct FakeTokens {
    dry_stores: HashSet<String>,
    last_synced: Mutex<Vec<String>>,
}

impl FakeTokens {
    fn new() -> Self {
        Self {
            dry_stores: HashSet::new(),
            last_synced: Mutex::new(Vec::new()),
        }
    }

    fn without_token(stores: &[&str]) -> Self {
        Self {
            dry_stores: stores.iter().map(|s| s.to_string()).collect(),
            last_synced: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TokenServiceTrait for FakeTokens {
    async fn get_valid_access_token(
        &self,
        store_id: &str,
        _cancel: &CancellationToken,
    ) -> ConnectResult<Option<String>> {
        if self.dry_stores.contains(store_id) {
            return Ok(None);
        }
        Ok(Some(format!("AT-{}", store_id)))
    }

    async fn update_last_sync(&self, store_id: &str) -> ConnectResult<()> {
        self.last_synced.lock().unwrap().push(store_id.to_string());
        Ok(())
    }
}

/// Serves canned stats; stores listed in `failing` get a 503 instead.
struct FakeApi {
    failing: HashSet<String>,
    videos_per_store: usize,
}

impl FakeApi {
    fn new(videos_per_store: usize) -> Self {
        Self {
            failing: HashSet::new(),
            videos_per_store,
        }
    }

    fn failing_for(stores: &[&str]) -> Self {
        Self {
            failing: stores.iter().map(|s| format!("AT-{}", s)).collect(),
            videos_per_store: 2,
        }
    }
}

#[async_trait]
impl PlatformApiTrait for FakeApi {
    async fn get_user_info(
        &self,
        access_token: &str,
        _cancel: &CancellationToken,
    ) -> ConnectResult<UserStats> {
        if self.failing.contains(access_token) {
            return Err(ApiError::http(503, "upstream sad").into());
        }
        Ok(UserStats {
            open_id: format!("open-for-{}", access_token),
            display_name: "Store".to_string(),
            follower_count: 7,
            following_count: 3,
            likes_count: 100,
            video_count: 2,
            ..Default::default()
        })
    }

    async fn fetch_all_videos(
        &self,
        access_token: &str,
        _max_videos: usize,
        _cancel: &CancellationToken,
        _on_progress: Option<ProgressFn<'_>>,
    ) -> ConnectResult<Vec<VideoStats>> {
        if self.failing.contains(access_token) {
            return Err(ApiError::http(503, "upstream sad").into());
        }
        Ok((0..self.videos_per_store)
            .map(|i| VideoStats {
                id: format!("v{}", i),
                create_time: 1_700_000_000 + i as i64,
                view_count: 10 * i as i64,
                ..Default::default()
            })
            .collect())
    }
}

struct CountingReporter {
    calls: AtomicUsize,
}

impl SyncProgressReporter for CountingReporter {
    fn report_progress(&self, _payload: SyncProgressPayload) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    accounts: Arc<FakeAccounts>,
    snapshots: Arc<FakeSnapshots>,
    locks: Arc<FakeLocks>,
    logs: Arc<FakeLogs>,
    tokens: Arc<FakeTokens>,
    reporter: Arc<CountingReporter>,
}

impl Harness {
    fn orchestrator(&self, api: FakeApi) -> SyncOrchestrator {
        SyncOrchestrator::new(
            Arc::clone(&self.accounts) as Arc<dyn StoreAccountRepositoryTrait>,
            Arc::clone(&self.snapshots) as Arc<dyn SnapshotRepositoryTrait>,
            Arc::clone(&self.locks) as Arc<dyn SyncLockRepositoryTrait>,
            Arc::clone(&self.logs) as Arc<dyn SyncLogRepositoryTrait>,
            Arc::new(FakePending) as Arc<dyn PendingStateRepositoryTrait>,
            Arc::clone(&self.tokens) as Arc<dyn TokenServiceTrait>,
            Arc::new(api) as Arc<dyn PlatformApiTrait>,
            Arc::clone(&self.reporter) as Arc<dyn SyncProgressReporter>,
            SyncConfig::default(),
        )
    }
}

fn harness(accounts: Vec<StoreAccount>, locks: FakeLocks, tokens: FakeTokens) -> Harness {
    Harness {
        accounts: Arc::new(FakeAccounts::with(accounts)),
        snapshots: Arc::new(FakeSnapshots::default()),
        locks: Arc::new(locks),
        logs: Arc::new(FakeLogs::default()),
        tokens: Arc::new(tokens),
        reporter: Arc::new(CountingReporter {
            calls: AtomicUsize::new(0),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Runs
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_sync_writes_snapshot_and_success_log() {
    let h = harness(
        vec![connected_account("store_A")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let summary = orchestrator
        .run(SyncJob::UserStats, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    let users = h.snapshots.users.lock().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].store_id, "store_A");
    assert_eq!(users[0].follower_count, 7);
    assert_eq!(users[0].snapshot_date, Utc::now().date_naive());
    drop(users);

    let entries = h.logs.store_entries("store_A");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, SyncLogStatus::Success);
    assert!(entries[0].completed_at.is_some());
    assert!(entries[0].duration_ms.is_some());

    assert_eq!(h.logs.run_entry().status, SyncLogStatus::Success);
    assert_eq!(
        h.tokens.last_synced.lock().unwrap().as_slice(),
        ["store_A".to_string()]
    );
    // Small fleet: one progress report per completion.
    assert_eq!(h.reporter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn held_lock_skips_the_store_without_calling_the_api() {
    let h = harness(
        vec![connected_account("store_B")],
        FakeLocks::holding(&["sync:store_B"]),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let summary = orchestrator
        .run(SyncJob::UserStats, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 0);
    let entries = h.logs.store_entries("store_B");
    assert_eq!(entries[0].status, SyncLogStatus::Skipped);
    assert!(entries[0]
        .message
        .as_deref()
        .unwrap()
        .contains("already in progress"));
    assert!(h.snapshots.users.lock().unwrap().is_empty());
}

#[tokio::test]
async fn store_without_token_is_skipped_with_message() {
    let h = harness(
        vec![connected_account("store_C")],
        FakeLocks::default(),
        FakeTokens::without_token(&["store_C"]),
    );
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let summary = orchestrator
        .run(SyncJob::UserStats, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    let entries = h.logs.store_entries("store_C");
    assert_eq!(entries[0].status, SyncLogStatus::Skipped);
    assert_eq!(entries[0].message.as_deref(), Some("no valid token"));
}

#[tokio::test]
async fn one_failing_store_never_aborts_the_run() {
    let h = harness(
        vec![connected_account("store_ok"), connected_account("store_sad")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::failing_for(&["store_sad"]));

    let summary = orchestrator
        .run(SyncJob::UserStats, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let sad = h.logs.store_entries("store_sad");
    assert_eq!(sad[0].status, SyncLogStatus::Failed);
    assert!(sad[0].error_details.is_some());
    let ok = h.logs.store_entries("store_ok");
    assert_eq!(ok[0].status, SyncLogStatus::Success);

    // A run with failures is itself marked failed, with counts.
    let run = h.logs.run_entry();
    assert_eq!(run.status, SyncLogStatus::Failed);
    assert!(run.message.as_deref().unwrap().contains("failed=1"));
}

#[tokio::test]
async fn cancellation_before_dispatch_runs_nothing() {
    let h = harness(
        vec![connected_account("store_A"), connected_account("store_B")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = orchestrator
        .run(SyncJob::UserStats, None, &cancel)
        .await
        .unwrap();

    assert_eq!(summary.total, 0);
    assert!(summary.cancelled);
    let run = h.logs.run_entry();
    assert_eq!(run.status, SyncLogStatus::Skipped);
    assert_eq!(run.message.as_deref(), Some("cancelled"));
    assert!(h.snapshots.users.lock().unwrap().is_empty());
}

#[tokio::test]
async fn video_sync_writes_batched_rows() {
    let h = harness(
        vec![connected_account("store_V")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(3));

    let summary = orchestrator
        .run(SyncJob::VideoStats, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    let videos = h.snapshots.videos.lock().unwrap();
    assert_eq!(videos.len(), 3);
    assert!(videos.iter().all(|v| v.store_id == "store_V"));
    drop(videos);

    let entries = h.logs.store_entries("store_V");
    assert_eq!(entries[0].message.as_deref(), Some("synced 3 videos"));
}

#[tokio::test]
async fn job_all_runs_user_then_video() {
    let h = harness(
        vec![connected_account("store_A")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(2));

    let summary = orchestrator
        .run(SyncJob::All, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.job, "all");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(h.snapshots.users.lock().unwrap().len(), 1);
    assert_eq!(h.snapshots.videos.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn single_store_scope_targets_only_that_store() {
    let h = harness(
        vec![connected_account("store_A"), connected_account("store_B")],
        FakeLocks::default(),
        FakeTokens::new(),
    );
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let summary = orchestrator
        .run(SyncJob::UserStats, Some("store_B"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 1);
    let users = h.snapshots.users.lock().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].store_id, "store_B");
}

#[tokio::test]
async fn unknown_single_store_is_an_error() {
    let h = harness(vec![], FakeLocks::default(), FakeTokens::new());
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let result = orchestrator
        .run(SyncJob::UserStats, Some("ghost"), &CancellationToken::new())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn refresh_job_only_touches_tokens() {
    let mut soon = connected_account("store_soon");
    soon.access_expires_at = Utc::now() + ChronoDuration::hours(2);
    let mut later = connected_account("store_later");
    later.access_expires_at = Utc::now() + ChronoDuration::hours(90);

    let h = harness(vec![soon, later], FakeLocks::default(), FakeTokens::new());
    let orchestrator = h.orchestrator(FakeApi::new(0));

    let summary = orchestrator
        .run(SyncJob::RefreshTokens, None, &CancellationToken::new())
        .await
        .unwrap();

    // Only the account inside the 24h horizon is swept.
    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert!(h.snapshots.users.lock().unwrap().is_empty());
    assert!(h.snapshots.videos.lock().unwrap().is_empty());
    let entries = h.logs.store_entries("store_soon");
    assert_eq!(entries[0].status, SyncLogStatus::Success);
}

#[test]
fn job_parsing_accepts_the_admin_vocabulary() {
    assert_eq!(SyncJob::parse("all"), Some(SyncJob::All));
    assert_eq!(SyncJob::parse("user"), Some(SyncJob::UserStats));
    assert_eq!(SyncJob::parse("video"), Some(SyncJob::VideoStats));
    assert_eq!(SyncJob::parse("refresh_tokens"), Some(SyncJob::RefreshTokens));
    assert_eq!(SyncJob::parse("bogus"), None);
}
