//! Process wiring: pool → repositories → services → orchestrator →
//! scheduler, all constructed explicitly and handed down.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use creatorhub_connect::sync::SyncProgressReporter;
use creatorhub_connect::{
    OAuthClient, OAuthService, PlatformApiClient, PlatformApiTrait, StateSigner,
    SyncOrchestrator, SyncProgressPayload, TokenService, TokenServiceTrait,
};
use creatorhub_core::accounts::StoreAccountRepositoryTrait;
use creatorhub_core::oauth::PendingStateRepositoryTrait;
use creatorhub_core::pacer::RequestPacer;
use creatorhub_core::snapshots::SnapshotRepositoryTrait;
use creatorhub_core::sync::{SyncLockRepositoryTrait, SyncLogRepositoryTrait};
use creatorhub_core::vault::CryptoVault;
use creatorhub_storage_sqlite::accounts::StoreAccountRepository;
use creatorhub_storage_sqlite::db::{create_pool, DbPool, WriteHandle};
use creatorhub_storage_sqlite::locks::SyncLockRepository;
use creatorhub_storage_sqlite::oauth_state::PendingStateRepository;
use creatorhub_storage_sqlite::snapshots::SnapshotRepository;
use creatorhub_storage_sqlite::sync_logs::SyncLogRepository;
use creatorhub_storage_sqlite::run_migrations;

use crate::config::AppConfig;
use crate::scheduler::{self, SchedulerHandle};

/// Bridges orchestrator progress into the structured log stream.
struct TracingProgressReporter;

impl SyncProgressReporter for TracingProgressReporter {
    fn report_progress(&self, payload: SyncProgressPayload) {
        info!(
            job = %payload.job,
            processed = payload.processed,
            total = payload.total,
            percent = payload.percent,
            "sync progress"
        );
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub pool: Arc<DbPool>,
    pub accounts: Arc<dyn StoreAccountRepositoryTrait>,
    pub logs: Arc<dyn SyncLogRepositoryTrait>,
    pub oauth_service: Arc<OAuthService>,
    pub token_service: Arc<TokenService>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub scheduler: SchedulerHandle,
    pub shutdown: CancellationToken,
}

pub fn build_state(config: AppConfig) -> Result<Arc<AppState>> {
    let pool = create_pool(&config.db_url, config.db_pool_size, config.db_pool_min)
        .context("building database pool")?;
    {
        let mut conn = pool.get().context("checking out migration connection")?;
        run_migrations(&mut conn).context("applying migrations")?;
    }
    let writer = WriteHandle::new(Arc::clone(&pool));

    let accounts: Arc<dyn StoreAccountRepositoryTrait> = Arc::new(StoreAccountRepository::new(
        Arc::clone(&pool),
        writer.clone(),
    ));
    let snapshots: Arc<dyn SnapshotRepositoryTrait> = Arc::new(SnapshotRepository::new(
        Arc::clone(&pool),
        writer.clone(),
    ));
    let locks: Arc<dyn SyncLockRepositoryTrait> = Arc::new(SyncLockRepository::new(
        Arc::clone(&pool),
        writer.clone(),
    ));
    let logs: Arc<dyn SyncLogRepositoryTrait> = Arc::new(SyncLogRepository::new(
        Arc::clone(&pool),
        writer.clone(),
    ));
    let pending: Arc<dyn PendingStateRepositoryTrait> = Arc::new(PendingStateRepository::new(
        Arc::clone(&pool),
        writer,
    ));

    let vault = Arc::new(CryptoVault::new(&config.token_enc_key).context("building token vault")?);
    let pacer = Arc::new(RequestPacer::new(config.rate_limit_rps));
    let platform = Arc::new(config.platform.clone());

    let oauth_client = OAuthClient::new(Arc::clone(&platform)).context("building OAuth client")?;
    let api_client: Arc<dyn PlatformApiTrait> = Arc::new(
        PlatformApiClient::new(Arc::clone(&platform), Arc::clone(&pacer))
            .context("building platform API client")?,
    );
    let token_service = Arc::new(TokenService::new(
        Arc::clone(&accounts),
        vault,
        oauth_client.clone(),
    ));

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&accounts),
        snapshots,
        locks,
        Arc::clone(&logs),
        Arc::clone(&pending),
        Arc::clone(&token_service) as Arc<dyn TokenServiceTrait>,
        api_client,
        Arc::new(TracingProgressReporter),
        config.sync.clone(),
    ));

    let oauth_service = Arc::new(OAuthService::new(
        StateSigner::new(config.state_secret.clone()),
        oauth_client,
        pending,
        Arc::clone(&token_service),
    ));

    let shutdown = CancellationToken::new();
    let scheduler = scheduler::start(Arc::clone(&orchestrator), &config, shutdown.clone());

    Ok(Arc::new(AppState {
        config,
        pool,
        accounts,
        logs,
        oauth_service,
        token_service,
        orchestrator,
        scheduler,
        shutdown,
    }))
}
