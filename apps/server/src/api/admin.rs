//! Admin sync surface. Authentication is provided by the deployment's
//! gateway layer in front of these routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use creatorhub_connect::{SyncJob, SyncRunSummary};
use creatorhub_core::accounts::StoreAccount;
use creatorhub_core::sync::SyncLogEntry;

use crate::error::{ApiError, ApiResult};
use crate::scheduler::JobStatusView;
use crate::state::AppState;

use super::is_valid_store_id;

fn default_job() -> String {
    "all".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RunSyncRequest {
    pub store_id: Option<String>,
    #[serde(default = "default_job")]
    pub job: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunSyncResponse {
    Completed(SyncRunSummary),
    Dispatched { status: &'static str, job: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub enabled: bool,
    pub timezone: String,
    pub jobs: Vec<JobStatusView>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub store_id: Option<String>,
    pub limit: Option<i64>,
}

/// POST /admin/sync/run — single-store triggers run inline and return the
/// summary; fleet-wide triggers detach so a large run cannot hold the
/// request open.
async fn run_sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunSyncRequest>,
) -> ApiResult<Json<RunSyncResponse>> {
    let job = SyncJob::parse(&request.job).ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_JOB",
            "job must be one of: all, user, video, refresh_tokens",
        )
    })?;

    if let Some(store_id) = request.store_id.as_deref() {
        if !is_valid_store_id(store_id) {
            return Err(ApiError::bad_request(
                "INVALID_STORE_ID",
                "store_id must be 1-50 characters of [A-Za-z0-9_-]",
            ));
        }
        info!("[Admin] manual {} sync for store {}", request.job, store_id);
        let summary = state
            .orchestrator
            .run(job, Some(store_id), &state.shutdown)
            .await?;
        return Ok(Json(RunSyncResponse::Completed(summary)));
    }

    info!("[Admin] manual fleet-wide {} sync dispatched", request.job);
    let orchestrator = Arc::clone(&state.orchestrator);
    let cancel = state.shutdown.clone();
    let job_name = request.job.clone();
    tokio::spawn(async move {
        match orchestrator.run(job, None, &cancel).await {
            Ok(summary) => info!(
                "[Admin] manual {} sync finished: {} stores, {} ok, {} failed, {} skipped",
                job_name, summary.total, summary.succeeded, summary.failed, summary.skipped
            ),
            Err(err) => error!("[Admin] manual {} sync errored: {}", job_name, err),
        }
    });
    Ok(Json(RunSyncResponse::Dispatched {
        status: "accepted",
        job: request.job,
    }))
}

/// GET /admin/sync/status
async fn sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatusResponse> {
    Json(SyncStatusResponse {
        enabled: state.scheduler.enabled(),
        timezone: state.scheduler.timezone().to_string(),
        jobs: state.scheduler.statuses(),
    })
}

/// GET /admin/sync/logs
async fn sync_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<SyncLogEntry>>> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=500).contains(&limit) {
        return Err(ApiError::bad_request(
            "INVALID_LIMIT",
            "limit must be between 1 and 500",
        ));
    }
    let entries = state.logs.list_recent(query.store_id.as_deref(), limit)?;
    Ok(Json(entries))
}

/// GET /admin/accounts — connection status overview; token ciphertext
/// never leaves the process.
async fn list_accounts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<StoreAccount>>> {
    let accounts = state.accounts.list_all()?;
    Ok(Json(accounts))
}

/// DELETE /admin/accounts/{store_id} — best-effort upstream revoke, then
/// the account is disabled for sync purposes.
async fn disconnect_account(
    State(state): State<Arc<AppState>>,
    Path(store_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !is_valid_store_id(&store_id) {
        return Err(ApiError::bad_request(
            "INVALID_STORE_ID",
            "store_id must be 1-50 characters of [A-Za-z0-9_-]",
        ));
    }
    if state.accounts.find_by_store_id(&store_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "no account for store '{}'",
            store_id
        )));
    }
    state.token_service.disconnect(&store_id).await?;
    Ok(Json(json!({ "storeId": store_id, "status": "DISABLED" })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/sync/run", post(run_sync))
        .route("/admin/sync/status", get(sync_status))
        .route("/admin/sync/logs", get(sync_logs))
        .route("/admin/accounts", get(list_accounts))
        .route("/admin/accounts/:store_id", delete(disconnect_account))
}
