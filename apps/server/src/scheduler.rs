//! Cron-driven background jobs.
//!
//! Each job runs in its own spawned loop that sleeps until the next cron
//! fire, runs the orchestrator to completion, and goes back to sleep.
//! Shutdown cancels the sleep and the in-flight run through the same
//! ambient token.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use cron::Schedule;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use creatorhub_connect::{SyncJob, SyncOrchestrator};

use crate::config::AppConfig;

struct JobState {
    name: &'static str,
    expression: String,
    schedule: Schedule,
    running: AtomicBool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub name: &'static str,
    pub schedule: String,
    pub next_run: Option<String>,
    pub running: bool,
}

#[derive(Clone)]
pub struct SchedulerHandle {
    enabled: bool,
    timezone_name: String,
    timezone: FixedOffset,
    jobs: Vec<Arc<JobState>>,
}

impl SchedulerHandle {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn timezone(&self) -> &str {
        &self.timezone_name
    }

    pub fn statuses(&self) -> Vec<JobStatusView> {
        self.jobs
            .iter()
            .map(|job| JobStatusView {
                name: job.name,
                schedule: job.expression.clone(),
                next_run: job
                    .schedule
                    .upcoming(self.timezone)
                    .next()
                    .map(|t| t.with_timezone(&Utc).to_rfc3339()),
                running: job.running.load(Ordering::SeqCst),
            })
            .collect()
    }
}

pub fn start(
    orchestrator: Arc<SyncOrchestrator>,
    config: &AppConfig,
    shutdown: CancellationToken,
) -> SchedulerHandle {
    let specs: [(&'static str, &str, SyncJob); 3] = [
        (
            "refresh_tokens",
            &config.cron_refresh_tokens,
            SyncJob::RefreshTokens,
        ),
        ("user_daily", &config.cron_user_daily, SyncJob::UserStats),
        ("video_daily", &config.cron_video_daily, SyncJob::VideoStats),
    ];

    let mut jobs = Vec::new();
    for (name, expression, sync_job) in specs {
        // Expressions were validated at config load; a parse failure here
        // means the config object was mutated, so skip rather than panic.
        let schedule = match Schedule::from_str(expression) {
            Ok(schedule) => schedule,
            Err(err) => {
                error!("cron expression for {} stopped parsing: {}", name, err);
                continue;
            }
        };
        let state = Arc::new(JobState {
            name,
            expression: expression.to_string(),
            schedule,
            running: AtomicBool::new(false),
        });
        jobs.push(Arc::clone(&state));

        if config.sync_enabled {
            spawn_job_loop(
                Arc::clone(&orchestrator),
                state,
                sync_job,
                config.timezone,
                shutdown.clone(),
            );
        }
    }

    if !config.sync_enabled {
        warn!("scheduler disabled by SYNC_ENABLED=false; jobs are listed but never fire");
    }

    SchedulerHandle {
        enabled: config.sync_enabled,
        timezone_name: config.timezone_name.clone(),
        timezone: config.timezone,
        jobs,
    }
}

fn spawn_job_loop(
    orchestrator: Arc<SyncOrchestrator>,
    state: Arc<JobState>,
    job: SyncJob,
    timezone: FixedOffset,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            let Some(next) = state.schedule.upcoming(timezone).next() else {
                warn!("{}: schedule has no upcoming fire times", state.name);
                break;
            };
            let wait = next.with_timezone(&Utc) - Utc::now();
            let wait = wait.to_std().unwrap_or_default();
            info!(
                "{}: next run at {} (in {:?})",
                state.name,
                next.to_rfc3339(),
                wait
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
            if shutdown.is_cancelled() {
                break;
            }

            state.running.store(true, Ordering::SeqCst);
            match orchestrator.run(job, None, &shutdown).await {
                Ok(summary) => info!(
                    "{}: run finished ({} stores, {} ok, {} failed, {} skipped, {} ms)",
                    state.name,
                    summary.total,
                    summary.succeeded,
                    summary.failed,
                    summary.skipped,
                    summary.duration_ms
                ),
                Err(err) => error!("{}: run errored: {}", state.name, err),
            }
            state.running.store(false, Ordering::SeqCst);
        }
        info!("{}: job loop stopped", state.name);
    });
}
