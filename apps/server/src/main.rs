//! CreatorHub server: OAuth connect surface, admin sync API and the
//! cron-driven metrics sync engine.

mod api;
mod config;
mod error;
mod pages;
mod scheduler;
mod state;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(warning) = config.pool_size_warning() {
        warn!("{}", warning);
    }

    let bind_addr = config.bind_addr;
    let state = state::build_state(config).context("wiring services")?;

    let app = api::router().with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!("listening on {}", bind_addr);

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received; draining in-flight work");
            shutdown.cancel();
        }
    });

    let serve_shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
