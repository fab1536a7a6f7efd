//! Cloud job scheduler
//!
//! Runs the producer manager and the job configuration listener against a
//! coordination registry, keeping the active schedule in line with the job
//! configurations stored there.

use std::sync::Arc;

use anyhow::Result;
use cloudjob_registry::InMemoryRegistry;
use cloudjob_scheduler::{
    config::{self, FRAMEWORK_FAILOVER_TIMEOUT, FRAMEWORK_NAME},
    state::SchedulerState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to CLOUDJOB_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        framework = FRAMEWORK_NAME,
        failover_timeout_secs = FRAMEWORK_FAILOVER_TIMEOUT.as_secs(),
        mesos_url = %config.mesos.url,
        mesos_user = %config.mesos.user,
        hostname = %config.mesos.hostname,
        "Starting cloud job scheduler"
    );
    info!(
        job_config_root = %config.job_config_root,
        ready_root = %config.ready_root,
        "Configuration loaded"
    );

    let registry = Arc::new(InMemoryRegistry::new());
    let state = SchedulerState::new(registry.clone(), &config);

    // Schedule what is already stored before listening for changes
    if let Err(e) = state.producer().startup().await {
        error!(error = %e, "Failed to start producer manager");
        return Err(e.into());
    }

    let listener = state.job_config_listener();
    if let Err(e) = listener.start().await {
        error!(error = %e, "Failed to start job configuration listener");
        return Err(e.into());
    }

    // Wait for shutdown signal (Ctrl+C)
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    match tokio::time::timeout(config.shutdown_timeout, listener.stop()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "Job configuration listener failed to stop cleanly"),
        Err(_) => warn!("Job configuration listener did not shut down in time"),
    }

    registry.close();
    info!("Cloud job scheduler shutdown complete");
    Ok(())
}
