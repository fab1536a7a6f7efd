//! Dedicated listener worker.
//!
//! Every notification delivered to the listener is handled on this one task,
//! strictly in arrival order: notification N+1 is not looked at until the
//! commands for notification N have returned. The worker exits once the tree
//! cache drops its sender and the channel has been drained.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cloudjob_registry::ChangeNotification;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use super::dispatch::{HandleOutcome, JobConfigHandler};

/// Counters reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub notifications: u64,
    pub ignored: u64,
    pub decode_failures: u64,
    pub dispatch_failures: u64,
}

#[instrument(skip(handler, rx), fields(root = %handler.root()), name = "job_config_listener")]
pub(crate) async fn run(
    handler: Arc<JobConfigHandler>,
    mut rx: mpsc::UnboundedReceiver<ChangeNotification>,
) -> WorkerStats {
    info!("Job configuration listener worker started");
    let mut stats = WorkerStats::default();

    while let Some(notification) = rx.recv().await {
        stats.notifications += 1;
        process(&handler, &notification, &mut stats).await;
    }

    info!(
        notifications = stats.notifications,
        decode_failures = stats.decode_failures,
        dispatch_failures = stats.dispatch_failures,
        "Job configuration listener worker stopped"
    );
    stats
}

async fn process(
    handler: &JobConfigHandler,
    notification: &ChangeNotification,
    stats: &mut WorkerStats,
) {
    // A panic inside a collaborator must not end the worker, or every later
    // notification would be silently dropped.
    let result = AssertUnwindSafe(handler.handle(notification))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(outcome)) => {
            match outcome {
                HandleOutcome::Ignored => stats.ignored += 1,
                HandleOutcome::DecodeFailed => stats.decode_failures += 1,
                _ => {}
            }
            debug!(path = %notification.path, ?outcome, "Notification handled");
        }
        Ok(Err(e)) => {
            stats.dispatch_failures += 1;
            error!(
                path = %notification.path,
                change_type = %notification.change_type,
                error = %e,
                error_detail = ?e,
                "Failed to dispatch job configuration change"
            );
        }
        Err(panic) => {
            stats.dispatch_failures += 1;
            error!(
                path = %notification.path,
                change_type = %notification.change_type,
                panic = panic_message(panic.as_ref()),
                "Job configuration change handler panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
