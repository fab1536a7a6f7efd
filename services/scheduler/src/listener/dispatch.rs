//! Command dispatch for classified job configuration events.

use std::sync::Arc;

use bytes::Bytes;
use cloudjob_config::{CloudJobConfiguration, DecodeError};
use cloudjob_registry::ChangeNotification;
use tracing::{debug, info, warn};

use crate::error::SchedulerResult;
use crate::producer::JobDispatcher;
use crate::ready::ReadyQueue;

use super::classify::{classify, JobConfigEvent};

/// What handling a notification amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The notification does not name a job under the root.
    Ignored,
    /// The payload could not be decoded; nothing was dispatched.
    DecodeFailed,
    Scheduled,
    Rescheduled,
    Unscheduled,
}

/// Turns job configuration notifications into ready queue and producer commands.
pub struct JobConfigHandler {
    root: String,
    ready: Arc<dyn ReadyQueue>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl JobConfigHandler {
    pub fn new(
        root: impl Into<String>,
        ready: Arc<dyn ReadyQueue>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            root: root.into(),
            ready,
            dispatcher,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Handle one notification.
    ///
    /// Decode failures are absorbed and reported as [`HandleOutcome::DecodeFailed`].
    /// A collaborator error stops the remaining commands for this notification
    /// and is returned to the caller.
    pub async fn handle(&self, notification: &ChangeNotification) -> SchedulerResult<HandleOutcome> {
        let Some(event) = classify(&self.root, notification) else {
            debug!(
                path = %notification.path,
                change_type = %notification.change_type,
                "Ignoring notification outside job configuration nodes"
            );
            return Ok(HandleOutcome::Ignored);
        };

        match event {
            JobConfigEvent::Added { job_name, data } => {
                let Some(config) = decode_logged(&notification.path, job_name, data) else {
                    return Ok(HandleOutcome::DecodeFailed);
                };
                self.dispatcher.schedule(&config).await?;
                info!(job_name = %config.job_name, "Scheduled added job");
                Ok(HandleOutcome::Scheduled)
            }
            JobConfigEvent::Updated { job_name, data } => {
                let Some(config) = decode_logged(&notification.path, job_name, data) else {
                    return Ok(HandleOutcome::DecodeFailed);
                };
                self.apply_update(&config).await?;
                Ok(HandleOutcome::Rescheduled)
            }
            JobConfigEvent::Removed { job_name } => {
                self.dispatcher.unschedule(job_name).await?;
                info!(job_name, "Unscheduled removed job");
                Ok(HandleOutcome::Unscheduled)
            }
        }
    }

    /// Update policy. The ready queue is brought in line before the producer
    /// sees the new configuration:
    /// 1. daemon jobs lose any queued run built from the old configuration
    /// 2. misfire is disabled if the new configuration forbids it
    /// 3. the job is rescheduled
    async fn apply_update(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        let job_name = config.job_name.as_str();
        if config.job_execution_type.is_daemon() {
            self.ready.remove(&[config.job_name.clone()]).await?;
            debug!(job_name, "Flushed queued daemon run");
        }
        if !config.misfire {
            self.ready.set_misfire_disabled(job_name).await?;
            debug!(job_name, "Disabled misfire");
        }
        self.dispatcher.reschedule(job_name).await?;
        info!(
            job_name,
            execution_type = %config.job_execution_type,
            misfire = config.misfire,
            "Rescheduled updated job"
        );
        Ok(())
    }
}

/// Decode a notification payload.
pub fn decode_job_config(data: Option<&Bytes>) -> Result<CloudJobConfiguration, DecodeError> {
    match data {
        Some(bytes) => cloudjob_config::decode(bytes),
        None => Err(DecodeError::Empty),
    }
}

fn decode_logged(path: &str, job_name: &str, data: Option<&Bytes>) -> Option<CloudJobConfiguration> {
    match decode_job_config(data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(
                path,
                job_name,
                error = %e,
                error_detail = ?e,
                "Wrong cloud job configuration, ignoring notification"
            );
            None
        }
    }
}
