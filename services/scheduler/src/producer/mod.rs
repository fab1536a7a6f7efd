//! Producer manager.
//!
//! The producer manager owns the active schedule of every job:
//! - Transient jobs get a trigger entry keyed by job name
//! - Daemon and one-off jobs are placed on the ready queue once
//!
//! Every operation is keyed by job name and idempotent; repeating a command
//! overwrites the previous schedule for that job.

mod manager;

pub use manager::{ProducerManager, ScheduledJob};

use async_trait::async_trait;
use cloudjob_config::CloudJobConfiguration;

use crate::error::SchedulerResult;

/// Scheduling commands the job configuration listener issues.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Put a job on the active schedule.
    async fn schedule(&self, config: &CloudJobConfiguration) -> SchedulerResult<()>;

    /// Replace a job's schedule with one built from its stored configuration.
    async fn reschedule(&self, job_name: &str) -> SchedulerResult<()>;

    /// Take a job off the active schedule.
    async fn unschedule(&self, job_name: &str) -> SchedulerResult<()>;
}
