//! Ready queue.
//!
//! The ready queue holds the jobs that are eligible for immediate dispatch to
//! the resource offer scheduler. Each queued job is one registry node at
//! `<ready_root>/<job_name>` carrying a [`ReadyEntry`].

mod service;

pub use service::{ReadyEntry, ReadyService};

use async_trait::async_trait;

use crate::error::SchedulerResult;

/// Ready queue operations the job configuration listener depends on.
///
/// Both operations are idempotent.
#[async_trait]
pub trait ReadyQueue: Send + Sync {
    /// Drop the given jobs from the queue. Names that are not queued are ignored.
    async fn remove(&self, job_names: &[String]) -> SchedulerResult<()>;

    /// Suppress misfire re-dispatch for a job.
    async fn set_misfire_disabled(&self, job_name: &str) -> SchedulerResult<()>;
}
