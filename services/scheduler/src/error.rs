//! Scheduler error types.

use cloudjob_config::DecodeError;
use cloudjob_registry::RegistryError;
use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors raised by the ready queue, producer manager and job store.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Registry operation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A stored job configuration could not be decoded.
    #[error("job configuration error: {0}")]
    Decode(#[from] DecodeError),

    /// A ready queue node holds data that is not a ready entry.
    #[error("ready queue entry for job '{job_name}' is corrupt: {source}")]
    CorruptReadyEntry {
        job_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A job configuration with this name already exists.
    #[error("job configuration already exists: {0}")]
    JobConflict(String),

    /// No job configuration with this name exists.
    #[error("job configuration not found: {0}")]
    JobNotFound(String),
}
