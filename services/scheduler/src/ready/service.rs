//! Registry-backed ready queue.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cloudjob_config::CloudJobConfiguration;
use cloudjob_registry::{child_path, CoordinatorRegistryCenter};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{SchedulerError, SchedulerResult};

use super::ReadyQueue;

/// Data stored for a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyEntry {
    /// Number of pending runs.
    pub times: u32,

    /// When set, missed fires collapse into a single pending run.
    #[serde(default)]
    pub misfire_disabled: bool,
}

/// Ready queue stored under a registry root.
pub struct ReadyService {
    registry: Arc<dyn CoordinatorRegistryCenter>,
    root: String,
    max_queue_size: usize,
}

impl ReadyService {
    pub fn new(
        registry: Arc<dyn CoordinatorRegistryCenter>,
        root: impl Into<String>,
        max_queue_size: usize,
    ) -> Self {
        Self {
            registry,
            root: root.into(),
            max_queue_size,
        }
    }

    /// Queue one more run of a transient job.
    ///
    /// With misfire disabled in the job's configuration an already queued
    /// job keeps a single pending run.
    #[instrument(skip(self, config), fields(job_name = %config.job_name))]
    pub async fn add_transient(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        let misfire_disabled = !config.misfire;
        let entry = match self.load(&config.job_name).await? {
            Some(_) if misfire_disabled => ReadyEntry {
                times: 1,
                misfire_disabled,
            },
            Some(entry) => ReadyEntry {
                times: entry.times.saturating_add(1),
                misfire_disabled,
            },
            None => {
                if self.is_full().await? {
                    warn!(
                        max_queue_size = self.max_queue_size,
                        "Ready queue is full, dropping transient run"
                    );
                    return Ok(());
                }
                ReadyEntry {
                    times: 1,
                    misfire_disabled,
                }
            }
        };
        self.store(&config.job_name, &entry).await
    }

    /// Queue a job exactly once. Already queued jobs are left untouched.
    #[instrument(skip(self, config), fields(job_name = %config.job_name))]
    pub async fn add_once(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        if self.load(&config.job_name).await?.is_some() {
            debug!("Job already queued");
            return Ok(());
        }
        if self.is_full().await? {
            warn!(
                max_queue_size = self.max_queue_size,
                "Ready queue is full, not queueing job"
            );
            return Ok(());
        }
        self.store(
            &config.job_name,
            &ReadyEntry {
                times: 1,
                misfire_disabled: !config.misfire,
            },
        )
        .await
    }

    /// Pending run count of every queued job.
    pub async fn get_all_ready_tasks(&self) -> SchedulerResult<BTreeMap<String, u32>> {
        let mut result = BTreeMap::new();
        for job_name in self.registry.get_children_keys(&self.root).await? {
            if let Some(entry) = self.load(&job_name).await? {
                result.insert(job_name, entry.times);
            }
        }
        Ok(result)
    }

    /// Read the entry for one job.
    pub async fn load(&self, job_name: &str) -> SchedulerResult<Option<ReadyEntry>> {
        match self.registry.get(&self.path_for(job_name)).await? {
            Some(data) => serde_json::from_slice(&data).map(Some).map_err(|source| {
                SchedulerError::CorruptReadyEntry {
                    job_name: job_name.to_string(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    async fn store(&self, job_name: &str, entry: &ReadyEntry) -> SchedulerResult<()> {
        let payload = serde_json::to_vec(entry).map_err(|source| {
            SchedulerError::CorruptReadyEntry {
                job_name: job_name.to_string(),
                source,
            }
        })?;
        self.registry
            .persist(&self.path_for(job_name), Bytes::from(payload))
            .await?;
        debug!(job_name, times = entry.times, "Ready entry stored");
        Ok(())
    }

    async fn is_full(&self) -> SchedulerResult<bool> {
        let queued = self.registry.get_children_keys(&self.root).await?.len();
        Ok(queued >= self.max_queue_size)
    }

    fn path_for(&self, job_name: &str) -> String {
        child_path(&self.root, job_name)
    }
}

#[async_trait]
impl ReadyQueue for ReadyService {
    #[instrument(skip(self))]
    async fn remove(&self, job_names: &[String]) -> SchedulerResult<()> {
        for job_name in job_names {
            self.registry.remove(&self.path_for(job_name)).await?;
        }
        debug!(count = job_names.len(), "Removed jobs from ready queue");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_misfire_disabled(&self, job_name: &str) -> SchedulerResult<()> {
        let Some(entry) = self.load(job_name).await? else {
            debug!("Job not queued, nothing to collapse");
            return Ok(());
        };
        let collapsed = ReadyEntry {
            times: 1,
            misfire_disabled: true,
        };
        if entry != collapsed {
            self.store(job_name, &collapsed).await?;
        }
        Ok(())
    }
}
