//! Job configuration storage.
//!
//! Configurations live at `<root>/<job_name>` as JSON payloads.

use std::sync::Arc;

use bytes::Bytes;
use cloudjob_config::CloudJobConfiguration;
use cloudjob_registry::{child_path, CoordinatorRegistryCenter};
use tracing::{info, warn};

use crate::error::{SchedulerError, SchedulerResult};

/// Reads and writes job configurations in the registry.
#[derive(Clone)]
pub struct JobConfigStore {
    registry: Arc<dyn CoordinatorRegistryCenter>,
    root: String,
}

impl JobConfigStore {
    pub fn new(registry: Arc<dyn CoordinatorRegistryCenter>, root: impl Into<String>) -> Self {
        Self {
            registry,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Node path for a job's configuration.
    pub fn path_for(&self, job_name: &str) -> String {
        child_path(&self.root, job_name)
    }

    /// Store a new configuration. Fails if one already exists.
    pub async fn add(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        let path = self.path_for(&config.job_name);
        if self.registry.is_existed(&path).await? {
            return Err(SchedulerError::JobConflict(config.job_name.clone()));
        }
        self.write(&path, config).await?;
        info!(job_name = %config.job_name, "Job configuration added");
        Ok(())
    }

    /// Overwrite an existing configuration. Fails if none exists.
    pub async fn update(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        let path = self.path_for(&config.job_name);
        if !self.registry.is_existed(&path).await? {
            return Err(SchedulerError::JobNotFound(config.job_name.clone()));
        }
        self.write(&path, config).await?;
        info!(job_name = %config.job_name, "Job configuration updated");
        Ok(())
    }

    /// Delete a configuration. Missing jobs are a no-op.
    pub async fn remove(&self, job_name: &str) -> SchedulerResult<()> {
        self.registry.remove(&self.path_for(job_name)).await?;
        info!(job_name, "Job configuration removed");
        Ok(())
    }

    /// Load and decode one configuration.
    pub async fn load(&self, job_name: &str) -> SchedulerResult<Option<CloudJobConfiguration>> {
        match self.registry.get(&self.path_for(job_name)).await? {
            Some(data) => Ok(Some(cloudjob_config::decode(&data)?)),
            None => Ok(None),
        }
    }

    /// Load every decodable configuration. Undecodable ones are skipped with a warning.
    pub async fn load_all(&self) -> SchedulerResult<Vec<CloudJobConfiguration>> {
        let mut result = Vec::new();
        for job_name in self.registry.get_children_keys(&self.root).await? {
            match self.load(&job_name).await {
                Ok(Some(config)) => result.push(config),
                Ok(None) => {}
                Err(e) => {
                    warn!(job_name = %job_name, error = %e, "Skipping undecodable job configuration");
                }
            }
        }
        Ok(result)
    }

    async fn write(&self, path: &str, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        let payload = cloudjob_config::encode(config)?;
        self.registry.persist(path, Bytes::from(payload)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudjob_config::CloudJobExecutionType;
    use cloudjob_registry::InMemoryRegistry;

    fn store() -> (Arc<InMemoryRegistry>, JobConfigStore) {
        let registry = Arc::new(InMemoryRegistry::new());
        let store = JobConfigStore::new(registry.clone(), "/config/job");
        (registry, store)
    }

    #[tokio::test]
    async fn test_add_then_load() {
        let (_, store) = store();
        let config = CloudJobConfiguration::new("daemon-1", CloudJobExecutionType::Daemon);
        store.add(&config).await.unwrap();
        assert_eq!(store.load("daemon-1").await.unwrap(), Some(config));
    }

    #[tokio::test]
    async fn test_add_twice_conflicts() {
        let (_, store) = store();
        let config = CloudJobConfiguration::new("daemon-1", CloudJobExecutionType::Daemon);
        store.add(&config).await.unwrap();
        assert!(matches!(
            store.add(&config).await,
            Err(SchedulerError::JobConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_job() {
        let (_, store) = store();
        let config = CloudJobConfiguration::new("ghost", CloudJobExecutionType::OneOff);
        assert!(matches!(
            store.update(&config).await,
            Err(SchedulerError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_all_skips_garbage() {
        let (registry, store) = store();
        store
            .add(&CloudJobConfiguration::new("good", CloudJobExecutionType::OneOff))
            .await
            .unwrap();
        registry
            .persist("/config/job/bad", Bytes::from_static(b"{not json"))
            .await
            .unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].job_name, "good");
    }
}
