//! Scheduler services shared by the binary and integration tests.

use std::sync::Arc;

use cloudjob_registry::CoordinatorRegistryCenter;

use crate::config::Config;
use crate::job_store::JobConfigStore;
use crate::listener::JobConfigListener;
use crate::producer::ProducerManager;
use crate::ready::ReadyService;

/// Shared scheduler state.
///
/// Every service is built against the same explicitly passed registry, so
/// independent instances can run side by side against separate registries.
#[derive(Clone)]
pub struct SchedulerState {
    inner: Arc<SchedulerStateInner>,
}

struct SchedulerStateInner {
    registry: Arc<dyn CoordinatorRegistryCenter>,
    job_store: JobConfigStore,
    ready: Arc<ReadyService>,
    producer: Arc<ProducerManager>,
}

impl SchedulerState {
    /// Build the scheduler services on top of a registry.
    pub fn new(registry: Arc<dyn CoordinatorRegistryCenter>, config: &Config) -> Self {
        let job_store = JobConfigStore::new(registry.clone(), config.job_config_root.clone());
        let ready = Arc::new(ReadyService::new(
            registry.clone(),
            config.ready_root.clone(),
            config.ready_queue_size,
        ));
        let producer = Arc::new(ProducerManager::new(job_store.clone(), ready.clone()));
        Self {
            inner: Arc::new(SchedulerStateInner {
                registry,
                job_store,
                ready,
                producer,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<dyn CoordinatorRegistryCenter> {
        &self.inner.registry
    }

    pub fn job_store(&self) -> &JobConfigStore {
        &self.inner.job_store
    }

    pub fn ready(&self) -> &Arc<ReadyService> {
        &self.inner.ready
    }

    pub fn producer(&self) -> &Arc<ProducerManager> {
        &self.inner.producer
    }

    /// Create a job configuration listener wired to this state's ready queue
    /// and producer manager.
    pub fn job_config_listener(&self) -> JobConfigListener {
        JobConfigListener::new(
            self.inner.registry.clone(),
            self.inner.job_store.root().to_string(),
            self.inner.ready.clone(),
            self.inner.producer.clone(),
        )
    }
}
