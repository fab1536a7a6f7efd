use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use cloudjob_config::{CloudJobConfiguration, CloudJobExecutionType};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::SchedulerResult;
use crate::job_store::JobConfigStore;
use crate::ready::{ReadyQueue, ReadyService};

use super::JobDispatcher;

/// An entry on the active schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub execution_type: CloudJobExecutionType,
    /// Trigger expression, for transient jobs.
    pub cron: Option<String>,
}

impl From<&CloudJobConfiguration> for ScheduledJob {
    fn from(config: &CloudJobConfiguration) -> Self {
        Self {
            execution_type: config.job_execution_type,
            cron: config.cron.clone(),
        }
    }
}

/// Producer manager backed by the job configuration store and ready queue.
pub struct ProducerManager {
    job_store: JobConfigStore,
    ready: Arc<ReadyService>,
    schedules: RwLock<BTreeMap<String, ScheduledJob>>,
}

impl ProducerManager {
    pub fn new(job_store: JobConfigStore, ready: Arc<ReadyService>) -> Self {
        Self {
            job_store,
            ready,
            schedules: RwLock::new(BTreeMap::new()),
        }
    }

    /// Schedule every job whose configuration is already stored.
    #[instrument(skip(self))]
    pub async fn startup(&self) -> SchedulerResult<usize> {
        let configs = self.job_store.load_all().await?;
        let total = configs.len();
        for config in &configs {
            self.schedule(config).await?;
        }
        info!(jobs = total, "Producer manager started");
        Ok(total)
    }

    /// Snapshot of the active schedule.
    pub async fn scheduled_jobs(&self) -> BTreeMap<String, ScheduledJob> {
        self.schedules.read().await.clone()
    }

    pub async fn is_scheduled(&self, job_name: &str) -> bool {
        self.schedules.read().await.contains_key(job_name)
    }

    /// Fire the trigger of a scheduled transient job, queueing one more run.
    ///
    /// The stored configuration decides whether missed runs pile up. Jobs
    /// without a transient trigger are skipped.
    #[instrument(skip(self))]
    pub async fn fire(&self, job_name: &str) -> SchedulerResult<()> {
        let has_trigger = matches!(
            self.schedules.read().await.get(job_name),
            Some(job) if job.execution_type == CloudJobExecutionType::Transient
        );
        if !has_trigger {
            debug!("No transient trigger for job");
            return Ok(());
        }
        match self.job_store.load(job_name).await? {
            Some(config) => self.ready.add_transient(&config).await,
            None => {
                warn!("Job configuration gone, skipping trigger");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl JobDispatcher for ProducerManager {
    #[instrument(skip(self, config), fields(job_name = %config.job_name, execution_type = %config.job_execution_type))]
    async fn schedule(&self, config: &CloudJobConfiguration) -> SchedulerResult<()> {
        match config.job_execution_type {
            CloudJobExecutionType::Transient => {
                debug!(cron = ?config.cron, "Registering transient trigger");
            }
            CloudJobExecutionType::Daemon | CloudJobExecutionType::OneOff => {
                self.ready.add_once(config).await?;
            }
        }
        self.schedules
            .write()
            .await
            .insert(config.job_name.clone(), ScheduledJob::from(config));
        info!("Job scheduled");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reschedule(&self, job_name: &str) -> SchedulerResult<()> {
        self.unschedule(job_name).await?;
        match self.job_store.load(job_name).await? {
            Some(config) => self.schedule(&config).await,
            None => {
                warn!("Job configuration gone, leaving job unscheduled");
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    async fn unschedule(&self, job_name: &str) -> SchedulerResult<()> {
        let removed = self.schedules.write().await.remove(job_name).is_some();
        self.ready.remove(&[job_name.to_string()]).await?;
        if removed {
            info!("Job unscheduled");
        } else {
            debug!("Job was not scheduled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudjob_registry::InMemoryRegistry;

    struct Fixture {
        store: JobConfigStore,
        ready: Arc<ReadyService>,
        producer: ProducerManager,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(InMemoryRegistry::new());
        let store = JobConfigStore::new(registry.clone(), "/config/job");
        let ready = Arc::new(ReadyService::new(registry, "/state/ready", 100));
        let producer = ProducerManager::new(store.clone(), ready.clone());
        Fixture {
            store,
            ready,
            producer,
        }
    }

    fn transient(name: &str) -> CloudJobConfiguration {
        CloudJobConfiguration::new(name, CloudJobExecutionType::Transient).with_cron("0 * * * * ?")
    }

    #[tokio::test]
    async fn test_schedule_transient_registers_trigger_only() {
        let f = fixture();
        f.producer.schedule(&transient("t")).await.unwrap();

        let jobs = f.producer.scheduled_jobs().await;
        assert_eq!(jobs["t"].cron.as_deref(), Some("0 * * * * ?"));
        assert!(f.ready.load("t").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schedule_daemon_queues_once() {
        let f = fixture();
        let daemon = CloudJobConfiguration::new("d", CloudJobExecutionType::Daemon);
        f.producer.schedule(&daemon).await.unwrap();
        f.producer.schedule(&daemon).await.unwrap();

        assert_eq!(f.ready.load("d").await.unwrap().unwrap().times, 1);
        assert!(f.producer.is_scheduled("d").await);
    }

    #[tokio::test]
    async fn test_unschedule_twice_matches_once() {
        let f = fixture();
        let daemon = CloudJobConfiguration::new("d", CloudJobExecutionType::Daemon);
        f.producer.schedule(&daemon).await.unwrap();

        f.producer.unschedule("d").await.unwrap();
        let once = (f.producer.scheduled_jobs().await, f.ready.get_all_ready_tasks().await.unwrap());
        f.producer.unschedule("d").await.unwrap();
        let twice = (f.producer.scheduled_jobs().await, f.ready.get_all_ready_tasks().await.unwrap());

        assert_eq!(once, twice);
        assert!(once.0.is_empty());
        assert!(once.1.is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_picks_up_stored_configuration() {
        let f = fixture();
        f.store.add(&transient("t")).await.unwrap();
        f.producer.schedule(&transient("t")).await.unwrap();

        f.store
            .update(&transient("t").with_cron("0 0 12 * * ?"))
            .await
            .unwrap();
        f.producer.reschedule("t").await.unwrap();

        assert_eq!(
            f.producer.scheduled_jobs().await["t"].cron.as_deref(),
            Some("0 0 12 * * ?")
        );
    }

    #[tokio::test]
    async fn test_reschedule_without_configuration_unschedules() {
        let f = fixture();
        f.producer.schedule(&transient("t")).await.unwrap();
        f.producer.reschedule("t").await.unwrap();
        assert!(!f.producer.is_scheduled("t").await);
    }

    #[tokio::test]
    async fn test_fire_queues_transient_runs() {
        let f = fixture();
        f.store.add(&transient("t")).await.unwrap();
        f.producer.schedule(&transient("t")).await.unwrap();

        f.producer.fire("t").await.unwrap();
        f.producer.fire("t").await.unwrap();
        assert_eq!(f.ready.load("t").await.unwrap().unwrap().times, 2);
    }

    #[tokio::test]
    async fn test_fire_with_misfire_disabled_keeps_one_run() {
        let f = fixture();
        let config = transient("t").with_misfire(false);
        f.store.add(&config).await.unwrap();
        f.producer.schedule(&config).await.unwrap();

        for _ in 0..3 {
            f.producer.fire("t").await.unwrap();
        }
        let entry = f.ready.load("t").await.unwrap().unwrap();
        assert_eq!(entry.times, 1);
        assert!(entry.misfire_disabled);
    }

    #[tokio::test]
    async fn test_fire_skips_jobs_without_transient_trigger() {
        let f = fixture();
        let daemon = CloudJobConfiguration::new("d", CloudJobExecutionType::Daemon);
        f.store.add(&daemon).await.unwrap();
        f.producer.schedule(&daemon).await.unwrap();

        f.producer.fire("d").await.unwrap();
        f.producer.fire("unknown").await.unwrap();
        assert_eq!(f.ready.load("d").await.unwrap().unwrap().times, 1);
        assert!(f.ready.load("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reschedule_carries_misfire_setting_into_ready_queue() {
        let f = fixture();
        let daemon = CloudJobConfiguration::new("d", CloudJobExecutionType::Daemon);
        f.store.add(&daemon).await.unwrap();
        f.producer.schedule(&daemon).await.unwrap();

        f.store.update(&daemon.with_misfire(false)).await.unwrap();
        f.producer.reschedule("d").await.unwrap();

        assert!(f.ready.load("d").await.unwrap().unwrap().misfire_disabled);
    }

    #[tokio::test]
    async fn test_startup_schedules_stored_jobs() {
        let f = fixture();
        f.store.add(&transient("a")).await.unwrap();
        f.store
            .add(&CloudJobConfiguration::new("b", CloudJobExecutionType::Daemon))
            .await
            .unwrap();

        assert_eq!(f.producer.startup().await.unwrap(), 2);
        assert!(f.producer.is_scheduled("a").await);
        assert!(f.producer.is_scheduled("b").await);
        assert!(f.ready.load("b").await.unwrap().is_some());
    }
}
