//! Job configuration listener.
//!
//! Watches the job configuration subtree of the registry and keeps the
//! producer manager and ready queue in line with it:
//!
//! - a job node added under the root is scheduled
//! - a job node updated under the root is rescheduled, after the ready queue
//!   has been brought in line with the new configuration
//! - a job node removed from under the root is unscheduled
//!
//! The listener holds no scheduling state of its own; it owns only its
//! subscription to the tree cache and the worker task that consumes it.

mod classify;
mod dispatch;
mod worker;

pub use classify::{classify, job_name_from_path, JobConfigEvent};
pub use dispatch::{decode_job_config, HandleOutcome, JobConfigHandler};
pub use worker::WorkerStats;

use std::sync::Arc;

use cloudjob_registry::{CoordinatorRegistryCenter, ListenerId, RegistryError, TreeCache};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::producer::JobDispatcher;
use crate::ready::ReadyQueue;

/// Errors surfaced by [`JobConfigListener::start`] and [`JobConfigListener::stop`].
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The registry did not produce a tree cache for the root.
    #[error("tree cache for '{0}' is unavailable")]
    CacheUnavailable(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The worker task ended abnormally.
    #[error("listener worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

struct Subscription {
    cache: Arc<TreeCache>,
    listener_id: ListenerId,
    worker: JoinHandle<WorkerStats>,
}

impl Subscription {
    /// False once the cache has dropped the registration (eviction, registry
    /// close) or the worker has exited.
    fn is_attached(&self) -> bool {
        !self.worker.is_finished() && self.cache.has_listener(self.listener_id)
    }
}

/// Subscribes a [`JobConfigHandler`] to the job configuration tree cache.
pub struct JobConfigListener {
    registry: Arc<dyn CoordinatorRegistryCenter>,
    handler: Arc<JobConfigHandler>,
    subscription: Mutex<Option<Subscription>>,
}

impl JobConfigListener {
    pub fn new(
        registry: Arc<dyn CoordinatorRegistryCenter>,
        root: impl Into<String>,
        ready: Arc<dyn ReadyQueue>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            registry,
            handler: Arc::new(JobConfigHandler::new(root, ready, dispatcher)),
            subscription: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &str {
        self.handler.root()
    }

    /// Attach to the tree cache and start the worker.
    ///
    /// Starting an already started listener logs a warning and does nothing;
    /// there is never more than one subscription per listener. A subscription
    /// the registry has dropped since the last start is reaped and replaced.
    pub async fn start(&self) -> Result<(), ListenerError> {
        let mut subscription = self.subscription.lock().await;
        if let Some(current) = subscription.as_ref() {
            if current.is_attached() {
                warn!(root = %self.root(), "Job configuration listener already started");
                return Ok(());
            }
        }
        if let Some(stale) = subscription.take() {
            self.reap(stale).await;
        }

        let cache = self.get_cache().await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(worker::run(self.handler.clone(), rx));
        let listener_id = cache.add_listener(tx);

        info!(root = %self.root(), listener_id = %listener_id, "Job configuration listener started");
        *subscription = Some(Subscription {
            cache,
            listener_id,
            worker,
        });
        Ok(())
    }

    /// Detach from the tree cache.
    ///
    /// The cache itself is left registered. Notifications already handed to
    /// the worker are still processed; this returns once the worker is done.
    /// Stopping a stopped listener is a no-op.
    pub async fn stop(&self) -> Result<Option<WorkerStats>, ListenerError> {
        let Some(Subscription {
            cache,
            listener_id,
            worker,
        }) = self.subscription.lock().await.take()
        else {
            return Ok(None);
        };

        if !cache.remove_listener(listener_id) {
            warn!(
                root = %self.root(),
                listener_id = %listener_id,
                "Listener was already detached from the tree cache"
            );
        }
        let stats = worker.await?;
        info!(root = %self.root(), notifications = stats.notifications, "Job configuration listener stopped");
        Ok(Some(stats))
    }

    /// True while the listener is attached to a live tree cache.
    pub async fn is_started(&self) -> bool {
        self.subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(Subscription::is_attached)
    }

    async fn reap(&self, stale: Subscription) {
        stale.cache.remove_listener(stale.listener_id);
        match stale.worker.await {
            Ok(stats) => warn!(
                root = %self.root(),
                listener_id = %stale.listener_id,
                notifications = stats.notifications,
                "Tree cache dropped the listener, re-attaching"
            ),
            Err(e) => error!(
                root = %self.root(),
                listener_id = %stale.listener_id,
                error = %e,
                "Listener worker failed, re-attaching"
            ),
        }
    }

    /// Look up the tree cache for the root, registering it on first use.
    async fn get_cache(&self) -> Result<Arc<TreeCache>, ListenerError> {
        if let Some(cache) = self.registry.get_raw_cache(self.root()) {
            return Ok(cache);
        }
        self.registry.add_cache_data(self.root()).await?;
        self.registry
            .get_raw_cache(self.root())
            .ok_or_else(|| ListenerError::CacheUnavailable(self.root().to_string()))
    }
}
