//! Process-local registry with tree cache support.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::{
    ChangeNotification, ChangeType, CoordinatorRegistryCenter, RegistryError, RegistryResult,
    TreeCache,
};

/// In-memory registry.
///
/// Writes are applied and published under one lock, so every tree cache sees
/// the changes for a path in the order they were made.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    nodes: Mutex<BTreeMap<String, Bytes>>,
    caches: Mutex<HashMap<String, Arc<TreeCache>>>,
    closed: AtomicBool,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the registry. Subsequent operations fail with
    /// [`RegistryError::Closed`] and all cache listeners are dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let caches: Vec<_> = self.lock_caches().drain().map(|(_, c)| c).collect();
        for cache in caches {
            cache.clear_listeners();
        }
        info!("In-memory registry closed");
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RegistryError::Closed);
        }
        Ok(())
    }

    fn lock_nodes(&self) -> MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_caches(&self) -> MutexGuard<'_, HashMap<String, Arc<TreeCache>>> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, notification: ChangeNotification) {
        let caches: Vec<_> = self
            .lock_caches()
            .values()
            .filter(|c| c.covers(&notification.path))
            .cloned()
            .collect();
        for cache in caches {
            cache.publish(&notification);
        }
    }
}

/// Validate an absolute node path and return it without a trailing slash.
fn normalize(key: &str) -> RegistryResult<&str> {
    let trimmed = if key.len() > 1 {
        key.trim_end_matches('/')
    } else {
        key
    };
    if !trimmed.starts_with('/') || trimmed.len() < 2 || trimmed[1..].split('/').any(str::is_empty)
    {
        return Err(RegistryError::InvalidPath(key.to_string()));
    }
    Ok(trimmed)
}

/// Ancestors of `key`, outermost first, excluding `key` itself.
fn ancestors(key: &str) -> Vec<&str> {
    key.match_indices('/')
        .skip(1)
        .map(|(idx, _)| &key[..idx])
        .collect()
}

fn is_descendant_or_self(candidate: &str, key: &str) -> bool {
    match candidate.strip_prefix(key) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[async_trait]
impl CoordinatorRegistryCenter for InMemoryRegistry {
    async fn get(&self, key: &str) -> RegistryResult<Option<Bytes>> {
        self.ensure_open()?;
        let key = normalize(key)?;
        Ok(self.lock_nodes().get(key).cloned())
    }

    async fn is_existed(&self, key: &str) -> RegistryResult<bool> {
        self.ensure_open()?;
        let key = normalize(key)?;
        Ok(self.lock_nodes().contains_key(key))
    }

    async fn persist(&self, key: &str, value: Bytes) -> RegistryResult<()> {
        self.ensure_open()?;
        let key = normalize(key)?;
        let mut nodes = self.lock_nodes();

        for ancestor in ancestors(key) {
            if !nodes.contains_key(ancestor) {
                nodes.insert(ancestor.to_string(), Bytes::new());
                self.publish(ChangeNotification::new(
                    ancestor,
                    ChangeType::Added,
                    Some(Bytes::new()),
                ));
            }
        }

        let change_type = match nodes.insert(key.to_string(), value.clone()) {
            Some(_) => ChangeType::Updated,
            None => ChangeType::Added,
        };
        debug!(key, %change_type, "Persisted registry node");
        self.publish(ChangeNotification::new(key, change_type, Some(value)));
        Ok(())
    }

    async fn remove(&self, key: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        let key = normalize(key)?;
        let mut nodes = self.lock_nodes();

        let doomed: Vec<String> = nodes
            .range(key.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(key))
            .filter(|k| is_descendant_or_self(k, key))
            .cloned()
            .collect();

        // Children sort after their parent, so reverse order removes leaves first.
        for path in doomed.into_iter().rev() {
            let data = nodes.remove(&path);
            debug!(key = %path, "Removed registry node");
            self.publish(ChangeNotification::new(path, ChangeType::Removed, data));
        }
        Ok(())
    }

    async fn get_children_keys(&self, key: &str) -> RegistryResult<Vec<String>> {
        self.ensure_open()?;
        let key = normalize(key)?;
        let prefix = format!("{}/", key);
        let nodes = self.lock_nodes();
        Ok(nodes
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
            .filter_map(|k| {
                let rest = &k[prefix.len()..];
                (!rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }

    fn get_raw_cache(&self, root: &str) -> Option<Arc<TreeCache>> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        let root = normalize(root).ok()?;
        self.lock_caches().get(root).cloned()
    }

    async fn add_cache_data(&self, root: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        let root = normalize(root)?;
        self.lock_caches()
            .entry(root.to_string())
            .or_insert_with(|| {
                info!(root, "Registered tree cache");
                Arc::new(TreeCache::new(root))
            });
        Ok(())
    }

    async fn evict_cache_data(&self, root: &str) -> RegistryResult<()> {
        self.ensure_open()?;
        let root = normalize(root)?;
        if let Some(cache) = self.lock_caches().remove(root) {
            cache.clear_listeners();
            info!(root, "Evicted tree cache");
        }
        Ok(())
    }
}
