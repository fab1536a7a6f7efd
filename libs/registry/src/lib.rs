//! Coordination registry primitives.
//!
//! The scheduler keeps job configuration and ready-queue state as nodes in a
//! hierarchical key-value registry. This crate defines:
//!
//! - **[`CoordinatorRegistryCenter`]**: the registry contract the scheduler
//!   depends on (node CRUD plus tree caches).
//! - **[`TreeCache`]**: a watched subtree that fans change notifications out
//!   to registered listeners.
//! - **[`InMemoryRegistry`]**: a process-local registry with the same watch
//!   semantics, used for development and tests.
//!
//! # Watch semantics
//!
//! - Notifications for a single path are delivered in write order
//! - Delivery is asynchronous: listeners receive notifications over a channel
//!   and consume them on their own task
//! - A listener may see the same logical change more than once across
//!   reconnects, so consumers must be idempotent

mod cache;
mod error;
mod memory;

pub use cache::{ChangeNotification, ChangeType, ListenerId, TreeCache};
pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryRegistry;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// Registry contract used by the scheduler.
#[async_trait]
pub trait CoordinatorRegistryCenter: Send + Sync {
    /// Read the data stored at `key`.
    async fn get(&self, key: &str) -> RegistryResult<Option<Bytes>>;

    /// Returns true if a node exists at `key`.
    async fn is_existed(&self, key: &str) -> RegistryResult<bool>;

    /// Create or overwrite the node at `key`, creating missing ancestors.
    async fn persist(&self, key: &str, value: Bytes) -> RegistryResult<()>;

    /// Remove the node at `key` and its descendants. Missing nodes are a no-op.
    async fn remove(&self, key: &str) -> RegistryResult<()>;

    /// Names (not full paths) of the direct children of `key`, sorted.
    async fn get_children_keys(&self, key: &str) -> RegistryResult<Vec<String>>;

    /// Look up the tree cache registered for `root`, if any.
    fn get_raw_cache(&self, root: &str) -> Option<Arc<TreeCache>>;

    /// Register a tree cache for `root`. Registering an existing root is a no-op.
    ///
    /// A registry backed by a remote store may not expose the cache through
    /// [`get_raw_cache`](Self::get_raw_cache) until it has been materialized.
    async fn add_cache_data(&self, root: &str) -> RegistryResult<()>;

    /// Drop the tree cache for `root` together with its listeners.
    async fn evict_cache_data(&self, root: &str) -> RegistryResult<()>;
}

/// Join a parent path and a child node name.
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("/config/job", "a"), "/config/job/a");
        assert_eq!(child_path("/config/job/", "a"), "/config/job/a");
    }
}
