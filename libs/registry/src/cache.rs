//! Watched subtree caches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Kind of change observed on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Node was created.
    Added,
    /// Node data was overwritten.
    Updated,
    /// Node was deleted.
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeType::Added => "added",
            ChangeType::Updated => "updated",
            ChangeType::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// A change delivered by a tree cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    /// Fully qualified node path.
    pub path: String,

    pub change_type: ChangeType,

    /// Node data after the change. For removals this is the last known data,
    /// which may be absent.
    pub data: Option<Bytes>,
}

impl ChangeNotification {
    pub fn new(path: impl Into<String>, change_type: ChangeType, data: Option<Bytes>) -> Self {
        Self {
            path: path.into(),
            change_type,
            data,
        }
    }
}

/// Identifier returned by [`TreeCache::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

#[derive(Debug)]
struct Listener {
    id: ListenerId,
    sender: mpsc::UnboundedSender<ChangeNotification>,
}

/// A watched subtree rooted at a fixed path.
///
/// Listeners are channel senders; each listener consumes its notifications on
/// its own task, so publishing never waits on a slow consumer.
#[derive(Debug)]
pub struct TreeCache {
    root: String,
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl TreeCache {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The root path of this cache.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns true if `path` is the root or lies below it.
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Register a listener. Every registration gets its own id, so adding the
    /// same consumer twice yields two independent subscriptions.
    pub fn add_listener(&self, sender: mpsc::UnboundedSender<ChangeNotification>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push(Listener { id, sender });
        debug!(root = %self.root, listener_id = %id, "Tree cache listener added");
        id
    }

    /// Deregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock_listeners();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        let removed = listeners.len() != before;
        debug!(root = %self.root, listener_id = %id, removed, "Tree cache listener removed");
        removed
    }

    /// Returns true while the listener is still registered. Evicting the
    /// cache or closing the registry drops every registration.
    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.lock_listeners().iter().any(|l| l.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    /// Deliver a notification to every live listener.
    ///
    /// Listeners whose receiving side has gone away are pruned.
    pub fn publish(&self, notification: &ChangeNotification) {
        let mut listeners = self.lock_listeners();
        listeners.retain(|l| {
            let delivered = l.sender.send(notification.clone()).is_ok();
            if !delivered {
                trace!(listener_id = %l.id, "Pruning closed tree cache listener");
            }
            delivered
        });
    }

    /// Drop every listener, closing their channels.
    pub fn clear_listeners(&self) {
        self.lock_listeners().clear();
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/config/job", true)]
    #[case("/config/job/a", true)]
    #[case("/config/job/a/b", true)]
    #[case("/config/jobs", false)]
    #[case("/config", false)]
    #[case("/state/ready/a", false)]
    fn test_covers(#[case] path: &str, #[case] expected: bool) {
        let cache = TreeCache::new("/config/job");
        assert_eq!(cache.covers(path), expected);
    }

    #[tokio::test]
    async fn test_publish_reaches_all_listeners() {
        let cache = TreeCache::new("/r");
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        cache.add_listener(tx1);
        cache.add_listener(tx2);

        let n = ChangeNotification::new("/r/a", ChangeType::Added, None);
        cache.publish(&n);

        assert_eq!(rx1.recv().await.unwrap(), n);
        assert_eq!(rx2.recv().await.unwrap(), n);
    }

    #[test]
    fn test_remove_listener() {
        let cache = TreeCache::new("/r");
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = cache.add_listener(tx);
        assert_eq!(cache.listener_count(), 1);
        assert!(cache.has_listener(id));
        assert!(cache.remove_listener(id));
        assert!(!cache.has_listener(id));
        assert!(!cache.remove_listener(id));
        assert_eq!(cache.listener_count(), 0);
    }

    #[test]
    fn test_clear_listeners_drops_registrations() {
        let cache = TreeCache::new("/r");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = cache.add_listener(tx);
        cache.clear_listeners();
        assert!(!cache.has_listener(id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_prunes_closed_listeners() {
        let cache = TreeCache::new("/r");
        let (tx, rx) = mpsc::unbounded_channel();
        cache.add_listener(tx);
        drop(rx);
        cache.publish(&ChangeNotification::new("/r/a", ChangeType::Removed, None));
        assert_eq!(cache.listener_count(), 0);
    }

    #[test]
    fn test_duplicate_registration_gets_distinct_ids() {
        let cache = TreeCache::new("/r");
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = cache.add_listener(tx.clone());
        let b = cache.add_listener(tx);
        assert_ne!(a, b);
        assert_eq!(cache.listener_count(), 2);
    }
}
