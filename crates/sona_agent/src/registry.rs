//! Subscription registry.

use parking_lot::RwLock;
use std::collections::HashMap;

/// The agent's set of subscribed service keys and the version held for each.
///
/// The driver only reads it. Implementations must tolerate concurrent reads
/// while subscription management code mutates them.
pub trait SubscriptionRegistry: Send + Sync {
    /// Returns a snapshot of every tracked key and its last known version.
    fn all_tracked(&self) -> HashMap<String, u64>;
}

/// An in-memory subscription registry.
#[derive(Debug, Default)]
pub struct MemorySubscriptionRegistry {
    tracked: RwLock<HashMap<String, u64>>,
}

impl MemorySubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a key at the given version.
    ///
    /// Returns false if the key was already tracked; its version is replaced.
    pub fn track(&self, service_key: impl Into<String>, version: u64) -> bool {
        self.tracked
            .write()
            .insert(service_key.into(), version)
            .is_none()
    }

    /// Stops tracking a key, returning the version it was at.
    pub fn untrack(&self, service_key: &str) -> Option<u64> {
        self.tracked.write().remove(service_key)
    }

    /// Records a newly received version for a tracked key.
    ///
    /// Returns false if the key is not tracked.
    pub fn set_version(&self, service_key: &str, version: u64) -> bool {
        match self.tracked.write().get_mut(service_key) {
            Some(current) => {
                *current = version;
                true
            }
            None => false,
        }
    }

    /// Returns the version held for a key.
    pub fn version(&self, service_key: &str) -> Option<u64> {
        self.tracked.read().get(service_key).copied()
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.tracked.read().len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracked.read().is_empty()
    }
}

impl SubscriptionRegistry for MemorySubscriptionRegistry {
    fn all_tracked(&self) -> HashMap<String, u64> {
        self.tracked.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_untrack() {
        let registry = MemorySubscriptionRegistry::new();
        assert!(registry.track("svcA", 3));
        assert!(!registry.track("svcA", 4));
        assert_eq!(registry.version("svcA"), Some(4));

        assert_eq!(registry.untrack("svcA"), Some(4));
        assert!(registry.is_empty());
    }

    #[test]
    fn set_version_requires_tracking() {
        let registry = MemorySubscriptionRegistry::new();
        assert!(!registry.set_version("svcA", 1));

        registry.track("svcA", 0);
        assert!(registry.set_version("svcA", 1));
        assert_eq!(registry.version("svcA"), Some(1));
    }

    #[test]
    fn snapshot_is_detached() {
        let registry = MemorySubscriptionRegistry::new();
        registry.track("svcA", 3);
        let snapshot = registry.all_tracked();

        registry.track("svcB", 7);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.all_tracked().len(), 2);
    }
}
