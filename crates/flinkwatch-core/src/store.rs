//! Snapshot Store - folds change events into the current set of resources

use crate::event::ChangeEvent;
use crate::resource::{Resource, ResourceId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Effect of applying one change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Replaced,
    Removed,
    /// Removal of an id that was not present
    Unchanged,
}

/// Immutable view of the store at one instant
///
/// Cloning is an `Arc` clone; a snapshot never changes after it was taken.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Arc<HashMap<ResourceId, Arc<Resource>>>,
    revision: u64,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Increments on every mutation of the store, resets included
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Arc<Resource>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Find a resource by its human-facing key
    pub fn find(&self, namespace: &str, name: &str) -> Option<&Arc<Resource>> {
        self.entries
            .values()
            .find(|r| r.namespace() == namespace && r.name() == name)
    }

    /// Iterate in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Arc<Resource>)> {
        self.entries.iter()
    }

    /// All resources ordered by `namespace/name`
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        let mut resources: Vec<_> = self.entries.values().cloned().collect();
        resources.sort_by(|a, b| {
            (a.namespace(), a.name(), &a.metadata.uid).cmp(&(b.namespace(), b.name(), &b.metadata.uid))
        });
        resources
    }
}

/// The live mapping id → resource
///
/// Writers publish a new map on every mutation (copy-on-write), so readers
/// holding a [`Snapshot`] are never affected by later changes. The store
/// expects a single writer; concurrent readers are fine.
pub struct SnapshotStore {
    current: RwLock<Snapshot>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Snapshot::default()),
        }
    }

    /// Clear all resources
    pub fn reset(&self) {
        let mut current = self.current.write();
        let previous = current.entries.len();
        current.entries = Arc::new(HashMap::new());
        current.revision += 1;
        trace!(previous, revision = current.revision, "Snapshot reset");
    }

    /// Apply a change event (overwrite on upsert, idempotent removal)
    pub fn apply(&self, event: ChangeEvent) -> Applied {
        let mut current = self.current.write();

        let applied = match event {
            ChangeEvent::Upserted { id, resource } => {
                let entries = Arc::make_mut(&mut current.entries);
                match entries.insert(id, resource) {
                    Some(_) => Applied::Replaced,
                    None => Applied::Inserted,
                }
            }
            ChangeEvent::Removed { id } => {
                if !current.entries.contains_key(&id) {
                    return Applied::Unchanged;
                }
                Arc::make_mut(&mut current.entries).remove(&id);
                Applied::Removed
            }
        };

        current.revision += 1;
        applied
    }

    /// Current contents
    pub fn snapshot(&self) -> Snapshot {
        self.current.read().clone()
    }

    pub fn get(&self, id: &ResourceId) -> Option<Arc<Resource>> {
        self.current.read().get(id).cloned()
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<Arc<Resource>> {
        self.current.read().find(namespace, name).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.current.read().revision
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.read();
        f.debug_struct("SnapshotStore")
            .field("len", &current.len())
            .field("revision", &current.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(uid: &str, namespace: &str, name: &str, version: &str) -> Resource {
        Resource::from_value(json!({
            "metadata": {
                "uid": uid,
                "name": name,
                "namespace": namespace,
                "resourceVersion": version
            }
        }))
        .unwrap()
    }

    fn upsert(uid: &str, name: &str, version: &str) -> ChangeEvent {
        ChangeEvent::upserted(resource(uid, "default", name, version)).unwrap()
    }

    fn id(uid: &str) -> ResourceId {
        ResourceId::new(uid).unwrap()
    }

    #[test]
    fn test_upsert_overwrites() {
        let store = SnapshotStore::new();

        assert_eq!(store.apply(upsert("1", "a", "v1")), Applied::Inserted);
        assert_eq!(store.apply(upsert("1", "a", "v2")), Applied::Replaced);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id("1")).unwrap().resource_version(), Some("v2"));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = SnapshotStore::new();
        store.apply(upsert("1", "a", "v1"));
        let before = store.snapshot();

        assert_eq!(store.apply(ChangeEvent::removed(id("42"))), Applied::Unchanged);

        let after = store.snapshot();
        assert_eq!(after.len(), 1);
        assert_eq!(after.revision(), before.revision());
    }

    #[test]
    fn test_remove_present() {
        let store = SnapshotStore::new();
        store.apply(upsert("1", "a", "v1"));
        store.apply(upsert("2", "b", "v1"));

        assert_eq!(store.apply(ChangeEvent::removed(id("1"))), Applied::Removed);
        assert_eq!(store.len(), 1);
        assert!(store.get(&id("1")).is_none());
        assert!(store.get(&id("2")).is_some());
    }

    #[test]
    fn test_reset_clears() {
        let store = SnapshotStore::new();
        store.apply(upsert("x", "x", "v1"));
        store.reset();
        store.apply(upsert("y", "y", "v1"));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains(&id("x")));
        assert!(snapshot.contains(&id("y")));
    }

    #[test]
    fn test_snapshot_is_immutable() {
        let store = SnapshotStore::new();
        store.apply(upsert("1", "a", "v1"));

        let taken = store.snapshot();
        store.apply(upsert("1", "a", "v2"));
        store.apply(upsert("2", "b", "v1"));
        store.reset();

        assert_eq!(taken.len(), 1);
        assert_eq!(taken.get(&id("1")).unwrap().resource_version(), Some("v1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_revision_counts_mutations() {
        let store = SnapshotStore::new();
        assert_eq!(store.revision(), 0);

        store.apply(upsert("1", "a", "v1"));
        store.apply(upsert("1", "a", "v2"));
        store.reset();

        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_find_by_key() {
        let store = SnapshotStore::new();
        store.apply(ChangeEvent::upserted(resource("1", "analytics", "clicks", "v1")).unwrap());
        store.apply(ChangeEvent::upserted(resource("2", "billing", "clicks", "v1")).unwrap());

        assert_eq!(store.find("billing", "clicks").unwrap().metadata.uid, "2");
        assert!(store.find("billing", "views").is_none());
    }

    #[test]
    fn test_resources_sorted_by_key() {
        let store = SnapshotStore::new();
        store.apply(ChangeEvent::upserted(resource("1", "b", "z", "v1")).unwrap());
        store.apply(ChangeEvent::upserted(resource("2", "a", "y", "v1")).unwrap());
        store.apply(ChangeEvent::upserted(resource("3", "b", "a", "v1")).unwrap());

        let keys: Vec<String> = store
            .snapshot()
            .resources()
            .iter()
            .map(|r| r.key().to_string())
            .collect();
        assert_eq!(keys, vec!["a/y", "b/a", "b/z"]);
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let store = Arc::new(SnapshotStore::new());

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    store.apply(upsert(&i.to_string(), &format!("d{}", i), "v1"));
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..200 {
                    let snapshot = store.snapshot();
                    assert!(snapshot.len() >= last);
                    assert_eq!(snapshot.len() as u64, snapshot.revision());
                    last = snapshot.len();
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(store.len(), 500);
    }
}
