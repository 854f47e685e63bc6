//! Session Registry
//!
//! Maps a controller name to the live session it holds while leading.
//! Backed by a sharded `DashMap`, so operations on unrelated controllers
//! never contend on a single lock.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::Session;

/// Diagnostic view of one registry entry
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub controller_name: String,
    pub cluster_name: String,
    pub session_id: Uuid,
    pub connected_at: chrono::DateTime<chrono::Utc>,
}

/// Live sessions keyed by controller name
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<dyn Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session if the controller has none.
    ///
    /// Fails with [`Error::SessionAlreadyRegistered`] and leaves the existing
    /// entry untouched otherwise.
    pub fn put(&self, controller_name: &str, session: Arc<dyn Session>) -> Result<()> {
        match self.sessions.entry(controller_name.to_string()) {
            Entry::Occupied(_) => Err(Error::SessionAlreadyRegistered(controller_name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Remove and return the controller's session, if present
    pub fn remove(&self, controller_name: &str) -> Option<Arc<dyn Session>> {
        self.sessions.remove(controller_name).map(|(_, session)| session)
    }

    /// Remove the controller's session only if it was opened for `cluster_name`.
    ///
    /// Controller names repeat across clusters, so removals driven by a
    /// transition message must not take another cluster's entry.
    pub fn remove_for_cluster(&self, controller_name: &str, cluster_name: &str) -> Option<Arc<dyn Session>> {
        self.sessions
            .remove_if(controller_name, |_, session| session.cluster_name() == cluster_name)
            .map(|(_, session)| session)
    }

    pub fn get(&self, controller_name: &str) -> Option<Arc<dyn Session>> {
        self.sessions
            .get(controller_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, controller_name: &str) -> bool {
        self.sessions.contains_key(controller_name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Copy of the current mapping
    pub fn snapshot(&self) -> HashMap<String, Arc<dyn Session>> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    /// Serializable summaries, sorted by controller name
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| {
                let session = entry.value();
                SessionSummary {
                    controller_name: entry.key().clone(),
                    cluster_name: session.cluster_name().to_string(),
                    session_id: session.id(),
                    connected_at: session.connected_at(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.controller_name.cmp(&b.controller_name));
        summaries
    }

    /// Remove every entry and return the removed sessions
    pub fn drain(&self) -> Vec<(String, Arc<dyn Session>)> {
        let keys: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| self.sessions.remove(&key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryCoordinator, SessionFactory};

    async fn open(coordinator: &MemoryCoordinator, controller: &str) -> Arc<dyn Session> {
        coordinator
            .create_session("clusterA", controller, coordinator.address())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_is_insert_if_absent() {
        let coordinator = MemoryCoordinator::new("memory:2181");
        let registry = SessionRegistry::new();

        let first = open(&coordinator, "ctrl1").await;
        let second = open(&coordinator, "ctrl1").await;

        registry.put("ctrl1", Arc::clone(&first)).unwrap();
        assert!(matches!(
            registry.put("ctrl1", second),
            Err(Error::SessionAlreadyRegistered(_))
        ));
        assert_eq!(registry.get("ctrl1").unwrap().id(), first.id());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_hands_out_session_once() {
        let coordinator = MemoryCoordinator::new("memory:2181");
        let registry = SessionRegistry::new();
        registry.put("ctrl1", open(&coordinator, "ctrl1").await).unwrap();

        assert!(registry.remove("ctrl1").is_some());
        assert!(registry.remove("ctrl1").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_for_cluster_leaves_other_clusters_alone() {
        let coordinator = MemoryCoordinator::new("memory:2181");
        let registry = SessionRegistry::new();
        let session = coordinator
            .create_session("clusterB", "ctrl1", coordinator.address())
            .await
            .unwrap();
        registry.put("ctrl1", Arc::clone(&session)).unwrap();

        assert!(registry.remove_for_cluster("ctrl1", "clusterA").is_none());
        assert_eq!(registry.get("ctrl1").unwrap().id(), session.id());

        let removed = registry.remove_for_cluster("ctrl1", "clusterB").unwrap();
        assert_eq!(removed.id(), session.id());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_and_summaries() {
        let coordinator = MemoryCoordinator::new("memory:2181");
        let registry = SessionRegistry::new();
        registry.put("ctrl2", open(&coordinator, "ctrl2").await).unwrap();
        registry.put("ctrl1", open(&coordinator, "ctrl1").await).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains_key("ctrl1"));

        // Snapshot is a copy
        registry.remove("ctrl1");
        assert_eq!(snapshot.len(), 2);

        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].controller_name, "ctrl2");
        assert_eq!(summaries[0].cluster_name, "clusterA");
    }

    #[tokio::test]
    async fn test_drain() {
        let coordinator = MemoryCoordinator::new("memory:2181");
        let registry = SessionRegistry::new();
        registry.put("ctrl1", open(&coordinator, "ctrl1").await).unwrap();
        registry.put("ctrl2", open(&coordinator, "ctrl2").await).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_controllers() {
        let coordinator = Arc::new(MemoryCoordinator::new("memory:2181"));
        let registry = Arc::new(SessionRegistry::new());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let coordinator = Arc::clone(&coordinator);
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let name = format!("ctrl{}", i);
                for _ in 0..10 {
                    let session = open(&coordinator, &name).await;
                    registry.put(&name, session).unwrap();
                    assert!(registry.contains(&name));
                    assert!(registry.remove(&name).is_some());
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(registry.is_empty());
    }
}
