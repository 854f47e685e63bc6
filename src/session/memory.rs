//! In-memory coordination backend.
//!
//! Sessions live in process memory until they are disconnected. Every create,
//! disconnect and listener change is counted, and each operation can be made
//! to fail, so callers can check exactly how the backend was driven.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ControllerChange, ControllerHandle, ElectionListener, Session, SessionFactory};
use crate::error::{Error, Result};

#[derive(Default)]
struct Counters {
    sessions_created: AtomicU64,
    disconnect_calls: AtomicU64,
    listeners_attached: AtomicU64,
    listeners_detached: AtomicU64,
}

#[derive(Default)]
struct Faults {
    create: AtomicBool,
    create_delay_ms: AtomicU64,
    add_listener: AtomicBool,
    disconnect: AtomicBool,
}

/// Connected sessions by id
type LiveSessions = RwLock<HashMap<Uuid, Arc<MemorySession>>>;

/// Point-in-time counters of a [`MemoryCoordinator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CoordinatorStats {
    pub sessions_created: u64,
    pub disconnect_calls: u64,
    pub listeners_attached: u64,
    pub listeners_detached: u64,
    pub live_sessions: usize,
}

/// In-process coordination backend
pub struct MemoryCoordinator {
    address: String,
    sessions: Arc<LiveSessions>,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
}

impl MemoryCoordinator {
    /// Create a backend reachable at `address`
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
            faults: Arc::new(Faults::default()),
        }
    }

    /// Address sessions must be opened against
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Make `create_session` fail
    pub fn set_fail_create(&self, fail: bool) {
        self.faults.create.store(fail, Ordering::SeqCst);
    }

    /// Delay every `create_session` call, as a slow backend would
    pub fn set_create_delay(&self, delay: Duration) {
        self.faults
            .create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make `add_listener` fail on every session
    pub fn set_fail_add_listener(&self, fail: bool) {
        self.faults.add_listener.store(fail, Ordering::SeqCst);
    }

    /// Make `disconnect` fail on every session
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.faults.disconnect.store(fail, Ordering::SeqCst);
    }

    /// Most recently opened live session of a controller
    pub async fn latest_session(&self, controller_name: &str) -> Option<Arc<MemorySession>> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|s| s.controller_name == controller_name)
            .max_by_key(|s| s.connected_at)
            .cloned()
    }

    /// Sessions that have not been disconnected
    pub async fn live_sessions(&self) -> Vec<Arc<MemorySession>> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Snapshot of the counters
    pub async fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            sessions_created: self.counters.sessions_created.load(Ordering::SeqCst),
            disconnect_calls: self.counters.disconnect_calls.load(Ordering::SeqCst),
            listeners_attached: self.counters.listeners_attached.load(Ordering::SeqCst),
            listeners_detached: self.counters.listeners_detached.load(Ordering::SeqCst),
            live_sessions: self.sessions.read().await.len(),
        }
    }
}

#[async_trait]
impl SessionFactory for MemoryCoordinator {
    async fn create_session(
        &self,
        cluster_name: &str,
        controller_name: &str,
        backend_address: &str,
    ) -> Result<Arc<dyn Session>> {
        if backend_address != self.address {
            return Err(Error::SessionAcquisition {
                cluster: cluster_name.to_string(),
                controller: controller_name.to_string(),
                reason: format!("no coordination backend at {}", backend_address),
            });
        }

        let delay_ms = self.faults.create_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.faults.create.load(Ordering::SeqCst) {
            return Err(Error::SessionAcquisition {
                cluster: cluster_name.to_string(),
                controller: controller_name.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let session = Arc::new(MemorySession {
            id: Uuid::new_v4(),
            cluster_name: cluster_name.to_string(),
            controller_name: controller_name.to_string(),
            connected_at: chrono::Utc::now(),
            connected: AtomicBool::new(true),
            listeners: RwLock::new(HashMap::new()),
            counters: Arc::clone(&self.counters),
            faults: Arc::clone(&self.faults),
            live: Arc::downgrade(&self.sessions),
        });

        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        self.counters.sessions_created.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            "Opened session {} for {} in cluster {}",
            session.id,
            controller_name,
            cluster_name
        );

        Ok(session)
    }
}

/// Session handed out by [`MemoryCoordinator`]
pub struct MemorySession {
    id: Uuid,
    cluster_name: String,
    controller_name: String,
    connected_at: chrono::DateTime<chrono::Utc>,
    connected: AtomicBool,
    listeners: RwLock<HashMap<Uuid, Arc<dyn ElectionListener>>>,
    counters: Arc<Counters>,
    faults: Arc<Faults>,
    live: Weak<LiveSessions>,
}

impl MemorySession {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of listeners currently attached
    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

#[async_trait]
impl Session for MemorySession {
    fn id(&self) -> Uuid {
        self.id
    }

    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    fn controller_name(&self) -> &str {
        &self.controller_name
    }

    fn connected_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.connected_at
    }

    async fn add_listener(&self, listener: Arc<dyn ElectionListener>) -> Result<()> {
        let registration_error = |reason: &str| Error::ListenerRegistration {
            cluster: self.cluster_name.clone(),
            controller: self.controller_name.clone(),
            reason: reason.to_string(),
        };

        if !self.is_connected() {
            return Err(registration_error("session is closed"));
        }
        if self.faults.add_listener.load(Ordering::SeqCst) {
            return Err(registration_error("watch registration rejected"));
        }

        let listener_id = listener.controller().listener_id;
        self.listeners
            .write()
            .await
            .insert(listener_id, Arc::clone(&listener));
        self.counters.listeners_attached.fetch_add(1, Ordering::SeqCst);

        listener.on_change(ControllerChange::Attached { session_id: self.id });
        Ok(())
    }

    async fn remove_listener(&self, controller: &ControllerHandle) -> Result<()> {
        let removed = self.listeners.write().await.remove(&controller.listener_id);
        match removed {
            Some(listener) => {
                self.counters.listeners_detached.fetch_add(1, Ordering::SeqCst);
                listener.on_change(ControllerChange::Detached { session_id: self.id });
            }
            None => {
                tracing::debug!(
                    "Listener {} not registered on session {}",
                    controller.listener_id,
                    self.id
                );
            }
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.counters.disconnect_calls.fetch_add(1, Ordering::SeqCst);

        if self.faults.disconnect.load(Ordering::SeqCst) {
            return Err(Error::Disconnect {
                session: self.id.to_string(),
                reason: "backend did not acknowledge close".to_string(),
            });
        }
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Err(Error::Disconnect {
                session: self.id.to_string(),
                reason: "session already closed".to_string(),
            });
        }

        if let Some(live) = self.live.upgrade() {
            live.write().await.remove(&self.id);
        }

        let listeners: Vec<_> = self.listeners.write().await.drain().map(|(_, l)| l).collect();
        for listener in listeners {
            listener.on_change(ControllerChange::SessionClosed { session_id: self.id });
        }

        tracing::debug!("Closed session {} for {}", self.id, self.controller_name);
        Ok(())
    }
}
