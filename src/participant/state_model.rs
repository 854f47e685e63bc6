//! Distributed Controller State Model
//!
//! Decides, on command from the coordination service, whether this process
//! is the active controller for a cluster. Only STANDBY <-> LEADER touches
//! the backend: becoming leader opens a session and attaches an election
//! listener to it, stepping down disconnects that session. The other edges
//! are bookkeeping for the OFFLINE/STANDBY/LEADER/DROPPED lifecycle.
//!
//! The session enters the registry as soon as it is opened, before the
//! listener is attached, so a failed attach always leaves the session where
//! rollback can reach it.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use super::registry::{SessionRegistry, SessionSummary};
use crate::error::{Error, Result};
use crate::session::{ElectionListenerFactory, Session, SessionFactory};
use crate::state::{ControllerState, TransitionContext, TransitionMessage};
use crate::transition::{StateModel, TransitionTable};

use crate::state::ControllerState::{Dropped, Leader, Offline, Standby};

/// Transitions published to the dispatcher
pub const DECLARED_TRANSITIONS: [(ControllerState, ControllerState); 6] = [
    (Offline, Standby),
    (Standby, Leader),
    (Leader, Standby),
    (Standby, Offline),
    (Offline, Dropped),
    (Dropped, Offline),
];

/// Default time allowed for opening a session
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Participant-side leadership state machine
pub struct LeadershipStateMachine {
    backend_address: String,
    connect_timeout: Duration,
    session_factory: Arc<dyn SessionFactory>,
    election_factory: Arc<dyn ElectionListenerFactory>,
    registry: SessionRegistry,
}

impl LeadershipStateMachine {
    /// Create a state machine that opens sessions against `backend_address`
    pub fn new(
        backend_address: impl Into<String>,
        session_factory: Arc<dyn SessionFactory>,
        election_factory: Arc<dyn ElectionListenerFactory>,
    ) -> Self {
        Self {
            backend_address: backend_address.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            session_factory,
            election_factory,
            registry: SessionRegistry::new(),
        }
    }

    /// Set the time allowed for opening a session
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn backend_address(&self) -> &str {
        &self.backend_address
    }

    /// Live sessions held by leading controllers
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Diagnostic snapshot of the registry
    pub fn controllers(&self) -> Vec<SessionSummary> {
        self.registry.summaries()
    }

    pub async fn on_become_standby_from_offline(
        &self,
        message: &TransitionMessage,
        _context: &mut TransitionContext,
    ) -> Result<()> {
        tracing::info!(
            "{} becoming standby from offline for cluster: {}",
            message.controller_name,
            message.cluster_name
        );
        Ok(())
    }

    pub async fn on_become_leader_from_standby(
        &self,
        message: &TransitionMessage,
        context: &mut TransitionContext,
    ) -> Result<()> {
        let cluster_name = &message.cluster_name;
        let controller_name = &message.controller_name;

        tracing::info!(
            "{} becomes leader from standby for cluster: {}",
            controller_name,
            cluster_name
        );

        let session = self.open_session(cluster_name, controller_name).await?;

        if let Err(e) = self.registry.put(controller_name, Arc::clone(&session)) {
            // Never entered the registry, so rollback cannot see it
            if let Err(disconnect_err) = session.disconnect().await {
                tracing::warn!(
                    "Failed to close unregistered session {} for {}: {}",
                    session.id(),
                    controller_name,
                    disconnect_err
                );
            }
            return Err(e);
        }

        let binding = self.election_factory.create(cluster_name, controller_name);
        session.add_listener(binding.listener).await?;
        context.set_controller(binding.controller);

        tracing::info!(
            "{} holds session {} for cluster: {}",
            controller_name,
            session.id(),
            cluster_name
        );
        Ok(())
    }

    pub async fn on_become_standby_from_leader(
        &self,
        message: &TransitionMessage,
        _context: &mut TransitionContext,
    ) -> Result<()> {
        let cluster_name = &message.cluster_name;
        let controller_name = &message.controller_name;

        tracing::info!(
            "{} becoming standby from leader for cluster: {}",
            controller_name,
            cluster_name
        );

        match self.registry.remove_for_cluster(controller_name, cluster_name) {
            Some(session) => {
                if let Err(e) = session.disconnect().await {
                    tracing::warn!(
                        "Failed to disconnect session {} for {}: {}",
                        session.id(),
                        controller_name,
                        e
                    );
                }
            }
            None => {
                tracing::warn!(
                    "{} has no session to release for cluster: {}",
                    controller_name,
                    cluster_name
                );
            }
        }
        Ok(())
    }

    pub async fn on_become_offline_from_standby(
        &self,
        message: &TransitionMessage,
        _context: &mut TransitionContext,
    ) -> Result<()> {
        tracing::info!(
            "{} becoming offline from standby for cluster: {}",
            message.controller_name,
            message.cluster_name
        );
        Ok(())
    }

    pub async fn on_become_dropped_from_offline(
        &self,
        message: &TransitionMessage,
        _context: &mut TransitionContext,
    ) -> Result<()> {
        tracing::info!(
            "{} becoming dropped from offline for cluster: {}",
            message.controller_name,
            message.cluster_name
        );
        Ok(())
    }

    pub async fn on_become_offline_from_dropped(
        &self,
        message: &TransitionMessage,
        _context: &mut TransitionContext,
    ) -> Result<()> {
        tracing::info!(
            "{} becoming offline from dropped for cluster: {}",
            message.controller_name,
            message.cluster_name
        );
        Ok(())
    }

    /// Remove the controller's session, detach the listener recorded in the
    /// context and disconnect. A missing entry makes this a no-op.
    pub async fn rollback(&self, message: &TransitionMessage, context: &mut TransitionContext, error: &Error) {
        let cluster_name = &message.cluster_name;
        let controller_name = &message.controller_name;

        tracing::error!(
            "{} rollbacks on error for cluster: {} ({})",
            controller_name,
            cluster_name,
            error
        );

        let Some(session) = self.registry.remove_for_cluster(controller_name, cluster_name) else {
            tracing::debug!(
                "{} has no session to clean up for cluster: {}",
                controller_name,
                cluster_name
            );
            return;
        };

        if let Some(controller) = context.take_controller() {
            if let Err(e) = session.remove_listener(&controller).await {
                tracing::warn!(
                    "Failed to detach listener {} from session {}: {}",
                    controller.listener_id,
                    session.id(),
                    e
                );
            }
        }

        if let Err(e) = session.disconnect().await {
            tracing::warn!(
                "Failed to disconnect session {} during rollback: {}",
                session.id(),
                e
            );
        }
    }

    /// Disconnect every session still held. Used on process shutdown.
    pub async fn shutdown(&self) {
        let sessions = self.registry.drain();
        if sessions.is_empty() {
            return;
        }

        tracing::info!("Releasing {} controller session(s)", sessions.len());
        for (controller_name, session) in sessions {
            if let Err(e) = session.disconnect().await {
                tracing::warn!(
                    "Failed to disconnect session {} for {}: {}",
                    session.id(),
                    controller_name,
                    e
                );
            }
        }
    }

    async fn open_session(&self, cluster_name: &str, controller_name: &str) -> Result<Arc<dyn Session>> {
        let connect = self
            .session_factory
            .create_session(cluster_name, controller_name, &self.backend_address);

        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(result) => result,
            Err(_) => Err(Error::SessionAcquisition {
                cluster: cluster_name.to_string(),
                controller: controller_name.to_string(),
                reason: format!(
                    "timed out after {:?} connecting to {}",
                    self.connect_timeout, self.backend_address
                ),
            }),
        }
    }
}

fn become_standby_from_offline<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_standby_from_offline(message, context))
}

fn become_leader_from_standby<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_leader_from_standby(message, context))
}

fn become_standby_from_leader<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_standby_from_leader(message, context))
}

fn become_offline_from_standby<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_offline_from_standby(message, context))
}

fn become_dropped_from_offline<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_dropped_from_offline(message, context))
}

fn become_offline_from_dropped<'a>(
    model: &'a LeadershipStateMachine,
    message: &'a TransitionMessage,
    context: &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(model.on_become_offline_from_dropped(message, context))
}

#[async_trait::async_trait]
impl StateModel for LeadershipStateMachine {
    fn name(&self) -> &str {
        "DistClusterController"
    }

    fn transition_table() -> Result<TransitionTable<Self>> {
        TransitionTable::builder(Offline)
            .declare(&DECLARED_TRANSITIONS)
            .on(Offline, Standby, become_standby_from_offline)
            .on(Standby, Leader, become_leader_from_standby)
            .on(Leader, Standby, become_standby_from_leader)
            .on(Standby, Offline, become_offline_from_standby)
            .on(Offline, Dropped, become_dropped_from_offline)
            .on(Dropped, Offline, become_offline_from_dropped)
            .build()
    }

    async fn rollback_on_error(
        &self,
        message: &TransitionMessage,
        context: &mut TransitionContext,
        error: &Error,
    ) {
        self.rollback(message, context, error).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::DistControllerElectionFactory;
    use crate::session::{ControllerHandle, MemoryCoordinator};
    use crate::state::ResourceKey;
    use crate::transition::{DispatcherConfig, TransitionDispatcher};

    const BACKEND: &str = "memory:2181";

    fn setup() -> (Arc<MemoryCoordinator>, Arc<LeadershipStateMachine>) {
        let coordinator = Arc::new(MemoryCoordinator::new(BACKEND));
        let model = Arc::new(LeadershipStateMachine::new(
            BACKEND,
            coordinator.clone(),
            Arc::new(DistControllerElectionFactory),
        ));
        (coordinator, model)
    }

    fn message(from: ControllerState, to: ControllerState) -> TransitionMessage {
        TransitionMessage::new("clusterA", "ctrl1", from, to)
    }

    fn failure() -> Error {
        Error::Internal("transition failed".into())
    }

    #[test]
    fn test_transition_table_is_complete() {
        let table = LeadershipStateMachine::transition_table().unwrap();
        assert_eq!(table.initial_state(), Offline);
        for (from, to) in DECLARED_TRANSITIONS {
            assert!(table.handler(from, to).is_some(), "{} -> {}", from, to);
        }
        assert!(table.handler(Offline, Leader).is_none());
        assert!(table.handler(Leader, Offline).is_none());
    }

    #[tokio::test]
    async fn test_become_leader_registers_session_and_listener() {
        let (coordinator, model) = setup();
        let msg = message(Standby, Leader);
        let mut ctx = TransitionContext::new(&msg);

        model.on_become_leader_from_standby(&msg, &mut ctx).await.unwrap();

        assert_eq!(model.registry().len(), 1);
        let session = model.registry().get("ctrl1").unwrap();
        let memory = coordinator.latest_session("ctrl1").await.unwrap();
        assert_eq!(session.id(), memory.id());
        assert_eq!(memory.listener_count().await, 1);
        assert!(ctx.controller().is_some());
        assert_eq!(ctx.controller().unwrap().cluster_name, "clusterA");
    }

    #[tokio::test]
    async fn test_become_standby_disconnects_once() {
        let (coordinator, model) = setup();
        let up = message(Standby, Leader);
        model
            .on_become_leader_from_standby(&up, &mut TransitionContext::new(&up))
            .await
            .unwrap();

        let down = message(Leader, Standby);
        model
            .on_become_standby_from_leader(&down, &mut TransitionContext::new(&down))
            .await
            .unwrap();

        assert!(model.registry().get("ctrl1").is_none());
        let stats = coordinator.stats().await;
        assert_eq!(stats.disconnect_calls, 1);
        assert_eq!(stats.live_sessions, 0);
    }

    #[tokio::test]
    async fn test_become_standby_without_session_is_harmless() {
        let (coordinator, model) = setup();
        let down = message(Leader, Standby);
        model
            .on_become_standby_from_leader(&down, &mut TransitionContext::new(&down))
            .await
            .unwrap();
        assert_eq!(coordinator.stats().await.disconnect_calls, 0);
    }

    #[tokio::test]
    async fn test_disconnect_failure_still_clears_registry() {
        let (coordinator, model) = setup();
        let up = message(Standby, Leader);
        model
            .on_become_leader_from_standby(&up, &mut TransitionContext::new(&up))
            .await
            .unwrap();

        coordinator.set_fail_disconnect(true);
        let down = message(Leader, Standby);
        model
            .on_become_standby_from_leader(&down, &mut TransitionContext::new(&down))
            .await
            .unwrap();

        assert!(model.registry().is_empty());
        assert_eq!(coordinator.stats().await.disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_rollback_without_entry_is_noop() {
        let (coordinator, model) = setup();
        let other = TransitionMessage::new("clusterB", "ctrl2", Standby, Leader);
        model
            .on_become_leader_from_standby(&other, &mut TransitionContext::new(&other))
            .await
            .unwrap();

        let msg = message(Standby, Leader);
        let mut ctx = TransitionContext::new(&msg);
        model.rollback(&msg, &mut ctx, &failure()).await;
        model.rollback(&msg, &mut ctx, &failure()).await;

        assert_eq!(model.registry().len(), 1);
        assert!(model.registry().contains("ctrl2"));
        assert_eq!(coordinator.stats().await.disconnect_calls, 0);
    }

    #[tokio::test]
    async fn test_rollback_after_leadership_detaches_and_disconnects() {
        let (coordinator, model) = setup();
        let msg = message(Standby, Leader);
        let mut ctx = TransitionContext::new(&msg);
        model.on_become_leader_from_standby(&msg, &mut ctx).await.unwrap();

        model.rollback(&msg, &mut ctx, &failure()).await;
        // A second rollback must not touch the backend again
        model.rollback(&msg, &mut ctx, &failure()).await;

        assert!(model.registry().is_empty());
        let stats = coordinator.stats().await;
        assert_eq!(stats.listeners_attached, 1);
        assert_eq!(stats.listeners_detached, 1);
        assert_eq!(stats.disconnect_calls, 1);
        assert_eq!(stats.live_sessions, 0);
    }

    #[tokio::test]
    async fn test_rollback_swallows_cleanup_failures() {
        let (coordinator, model) = setup();
        let msg = message(Standby, Leader);
        let mut ctx = TransitionContext::new(&msg);
        model.on_become_leader_from_standby(&msg, &mut ctx).await.unwrap();

        coordinator.set_fail_disconnect(true);
        // Detaching a listener the session never saw is tolerated too
        ctx.set_controller(ControllerHandle::new("clusterA", "ctrl1"));
        model.rollback(&msg, &mut ctx, &failure()).await;

        assert!(model.registry().is_empty());
        assert_eq!(coordinator.stats().await.disconnect_calls, 1);
    }

    #[tokio::test]
    async fn test_session_creation_failure_leaves_no_entry() {
        let (coordinator, model) = setup();
        coordinator.set_fail_create(true);
        let dispatcher = TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap();

        dispatcher.dispatch(message(Offline, Standby)).await.unwrap();
        let result = dispatcher.dispatch(message(Standby, Leader)).await;

        match result {
            Err(e @ Error::TransitionFailed { .. }) => assert!(e.is_recoverable()),
            other => panic!("expected transition failure, got {:?}", other),
        }
        assert!(model.registry().is_empty());
        assert_eq!(
            dispatcher.current_state(&ResourceKey::new("clusterA", "ctrl1")),
            Standby
        );
        let stats = coordinator.stats().await;
        assert_eq!(stats.sessions_created, 0);
        assert_eq!(stats.disconnect_calls, 0);
    }

    #[tokio::test]
    async fn test_listener_failure_rollback_disconnects_orphan() {
        let (coordinator, model) = setup();
        coordinator.set_fail_add_listener(true);
        let dispatcher = TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap();

        dispatcher.dispatch(message(Offline, Standby)).await.unwrap();
        let result = dispatcher.dispatch(message(Standby, Leader)).await;
        assert!(result.is_err());

        assert!(model.registry().is_empty());
        let stats = coordinator.stats().await;
        assert_eq!(stats.sessions_created, 1);
        assert_eq!(stats.listeners_attached, 0);
        assert_eq!(stats.listeners_detached, 0);
        assert_eq!(stats.disconnect_calls, 1);
        assert_eq!(stats.live_sessions, 0);

        // Participant can lead once the backend recovers
        coordinator.set_fail_add_listener(false);
        dispatcher.dispatch(message(Standby, Leader)).await.unwrap();
        assert!(model.registry().contains("ctrl1"));
    }

    #[tokio::test]
    async fn test_duplicate_session_is_closed_and_stale_entry_rolled_back() {
        let (coordinator, model) = setup();
        let msg = message(Standby, Leader);
        model
            .on_become_leader_from_standby(&msg, &mut TransitionContext::new(&msg))
            .await
            .unwrap();

        let mut ctx = TransitionContext::new(&msg);
        let result = model.on_become_leader_from_standby(&msg, &mut ctx).await;
        assert!(matches!(result, Err(Error::SessionAlreadyRegistered(_))));
        assert_eq!(coordinator.stats().await.live_sessions, 1);

        model.rollback(&msg, &mut ctx, &failure()).await;
        let stats = coordinator.stats().await;
        assert_eq!(stats.sessions_created, 2);
        assert_eq!(stats.disconnect_calls, 2);
        assert_eq!(stats.live_sessions, 0);
        assert!(model.registry().is_empty());
    }

    #[tokio::test]
    async fn test_full_cycle_is_repeatable() {
        let (coordinator, model) = setup();
        let dispatcher = TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap();

        for round in 1..=3u64 {
            for (from, to) in [
                (Offline, Standby),
                (Standby, Leader),
                (Leader, Standby),
                (Standby, Offline),
            ] {
                dispatcher.dispatch(message(from, to)).await.unwrap();
                assert_eq!(model.registry().contains("ctrl1"), to == Leader);
            }

            let stats = coordinator.stats().await;
            assert_eq!(stats.sessions_created, round);
            assert_eq!(stats.disconnect_calls, round);
            assert_eq!(stats.live_sessions, 0);
        }

        dispatcher.dispatch(message(Offline, Dropped)).await.unwrap();
        dispatcher.dispatch(message(Dropped, Offline)).await.unwrap();
        assert!(model.registry().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_controllers_are_independent() {
        let (coordinator, model) = setup();
        let dispatcher = Arc::new(
            TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap(),
        );

        // ctrl-a stays leader while ctrl-b cycles
        dispatcher
            .dispatch(TransitionMessage::new("clusterA", "ctrl-a", Offline, Standby))
            .await
            .unwrap();
        dispatcher
            .dispatch(TransitionMessage::new("clusterA", "ctrl-a", Standby, Leader))
            .await
            .unwrap();

        let cycler = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .dispatch(TransitionMessage::new("clusterB", "ctrl-b", Offline, Standby))
                    .await
                    .unwrap();
                for _ in 0..20 {
                    for (from, to) in [(Standby, Leader), (Leader, Standby)] {
                        dispatcher
                            .dispatch(TransitionMessage::new("clusterB", "ctrl-b", from, to))
                            .await
                            .unwrap();
                    }
                }
            })
        };

        let watcher = {
            let model = Arc::clone(&model);
            tokio::spawn(async move {
                for _ in 0..200 {
                    assert!(model.registry().contains("ctrl-a"));
                    tokio::task::yield_now().await;
                }
            })
        };

        cycler.await.unwrap();
        watcher.await.unwrap();

        assert!(model.registry().contains("ctrl-a"));
        assert!(!model.registry().contains("ctrl-b"));
        assert_eq!(coordinator.stats().await.live_sessions, 1);
    }

    #[tokio::test]
    async fn test_same_controller_name_in_two_clusters() {
        let (coordinator, model) = setup();
        let dispatcher = TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap();

        for cluster in ["clusterA", "clusterB"] {
            dispatcher
                .dispatch(TransitionMessage::new(cluster, "ctrl1", Offline, Standby))
                .await
                .unwrap();
        }
        dispatcher
            .dispatch(TransitionMessage::new("clusterA", "ctrl1", Standby, Leader))
            .await
            .unwrap();
        let leader = model.registry().get("ctrl1").unwrap();

        // clusterB cannot take the name, and its cleanup leaves clusterA alone
        let result = dispatcher
            .dispatch(TransitionMessage::new("clusterB", "ctrl1", Standby, Leader))
            .await;
        assert!(matches!(result, Err(Error::TransitionFailed { .. })));
        assert_eq!(model.registry().get("ctrl1").unwrap().id(), leader.id());
        assert_eq!(model.registry().get("ctrl1").unwrap().cluster_name(), "clusterA");

        let stats = coordinator.stats().await;
        assert_eq!(stats.sessions_created, 2);
        assert_eq!(stats.disconnect_calls, 1);
        assert_eq!(stats.live_sessions, 1);

        // Stepping down in clusterB must not release clusterA's session either
        let down = TransitionMessage::new("clusterB", "ctrl1", Leader, Standby);
        model
            .on_become_standby_from_leader(&down, &mut TransitionContext::new(&down))
            .await
            .unwrap();
        assert!(model.registry().contains("ctrl1"));
        assert_eq!(coordinator.stats().await.live_sessions, 1);

        dispatcher
            .dispatch(TransitionMessage::new("clusterA", "ctrl1", Leader, Standby))
            .await
            .unwrap();
        assert!(model.registry().is_empty());
        assert_eq!(coordinator.stats().await.live_sessions, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_pending_leadership() {
        let (coordinator, model) = setup();
        let dispatcher = Arc::new(
            TransitionDispatcher::new(model.clone(), &DispatcherConfig::default()).unwrap(),
        );
        dispatcher.dispatch(message(Offline, Standby)).await.unwrap();

        coordinator.set_create_delay(Duration::from_millis(200));
        let pending = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(message(Standby, Leader)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        dispatcher.close().await;
        model.shutdown().await;

        assert!(pending.await.unwrap().is_ok());
        assert!(model.registry().is_empty());
        let stats = coordinator.stats().await;
        assert_eq!(stats.sessions_created, 1);
        assert_eq!(stats.disconnect_calls, 1);
        assert_eq!(stats.live_sessions, 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_all_sessions() {
        let (coordinator, model) = setup();
        for name in ["ctrl1", "ctrl2"] {
            let msg = TransitionMessage::new("clusterA", name, Standby, Leader);
            model
                .on_become_leader_from_standby(&msg, &mut TransitionContext::new(&msg))
                .await
                .unwrap();
        }

        model.shutdown().await;
        assert!(model.registry().is_empty());
        let stats = coordinator.stats().await;
        assert_eq!(stats.disconnect_calls, 2);
        assert_eq!(stats.live_sessions, 0);
    }

    #[tokio::test]
    async fn test_wrong_backend_address_fails_acquisition() {
        let coordinator = Arc::new(MemoryCoordinator::new(BACKEND));
        let model = LeadershipStateMachine::new(
            "memory:9999",
            coordinator,
            Arc::new(DistControllerElectionFactory),
        )
        .with_connect_timeout(Duration::from_secs(1));

        let msg = message(Standby, Leader);
        let result = model
            .on_become_leader_from_standby(&msg, &mut TransitionContext::new(&msg))
            .await;
        assert!(matches!(result, Err(Error::SessionAcquisition { .. })));
        assert!(model.registry().is_empty());
    }
}
