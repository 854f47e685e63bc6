//! Transition Dispatcher
//!
//! Delivers transition messages to a state model. Messages for different
//! resources run concurrently up to `max_concurrent_transitions`; messages
//! for the same resource are serialized on a per-resource lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use uuid::Uuid;

use super::{StateModel, TransitionTable};
use crate::error::{Error, Result};
use crate::state::{ControllerState, ResourceKey, TransitionContext, TransitionMessage};

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of transitions running at once
    #[serde(default = "default_max_concurrent_transitions")]
    pub max_concurrent_transitions: usize,
}

fn default_max_concurrent_transitions() -> usize {
    16
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transitions: default_max_concurrent_transitions(),
        }
    }
}

/// Result of a completed transition
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub message_id: Uuid,
    pub resource: ResourceKey,
    pub from: ControllerState,
    pub to: ControllerState,
    pub elapsed_ms: u64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Current state of one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantState {
    pub cluster_name: String,
    pub controller_name: String,
    pub state: ControllerState,
}

/// Runs transition handlers of a [`StateModel`]
pub struct TransitionDispatcher<M: StateModel> {
    model: Arc<M>,
    table: TransitionTable<M>,
    states: DashMap<ResourceKey, ControllerState>,
    locks: DashMap<ResourceKey, Arc<Mutex<()>>>,
    permits: Semaphore,
    max_permits: u32,
    closed: AtomicBool,
}

impl<M: StateModel> TransitionDispatcher<M> {
    /// Create a dispatcher, validating the model's transition table
    pub fn new(model: Arc<M>, config: &DispatcherConfig) -> Result<Self> {
        if config.max_concurrent_transitions == 0 {
            return Err(Error::Config(
                "dispatcher.max_concurrent_transitions must be at least 1".into(),
            ));
        }

        let max_permits = u32::try_from(config.max_concurrent_transitions).map_err(|_| {
            Error::Config("dispatcher.max_concurrent_transitions is too large".into())
        })?;

        let table = M::transition_table()?;
        tracing::info!(
            "State model {} ready: initial state {}, {} transitions",
            model.name(),
            table.initial_state(),
            table.transitions().len()
        );

        Ok(Self {
            model,
            table,
            states: DashMap::new(),
            locks: DashMap::new(),
            permits: Semaphore::new(config.max_concurrent_transitions),
            max_permits,
            closed: AtomicBool::new(false),
        })
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn table(&self) -> &TransitionTable<M> {
        &self.table
    }

    /// Current state of a resource; unknown resources are in the initial state
    pub fn current_state(&self, resource: &ResourceKey) -> ControllerState {
        self.states
            .get(resource)
            .map(|state| *state.value())
            .unwrap_or_else(|| self.table.initial_state())
    }

    /// Snapshot of every resource that has completed a transition
    pub fn states(&self) -> Vec<ParticipantState> {
        let mut states: Vec<ParticipantState> = self
            .states
            .iter()
            .map(|entry| ParticipantState {
                cluster_name: entry.key().cluster_name.clone(),
                controller_name: entry.key().controller_name.clone(),
                state: *entry.value(),
            })
            .collect();
        states.sort_by(|a, b| {
            (&a.cluster_name, &a.controller_name).cmp(&(&b.cluster_name, &b.controller_name))
        });
        states
    }

    /// Stop accepting new messages and wait for running transitions to finish.
    ///
    /// Once this returns no handler is running or will run again.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Every permit back in hand means nothing is in flight
        if let Ok(_all) = self.permits.acquire_many(self.max_permits).await {
            self.permits.close();
        }
        tracing::info!("Transition dispatcher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver one message.
    ///
    /// Rejected messages never reach the model. When the handler fails the
    /// model's rollback runs with the same context, the resource stays in
    /// its `from` state and [`Error::TransitionFailed`] is returned.
    pub async fn dispatch(&self, message: TransitionMessage) -> Result<TransitionOutcome> {
        if self.is_closed() {
            return Err(Error::ShuttingDown);
        }
        let _permit = self.permits.acquire().await.map_err(|_| Error::ShuttingDown)?;

        let resource = message.resource();
        let lock = self
            .locks
            .entry(resource.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.run(message, resource.clone()).await
        };

        // Drop the lock entry once no other message for the resource holds it
        drop(lock);
        self.locks.remove_if(&resource, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn run(&self, message: TransitionMessage, resource: ResourceKey) -> Result<TransitionOutcome> {
        let current = self.current_state(&resource);
        if current != message.from {
            tracing::warn!(
                "Rejecting {} -> {} for {}: resource is {}",
                message.from,
                message.to,
                resource,
                current
            );
            return Err(Error::StateMismatch {
                resource: resource.to_string(),
                expected: message.from,
                current,
            });
        }

        let handler = self
            .table
            .handler(message.from, message.to)
            .ok_or(Error::InvalidTransition {
                from: message.from,
                to: message.to,
            })?;

        let mut context = TransitionContext::new(&message);
        let started = Instant::now();

        match handler(self.model.as_ref(), &message, &mut context).await {
            Ok(()) => {
                self.states.insert(resource.clone(), message.to);
                tracing::debug!(
                    "{} moved {} -> {} in {:?}",
                    resource,
                    message.from,
                    message.to,
                    started.elapsed()
                );
                Ok(TransitionOutcome {
                    message_id: message.id,
                    resource,
                    from: message.from,
                    to: message.to,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    completed_at: chrono::Utc::now(),
                })
            }
            Err(e) => {
                tracing::error!(
                    "Transition {} -> {} failed for {}: {}",
                    message.from,
                    message.to,
                    resource,
                    e
                );
                self.model.rollback_on_error(&message, &mut context, &e).await;
                Err(Error::TransitionFailed {
                    resource: resource.to_string(),
                    from: message.from,
                    to: message.to,
                    source: Box::new(e),
                })
            }
        }
    }
}
