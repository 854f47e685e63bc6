//! Transition Tables

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::state::{ControllerState, TransitionContext, TransitionMessage};

/// Handler for one `(from, to)` edge
pub type TransitionHandler<M> = for<'a> fn(
    &'a M,
    &'a TransitionMessage,
    &'a mut TransitionContext,
) -> BoxFuture<'a, Result<()>>;

/// Validated mapping from declared edges to their handlers
pub struct TransitionTable<M> {
    initial: ControllerState,
    declared: Vec<(ControllerState, ControllerState)>,
    handlers: HashMap<(ControllerState, ControllerState), TransitionHandler<M>>,
}

impl<M> TransitionTable<M> {
    /// Start building a table for a model with the given initial state
    pub fn builder(initial: ControllerState) -> TransitionTableBuilder<M> {
        TransitionTableBuilder {
            initial,
            declared: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn initial_state(&self) -> ControllerState {
        self.initial
    }

    /// Declared edges, in declaration order
    pub fn transitions(&self) -> &[(ControllerState, ControllerState)] {
        &self.declared
    }

    pub fn handler(&self, from: ControllerState, to: ControllerState) -> Option<TransitionHandler<M>> {
        self.handlers.get(&(from, to)).copied()
    }
}

/// Builder for [`TransitionTable`]
pub struct TransitionTableBuilder<M> {
    initial: ControllerState,
    declared: Vec<(ControllerState, ControllerState)>,
    handlers: Vec<(ControllerState, ControllerState, TransitionHandler<M>)>,
}

impl<M> TransitionTableBuilder<M> {
    /// Declare the edges the model supports
    pub fn declare(mut self, transitions: &[(ControllerState, ControllerState)]) -> Self {
        self.declared.extend_from_slice(transitions);
        self
    }

    /// Register the handler for an edge
    pub fn on(mut self, from: ControllerState, to: ControllerState, handler: TransitionHandler<M>) -> Self {
        self.handlers.push((from, to, handler));
        self
    }

    /// Check that declared edges and registered handlers match one to one
    pub fn build(self) -> Result<TransitionTable<M>> {
        let mut handlers = HashMap::new();
        for (from, to, handler) in self.handlers {
            if from == to {
                return Err(Error::Config(format!("self transition {} -> {} is not allowed", from, to)));
            }
            if handlers.insert((from, to), handler).is_some() {
                return Err(Error::Config(format!("duplicate handler for {} -> {}", from, to)));
            }
        }

        let declared: HashSet<_> = self.declared.iter().copied().collect();
        if declared.len() != self.declared.len() {
            return Err(Error::Config("transition declared more than once".to_string()));
        }

        for (from, to) in &self.declared {
            if !handlers.contains_key(&(*from, *to)) {
                return Err(Error::MissingHandler { from: *from, to: *to });
            }
        }
        for (from, to) in handlers.keys() {
            if !declared.contains(&(*from, *to)) {
                return Err(Error::UndeclaredTransition { from: *from, to: *to });
            }
        }

        if !self.declared.iter().any(|(from, _)| *from == self.initial) {
            return Err(Error::Config(format!(
                "initial state {} has no outgoing transition",
                self.initial
            )));
        }

        Ok(TransitionTable {
            initial: self.initial,
            declared: self.declared,
            handlers,
        })
    }
}
