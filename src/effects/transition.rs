//! Resolved transitions, dispatch outcomes and dispatch errors.

use crate::builder::BuildError;
use crate::core::{InstanceId, MachineDefinition};
use crate::effects::table::{Effect, EffectTable};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// A transition whose effect ids have been bound to executable effects.
#[derive(Clone, Debug)]
pub struct ResolvedTransition {
    pub target: Option<String>,
    pub effects: Vec<(String, Effect)>,
}

/// Transition table keyed by state, then by event type.
pub type TransitionTable = HashMap<String, HashMap<String, Arc<ResolvedTransition>>>;

/// Bind every effect a definition names. Fails on the first unknown id, in
/// state then event order.
pub fn resolve_transitions(
    definition: &MachineDefinition,
    effects: &EffectTable,
) -> Result<TransitionTable, BuildError> {
    let mut table = TransitionTable::new();
    for (state, node) in &definition.states {
        let mut by_event = HashMap::new();
        for (event, spec) in &node.on {
            let resolved = spec
                .effects
                .iter()
                .map(|id| Ok((id.clone(), effects.resolve(&definition.id, id)?)))
                .collect::<Result<Vec<_>, BuildError>>()?;
            by_event.insert(
                event.clone(),
                Arc::new(ResolvedTransition {
                    target: spec.target.clone(),
                    effects: resolved,
                }),
            );
        }
        table.insert(state.clone(), by_event);
    }
    Ok(table)
}

/// What a single dispatch did.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchOutcome {
    /// The current state has no transition for the event
    Ignored,
    /// A targetless transition ran its effects
    Stayed { state: String },
    /// Entered `to`, possibly re-entering the same state
    Transitioned { from: String, to: String },
    /// Entered a terminal state
    Terminated { state: String, output: Value },
}

/// Misuse of the instance protocol. Fatal to the call, never to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProtocolViolation {
    #[error("'{machine}' already terminated in '{state}'")]
    AlreadyTerminated { machine: String, state: String },

    #[error("'{machine}' has not been started")]
    NotStarted { machine: String },

    #[error("'{machine}' ignored a signal from replaced child {child}")]
    StaleChild { machine: String, child: InstanceId },

    #[error("'{machine}' has no active child to receive '{event}'")]
    NoActiveChild { machine: String, event: String },
}

/// Errors returned from dispatching into an instance or its children.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("Failed to spawn child: {0}")]
    Spawn(#[from] BuildError),
}

impl DispatchError {
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
