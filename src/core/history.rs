//! State transition history tracking.
//!
//! Provides immutable tracking of the transitions a machine instance has
//! taken. Timestamps are recorded by the interpreter, never by effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a single accepted transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state being left
    pub from: String,
    /// The state being entered (may equal `from` for a re-entry)
    pub to: String,
    /// The event type that triggered the transition
    pub event: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of state transitions.
///
/// History is immutable - `record` returns a new history with the
/// transition added.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{StateHistory, StateTransition};
/// use chrono::Utc;
///
/// let history = StateHistory::new()
///     .record(StateTransition {
///         from: "loading".to_string(),
///         to: "choosing".to_string(),
///         event: "NOT_FOUND".to_string(),
///         timestamp: Utc::now(),
///     })
///     .record(StateTransition {
///         from: "choosing".to_string(),
///         to: "signIn".to_string(),
///         event: "HAS_ACCOUNT".to_string(),
///         timestamp: Utc::now(),
///     });
///
/// assert_eq!(history.get_path(), vec!["loading", "choosing", "signIn"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    transitions: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, transition: StateTransition) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// The states traversed: the first `from`, then every `to`.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Event types in the order they were accepted.
    pub fn events(&self) -> Vec<&str> {
        self.transitions.iter().map(|t| t.event.as_str()).collect()
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}
