//! Structural problems a machine definition can have.

use thiserror::Error;

/// A single structural violation found in a definition.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DefinitionViolation {
    #[error("machine id is empty")]
    EmptyId,

    #[error("initial state '{initial}' is not defined")]
    UnknownInitialState { initial: String },

    #[error("state '{state}' sends '{event}' to undefined state '{target}'")]
    UnknownTarget {
        state: String,
        event: String,
        target: String,
    },

    #[error("terminal state '{state}' has outgoing transitions")]
    TerminalHasTransitions { state: String },

    #[error("non-terminal state '{state}' declares an output")]
    OutputOnNonTerminal { state: String },
}
