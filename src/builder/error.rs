//! Errors raised while constructing definitions and instances.

use crate::validate::DefinitionViolation;
use thiserror::Error;

/// Errors that can occur when building a definition or instantiating one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Initial state not specified for '{machine}'. Call .initial(state) before .build()")]
    MissingInitialState { machine: String },

    #[error("State '{state}' is defined twice in '{machine}'")]
    DuplicateState { machine: String, state: String },

    #[error("Definition '{machine}' is invalid: {}", join(.violations))]
    InvalidDefinition {
        machine: String,
        violations: Vec<DefinitionViolation>,
    },

    #[error("Definition '{machine}' references unknown effect '{effect}'")]
    UnknownEffect { machine: String, effect: String },
}

fn join(violations: &[DefinitionViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
