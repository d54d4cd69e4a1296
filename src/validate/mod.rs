//! Validation-based structural checks for machine definitions.
//!
//! Uses Stillwater's `Validation` type so that a broken definition reports
//! every problem at once rather than the first one found.
//!
//! # Example
//!
//! ```rust
//! use waypoint::core::MachineDefinition;
//! use waypoint::validate;
//!
//! let definition: MachineDefinition = serde_json::from_str(r#"{
//!     "id": "broken",
//!     "initial": "start",
//!     "states": { "a": { "on": { "GO": "b" } } }
//! }"#).unwrap();
//!
//! let err = validate::check(&definition).unwrap_err();
//! assert!(err.to_string().contains("initial state 'start'"));
//! assert!(err.to_string().contains("undefined state 'b'"));
//! ```

pub mod rules;
pub mod violations;

pub use rules::validate_definition;
pub use violations::DefinitionViolation;

use crate::builder::BuildError;
use crate::core::MachineDefinition;
use stillwater::validation::Validation;

/// Run every rule and convert the outcome into a `Result`.
pub fn check(definition: &MachineDefinition) -> Result<(), BuildError> {
    match validate_definition(definition) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(BuildError::InvalidDefinition {
            machine: definition.id.clone(),
            violations: errors.iter().cloned().collect(),
        }),
    }
}
