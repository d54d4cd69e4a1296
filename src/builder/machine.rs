//! Builder for constructing machine definitions.

use crate::builder::error::BuildError;
use crate::builder::transition::StateBuilder;
use crate::core::MachineDefinition;
use crate::validate;
use std::collections::BTreeMap;

/// Builder for machine definitions with a fluent API.
///
/// # Example
///
/// ```rust
/// use waypoint::builder::{DefinitionBuilder, StateBuilder};
///
/// let definition = DefinitionBuilder::new("door")
///     .initial("closed")
///     .state(StateBuilder::new("closed").goto("OPEN", "open"))
///     .state(StateBuilder::new("open").goto("CLOSE", "closed").goto("REMOVE", "gone"))
///     .state(StateBuilder::new("gone").terminal())
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.states.len(), 3);
/// ```
pub struct DefinitionBuilder {
    id: String,
    initial: Option<String>,
    states: Vec<StateBuilder>,
}

impl DefinitionBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial: None,
            states: Vec::new(),
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    pub fn state(mut self, state: StateBuilder) -> Self {
        self.states.push(state);
        self
    }

    /// Build and validate the definition.
    pub fn build(self) -> Result<MachineDefinition, BuildError> {
        let initial = self.initial.ok_or_else(|| BuildError::MissingInitialState {
            machine: self.id.clone(),
        })?;

        let mut states = BTreeMap::new();
        for builder in self.states {
            let (id, node) = builder.into_parts();
            if states.contains_key(&id) {
                return Err(BuildError::DuplicateState {
                    machine: self.id,
                    state: id,
                });
            }
            states.insert(id, node);
        }

        let definition = MachineDefinition {
            id: self.id,
            initial,
            states,
        };
        validate::check(&definition)?;
        Ok(definition)
    }
}
