//! Machine definitions: immutable, serializable descriptions of a state machine.
//!
//! A definition names effects but never contains them. Effects are bound
//! when an instance is constructed, so the same definition can be run by
//! different spawners with different bindings.

use super::event::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Immutable description of a finite state machine.
///
/// # Example
///
/// ```rust
/// use waypoint::core::MachineDefinition;
///
/// let definition: MachineDefinition = serde_json::from_str(r#"{
///     "id": "toggle",
///     "initial": "off",
///     "states": {
///         "off": { "on": { "FLIP": "on" } },
///         "on": { "on": { "FLIP": "off", "STOP": "stopped" } },
///         "stopped": { "final": true }
///     }
/// }"#).unwrap();
///
/// assert_eq!(definition.initial, "off");
/// assert!(definition.state("stopped").unwrap().terminal);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineDefinition {
    pub id: String,
    pub initial: String,
    pub states: BTreeMap<String, StateNode>,
}

impl MachineDefinition {
    pub fn state(&self, id: &str) -> Option<&StateNode> {
        self.states.get(id)
    }

    /// Every effect id referenced by any transition.
    pub fn effect_ids(&self) -> BTreeSet<&str> {
        self.states
            .values()
            .flat_map(|node| node.on.values())
            .flat_map(|transition| transition.effects.iter().map(String::as_str))
            .collect()
    }

    /// Ids of the states that can be answered, i.e. the non-terminal ones.
    pub fn question_ids(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, node)| !node.terminal)
            .map(|(id, _)| id.as_str())
    }
}

/// One state of a machine definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    /// Transition table keyed by event type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<String, TransitionSpec>,

    #[serde(default, rename = "final", skip_serializing_if = "is_false")]
    pub terminal: bool,

    /// Builds the terminal output; only meaningful on terminal states
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputBuilder>,

    /// Opaque payload for the rendering layer (labels, input type)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub meta: Value,
}

impl StateNode {
    /// Event types this state reacts to, in sorted order.
    pub fn next_events(&self) -> Vec<String> {
        self.on.keys().cloned().collect()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A transition: optional target plus the effects to run, in order.
///
/// A transition without a target runs its effects and stays put without
/// re-entering the current state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransitionRepr")]
pub struct TransitionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransitionRepr {
    Target(String),
    Full {
        #[serde(default)]
        target: Option<String>,
        #[serde(default, alias = "actions")]
        effects: Vec<String>,
    },
}

impl From<TransitionRepr> for TransitionSpec {
    fn from(repr: TransitionRepr) -> Self {
        match repr {
            TransitionRepr::Target(target) => Self {
                target: Some(target),
                effects: Vec::new(),
            },
            TransitionRepr::Full { target, effects } => Self { target, effects },
        }
    }
}

/// Pure description of how a terminal state derives its output from context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputBuilder {
    /// Always the same value
    Constant(Value),
    /// The value of one context field, or null
    Field(String),
    /// An object holding the named context fields that are present
    Pick(Vec<String>),
}

impl OutputBuilder {
    pub fn build(&self, context: &Context) -> Value {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Field(name) => context.get(name).cloned().unwrap_or(Value::Null),
            Self::Pick(names) => {
                let picked: Map<String, Value> = names
                    .iter()
                    .filter_map(|name| context.get(name).map(|v| (name.clone(), v.clone())))
                    .collect();
                Value::Object(picked)
            }
        }
    }
}
