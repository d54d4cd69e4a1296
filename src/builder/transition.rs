//! Builders for states and their transitions.

use crate::core::{OutputBuilder, StateNode, TransitionSpec};
use serde_json::Value;

/// Builder for a single transition.
#[derive(Clone, Debug, Default)]
pub struct TransitionBuilder {
    target: Option<String>,
    effects: Vec<String>,
}

impl TransitionBuilder {
    /// A transition into `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            effects: Vec::new(),
        }
    }

    /// A transition that runs its effects without leaving the state.
    pub fn internal() -> Self {
        Self::default()
    }

    /// Append an effect id. Effects run in the order they were added.
    pub fn effect(mut self, id: impl Into<String>) -> Self {
        self.effects.push(id.into());
        self
    }

    pub fn build(self) -> TransitionSpec {
        TransitionSpec {
            target: self.target,
            effects: self.effects,
        }
    }
}

/// Builder for one state node.
#[derive(Clone, Debug)]
pub struct StateBuilder {
    pub(crate) id: String,
    node: StateNode,
}

impl StateBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node: StateNode::default(),
        }
    }

    /// React to `event` with the given transition.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionBuilder) -> Self {
        self.node.on.insert(event.into(), transition.build());
        self
    }

    /// Shorthand for `.on(event, TransitionBuilder::to(target))`.
    pub fn goto(self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.on(event, TransitionBuilder::to(target))
    }

    /// Mark the state terminal.
    pub fn terminal(mut self) -> Self {
        self.node.terminal = true;
        self
    }

    /// Mark the state terminal with an output builder.
    pub fn output(mut self, output: OutputBuilder) -> Self {
        self.node.terminal = true;
        self.node.output = Some(output);
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.node.meta = meta;
        self
    }

    pub(crate) fn into_parts(self) -> (String, StateNode) {
        (self.id, self.node)
    }
}
