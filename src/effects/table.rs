//! Effect tables: the bindings from effect ids to executable effects.

use crate::builder::BuildError;
use crate::core::{Context, ContextPatch, Event};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What an effect may look at: the pre-transition state, the context as it
/// was before the transition, and the triggering event.
#[derive(Clone, Copy, Debug)]
pub struct EffectInput<'a> {
    pub state: &'a str,
    pub context: &'a Context,
    pub event: &'a Event,
}

/// Pure context update.
pub type AssignFn = Arc<dyn Fn(&EffectInput<'_>) -> ContextPatch + Send + Sync>;

/// Outbound notification; `None` sends nothing.
pub type NotifyFn = Arc<dyn Fn(&EffectInput<'_>) -> Option<Event> + Send + Sync>;

/// A resolved, executable effect.
#[derive(Clone)]
pub enum Effect {
    Assign(AssignFn),
    Notify(NotifyFn),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assign(_) => f.write_str("Effect::Assign"),
            Self::Notify(_) => f.write_str("Effect::Notify"),
        }
    }
}

/// Effect bindings supplied by whoever spawns an instance.
///
/// The same definition can be run with different tables, which is how one
/// question shape can report to different parents.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{ContextPatch, Event};
/// use waypoint::effects::EffectTable;
/// use serde_json::json;
///
/// let table = EffectTable::new()
///     .assign("saveUser", |input| {
///         let mut patch = ContextPatch::new();
///         patch.insert("user".into(), input.event.get("user").cloned().unwrap_or(json!(null)));
///         patch
///     })
///     .notify("previousQuestion", |_| Some(Event::new("PREVIOUS")));
///
/// assert!(table.contains("saveUser"));
/// assert!(table.resolve("machine", "missing").is_err());
/// ```
#[derive(Clone, Default)]
pub struct EffectTable {
    effects: HashMap<String, Effect>,
}

impl EffectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to a context update.
    pub fn assign<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EffectInput<'_>) -> ContextPatch + Send + Sync + 'static,
    {
        self.effects.insert(id.into(), Effect::Assign(Arc::new(f)));
        self
    }

    /// Bind `id` to an outbound notification.
    pub fn notify<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EffectInput<'_>) -> Option<Event> + Send + Sync + 'static,
    {
        self.effects.insert(id.into(), Effect::Notify(Arc::new(f)));
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    /// Resolve an effect id declared by `machine`.
    pub fn resolve(&self, machine: &str, id: &str) -> Result<Effect, BuildError> {
        self.effects
            .get(id)
            .cloned()
            .ok_or_else(|| BuildError::UnknownEffect {
                machine: machine.to_string(),
                effect: id.to_string(),
            })
    }
}

impl fmt::Debug for EffectTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.effects.keys().collect();
        ids.sort();
        f.debug_struct("EffectTable").field("effects", &ids).finish()
    }
}
