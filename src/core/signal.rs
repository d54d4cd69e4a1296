//! Instance identity and the signals an instance sends to its subscribers.

use super::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identity of a running machine instance.
///
/// Parents use it to tell the current child's signals apart from those of
/// a child that has already been replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound message from an instance.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal {
    /// Produced by a notify effect, before the transition completes
    Notify(Event),
    /// The instance reached a terminal state; carries its output
    Done(Value),
}

/// A signal tagged with the instance that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub source: InstanceId,
    pub machine: String,
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_ids_are_unique() {
        let a = InstanceId::new();
        let b = InstanceId::new();

        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn instance_id_displays_as_uuid() {
        let id = InstanceId::new();
        let text = id.to_string();

        assert_eq!(text.len(), 36);
        assert!(Uuid::parse_str(&text).is_ok());
    }
}
