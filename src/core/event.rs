//! Events and machine context.
//!
//! Both are free-form JSON-shaped data. A context is owned by exactly one
//! machine instance; information only crosses between instances inside
//! events and terminal outputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured data owned by a single machine instance.
pub type Context = Map<String, Value>;

/// Partial update produced by an assign effect. Later keys win.
pub type ContextPatch = Map<String, Value>;

/// An event dispatched into a machine, or a notification sent out of one.
///
/// # Example
///
/// ```rust
/// use waypoint::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("SUBMIT").with("answer", "Ada");
/// assert_eq!(event.kind, "SUBMIT");
/// assert_eq!(event.get("answer"), Some(&json!("Ada")));
///
/// let parsed: Event = serde_json::from_value(json!({"type": "SUBMIT", "answer": "Ada"})).unwrap();
/// assert_eq!(parsed, event);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type, matched against a state's `on` table
    #[serde(rename = "type")]
    pub kind: String,
    /// Everything else carried by the event
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Attach a payload field, returning the event.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Read a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Read a payload field as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_payload_is_flattened() {
        let event = Event::new("LOADED").with("user", json!({"name": "Ada"}));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json, json!({"type": "LOADED", "user": {"name": "Ada"}}));
    }

    #[test]
    fn get_str_ignores_non_strings() {
        let event = Event::new("SUBMIT").with("answer", 42);

        assert_eq!(event.get_str("answer"), None);
        assert_eq!(event.get("answer"), Some(&json!(42)));
        assert_eq!(event.get("missing"), None);
    }
}
