//! Builder API for constructing machine definitions.
//!
//! Definitions can be deserialized from JSON, but the workflows shipped with
//! this crate are assembled with these fluent builders, which validate the
//! result before handing it out.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::DefinitionBuilder;
pub use transition::{StateBuilder, TransitionBuilder};

use crate::core::OutputBuilder;
use serde_json::json;

/// A terminal state whose output is `{"value": <value>}`.
///
/// Question pods use this to tell the orchestrator whether they finished
/// forwards (`"complete"`) or backwards.
///
/// # Example
///
/// ```
/// use waypoint::builder::{outcome_state, DefinitionBuilder, StateBuilder};
///
/// let pod = DefinitionBuilder::new("pod")
///     .initial("ask")
///     .state(StateBuilder::new("ask").goto("SUBMIT", "completed").goto("GO_BACK", "quit"))
///     .state(outcome_state("completed", "complete"))
///     .state(outcome_state("quit", "quit"))
///     .build()
///     .unwrap();
///
/// assert!(pod.state("quit").unwrap().terminal);
/// ```
pub fn outcome_state(id: impl Into<String>, value: &str) -> StateBuilder {
    StateBuilder::new(id).output(OutputBuilder::Constant(json!({ "value": value })))
}
