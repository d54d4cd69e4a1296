//! Waypoint: a hierarchical state machine interpreter for guided journeys
//!
//! Machines are plain data. A [`MachineDefinition`](core::MachineDefinition)
//! names states, transitions and effects; the behaviour behind each effect
//! id is bound only when an instance is spawned, through an
//! [`EffectTable`](effects::EffectTable). Parents run children by spawning
//! them from data and listening to their signals, never by sharing context.
//!
//! # Core Concepts
//!
//! - **Definitions**: immutable, serializable state machines (`core`, `builder`)
//! - **Instances**: run-to-completion interpreters with copy-on-write context (`effects`)
//! - **Children**: at most one live child per parent, cancelled by unsubscribing (`hierarchy`)
//! - **Question flows**: an ordered list of question pods run one at a time (`flow`)
//! - **Discovery**: the root journey from establishing the user to submission (`discovery`)
//!
//! # Example
//!
//! ```rust
//! use waypoint::core::{Context, Event};
//! use waypoint::discovery::{DiscoveryPhase, DiscoveryWorkflow};
//! use waypoint::FlowConfig;
//! use serde_json::json;
//!
//! let config = FlowConfig::sample().unwrap();
//! let mut journey = DiscoveryWorkflow::from_config(config).unwrap();
//! journey.start().unwrap();
//!
//! journey.send(Event::new("LOADED").with("user", json!({"name": "Ada"}))).unwrap();
//! journey.send(Event::new("CONTINUE")).unwrap();
//! journey.send(Event::new("SUBMIT").with("answer", "Ada")).unwrap();
//! journey.send(Event::new("PICK_B")).unwrap();
//! journey.send(Event::new("SUBMIT").with("answer", "blue")).unwrap();
//!
//! assert_eq!(journey.phase(), DiscoveryPhase::Submitting);
//! assert_eq!(
//!     journey.answers(),
//!     *json!({"name": "Ada", "a": "PICK_B", "b": "blue"}).as_object().unwrap()
//! );
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod discovery;
pub mod effects;
pub mod flow;
pub mod hierarchy;
pub mod validate;

// Re-export commonly used types
pub use builder::{BuildError, DefinitionBuilder, StateBuilder, TransitionBuilder};
pub use config::{ConfigError, FlowConfig};
pub use core::{Context, Event, MachineDefinition, Signal, State};
pub use discovery::{DiscoveryPhase, DiscoveryWorkflow};
pub use effects::{DispatchError, DispatchOutcome, EffectTable, MachineInstance, ProtocolViolation};
pub use flow::QuestionFlow;
