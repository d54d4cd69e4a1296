//! Core data types.
//!
//! This module holds the pure data of the interpreter:
//! - Machine definitions, state nodes and transition specs
//! - Events and context
//! - Instance identity and outbound signals
//! - The `State` trait for typed state enums
//! - Immutable history tracking
//!
//! Nothing here runs effects or owns subscribers.

mod definition;
mod event;
mod history;
mod signal;
mod state;

pub use definition::{MachineDefinition, OutputBuilder, StateNode, TransitionSpec};
pub use event::{Context, ContextPatch, Event};
pub use history::{StateHistory, StateTransition};
pub use signal::{Envelope, InstanceId, Signal};
pub use state::State;
