//! The interpreter and its effect resolver.
//!
//! This is the imperative shell around the pure definitions in `core`:
//! an [`EffectTable`] binds the effect ids a definition names to executable
//! effects, and a [`MachineInstance`] runs the definition against them.
//!
//! # Key Concepts
//!
//! - **Effects**: either a pure context patch (`assign`) or an outbound
//!   notification (`notify`); both are synchronous
//! - **Resolution**: every effect id is bound when the instance is built,
//!   so an unknown id is a construction error, never a runtime surprise
//! - **Dispatch**: one event, one transition, run to completion

mod machine;
mod table;
mod transition;

pub use machine::{InstanceStatus, MachineInstance, Snapshot, Subscriber, Subscription};
pub use table::{AssignFn, Effect, EffectInput, EffectTable, NotifyFn};
pub use transition::{
    resolve_transitions, DispatchError, DispatchOutcome, ProtocolViolation, ResolvedTransition,
    TransitionTable,
};
