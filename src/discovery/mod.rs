//! The Discovery Workflow and the Establish-User machine it spawns.
//!
//! The workflow moves through `loading`, `welcome`, `questions` and
//! `submitting` to either `done` or `error`. Only `loading` and `questions`
//! have a child; every other phase waits for an external event.

pub mod establish_user;
mod workflow;

pub use establish_user::EstablishStep;
pub use workflow::{definition, effects, events, DiscoveryPhase, DiscoveryWorkflow, MACHINE_ID};
