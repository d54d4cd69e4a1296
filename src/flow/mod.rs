//! Question flows: an ordered list of question pods run one at a time.
//!
//! Pods report to the orchestrator only through signals. Answers arrive as
//! `ANSWER` notifications, and a pod's terminal output decides whether the
//! flow advances or steps back.

mod orchestrator;
pub mod pods;

pub use orchestrator::{definition, effects, QuestionFlow, COMPLETE, MACHINE_ID, PLAYING};
pub use pods::PodOutcome;

/// Events understood by the orchestrator's own machine.
pub mod events {
    /// A pod recorded an answer (`questionId`, `answer`)
    pub const ANSWER: &str = "ANSWER";
    pub const NEXT: &str = "NEXT";
    pub const PREVIOUS: &str = "PREVIOUS";
    /// Discard progress and answers and restart from the first pod
    pub const START_FRESH: &str = "START_FRESH";
    pub const DONE: &str = "DONE";
}
