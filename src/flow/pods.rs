//! Question pods: the per-question machines the orchestrator runs.
//!
//! A pod is plain data. What its effects do is decided here, by the
//! bindings the orchestrator supplies when it spawns one: answers and
//! explicit back signals become orchestrator notifications, and the pod's
//! terminal output decides between advancing and retreating.

use crate::builder::{outcome_state, BuildError, DefinitionBuilder, StateBuilder, TransitionBuilder};
use crate::core::{ContextPatch, Event, MachineDefinition};
use crate::effects::{resolve_transitions, EffectTable};
use crate::flow::events;
use crate::validate;
use serde_json::Value;

/// Event types a pod understands from the rendering layer.
pub mod inputs {
    pub const SUBMIT: &str = "SUBMIT";
    pub const GO_BACK: &str = "GO_BACK";
}

/// Effect ids pods may reference.
pub const SAVE_ANSWER: &str = "saveAnswer";
pub const PREVIOUS_QUESTION: &str = "previousQuestion";
pub const UPDATE: &str = "update";

/// Terminal output value meaning "finished forwards".
pub const FORWARD: &str = "complete";
/// Terminal output value conventionally used for "went back".
pub const BACKWARD: &str = "quit";

/// How a pod ended, read from its terminal output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodOutcome {
    Advance,
    Retreat,
}

impl PodOutcome {
    /// `{"value": "complete"}` advances; any other output retreats.
    pub fn from_output(output: &Value) -> Self {
        match output.get("value").and_then(Value::as_str) {
            Some(FORWARD) => Self::Advance,
            _ => Self::Retreat,
        }
    }
}

/// Bindings that translate a pod's effects into orchestrator events.
///
/// - `saveAnswer` notifies `ANSWER` with `questionId` (from the event, else
///   the state being left) and `answer` (from the event, else the event type)
/// - `previousQuestion` notifies `PREVIOUS`
/// - `update` changes nothing and notifies nobody
pub fn question_bindings() -> EffectTable {
    EffectTable::new()
        .notify(SAVE_ANSWER, |input| {
            let question_id = input.event.get_str("questionId").unwrap_or(input.state);
            let answer = input
                .event
                .get("answer")
                .cloned()
                .unwrap_or_else(|| Value::String(input.event.kind.clone()));
            Some(
                Event::new(events::ANSWER)
                    .with("questionId", question_id)
                    .with("answer", answer),
            )
        })
        .notify(PREVIOUS_QUESTION, |_| Some(Event::new(events::PREVIOUS)))
        .assign(UPDATE, |_| ContextPatch::new())
}

/// Check that every pod is structurally valid and only names effects the
/// question bindings provide.
pub fn check_pods(pods: &[MachineDefinition]) -> Result<(), BuildError> {
    let bindings = question_bindings();
    for pod in pods {
        validate::check(pod)?;
        resolve_transitions(pod, &bindings)?;
    }
    Ok(())
}

/// The linear input shape: one question state that either submits forwards
/// or goes back.
///
/// # Example
///
/// ```rust
/// use waypoint::flow::pods::linear;
/// use serde_json::json;
///
/// let pod = linear("sample-question-simple", "name", json!({"label": "What is your name"})).unwrap();
/// assert_eq!(pod.initial, "name");
/// assert_eq!(pod.question_ids().collect::<Vec<_>>(), vec!["name"]);
/// ```
pub fn linear(id: &str, question: &str, meta: Value) -> Result<MachineDefinition, BuildError> {
    DefinitionBuilder::new(id)
        .initial(question)
        .state(
            StateBuilder::new(question)
                .meta(meta)
                .on(
                    inputs::SUBMIT,
                    TransitionBuilder::to("completed").effect(SAVE_ANSWER),
                )
                .goto(inputs::GO_BACK, "quit"),
        )
        .state(outcome_state("completed", FORWARD))
        .state(outcome_state("quit", BACKWARD))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Context;
    use crate::effects::{Effect, EffectInput};
    use serde_json::json;

    fn notify(id: &str, state: &str, event: Event) -> Option<Event> {
        let context = Context::new();
        let input = EffectInput {
            state,
            context: &context,
            event: &event,
        };
        match question_bindings().resolve("pod", id).unwrap() {
            Effect::Notify(f) => f(&input),
            Effect::Assign(_) => panic!("{id} should notify"),
        }
    }

    #[test]
    fn outcome_reads_value_field() {
        assert_eq!(
            PodOutcome::from_output(&json!({"value": "complete"})),
            PodOutcome::Advance
        );
        assert_eq!(
            PodOutcome::from_output(&json!({"value": "quit"})),
            PodOutcome::Retreat
        );
        assert_eq!(PodOutcome::from_output(&json!({})), PodOutcome::Retreat);
    }

    #[test]
    fn save_answer_uses_explicit_question_id() {
        let event = Event::new("SUBMIT")
            .with("questionId", "nickname")
            .with("answer", "Ada");

        assert_eq!(
            notify(SAVE_ANSWER, "name", event),
            Some(
                Event::new(events::ANSWER)
                    .with("questionId", "nickname")
                    .with("answer", "Ada")
            )
        );
    }

    #[test]
    fn save_answer_defaults_to_state_and_event_type() {
        assert_eq!(
            notify(SAVE_ANSWER, "a", Event::new("PICK_C")),
            Some(
                Event::new(events::ANSWER)
                    .with("questionId", "a")
                    .with("answer", "PICK_C")
            )
        );
    }

    #[test]
    fn previous_question_notifies_previous() {
        assert_eq!(
            notify(PREVIOUS_QUESTION, "a", Event::new("GO_BACK")),
            Some(Event::new(events::PREVIOUS))
        );
    }

    #[test]
    fn check_pods_rejects_unbound_effect() {
        let mut pod = linear("simple", "name", Value::Null).unwrap();
        pod.states
            .get_mut("name")
            .unwrap()
            .on
            .get_mut(inputs::GO_BACK)
            .unwrap()
            .effects
            .push("celebrate".to_string());

        assert_eq!(
            check_pods(&[pod]),
            Err(BuildError::UnknownEffect {
                machine: "simple".to_string(),
                effect: "celebrate".to_string()
            })
        );
    }

    #[test]
    fn linear_pod_has_forward_and_backward_terminals() {
        let pod = linear("simple", "name", json!({"type": "input"})).unwrap();

        let completed = pod.state("completed").unwrap();
        let quit = pod.state("quit").unwrap();
        assert!(completed.terminal && quit.terminal);
        assert_eq!(
            PodOutcome::from_output(&completed.output.as_ref().unwrap().build(&Context::new())),
            PodOutcome::Advance
        );
        assert_eq!(
            PodOutcome::from_output(&quit.output.as_ref().unwrap().build(&Context::new())),
            PodOutcome::Retreat
        );
    }
}
