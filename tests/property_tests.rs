//! Property-based tests for the interpreter and the question flow.
//!
//! These tests use proptest to check that dispatch is deterministic, that
//! terminated instances never change, and that stepping back never leaves a
//! stale answer behind.

use proptest::prelude::*;
use serde_json::{json, Value};
use waypoint::builder::{outcome_state, DefinitionBuilder, StateBuilder, TransitionBuilder};
use waypoint::core::{Context, ContextPatch, Event, MachineDefinition, OutputBuilder};
use waypoint::effects::{EffectTable, MachineInstance};
use waypoint::flow::{pods, QuestionFlow};

const EVENTS: [&str; 6] = ["INC", "DOUBLE", "FLIP", "NOOP", "STOP", "UNKNOWN"];

fn counter() -> MachineDefinition {
    DefinitionBuilder::new("counter")
        .initial("even")
        .state(
            StateBuilder::new("even")
                .on("INC", TransitionBuilder::internal().effect("inc"))
                .on("DOUBLE", TransitionBuilder::internal().effect("double").effect("inc"))
                .on("FLIP", TransitionBuilder::to("odd").effect("inc"))
                .on("STOP", TransitionBuilder::to("stopped")),
        )
        .state(
            StateBuilder::new("odd")
                .on("INC", TransitionBuilder::internal().effect("inc"))
                .on("FLIP", TransitionBuilder::to("even").effect("double"))
                .goto("NOOP", "odd"),
        )
        .state(StateBuilder::new("stopped").output(OutputBuilder::Field("count".to_string())))
        .build()
        .unwrap()
}

fn count(context: &Context) -> i64 {
    context.get("count").and_then(Value::as_i64).unwrap_or(0)
}

fn counter_effects() -> EffectTable {
    EffectTable::new()
        .assign("inc", |input| {
            let mut patch = ContextPatch::new();
            patch.insert("count".into(), json!(count(input.context) + 1));
            patch
        })
        .assign("double", |input| {
            let mut patch = ContextPatch::new();
            patch.insert("count".into(), json!(count(input.context) * 2));
            patch
        })
}

fn run(events: &[&str]) -> MachineInstance {
    let mut instance = MachineInstance::new(counter(), &counter_effects(), Context::new()).unwrap();
    instance.start();
    for kind in events {
        let _ = instance.dispatch(Event::new(*kind));
    }
    instance
}

prop_compose! {
    fn arbitrary_events()(indices in prop::collection::vec(0..EVENTS.len(), 0..40)) -> Vec<&'static str> {
        indices.into_iter().map(|i| EVENTS[i]).collect()
    }
}

/// Inputs a user can give while the sample flow is running.
const FLOW_INPUTS: [&str; 5] = ["SUBMIT", "GO_BACK", "PICK_B", "PICK_C", "OK"];

fn sample_flow() -> QuestionFlow {
    let pods = vec![
        pods::linear("first", "name", Value::Null).unwrap(),
        DefinitionBuilder::new("second")
            .initial("a")
            .state(
                StateBuilder::new("a")
                    .on("PICK_B", TransitionBuilder::to("b").effect("saveAnswer"))
                    .on("PICK_C", TransitionBuilder::to("c").effect("saveAnswer"))
                    .goto("GO_BACK", "back"),
            )
            .state(
                StateBuilder::new("b")
                    .on("SUBMIT", TransitionBuilder::to("completed").effect("saveAnswer"))
                    .goto("GO_BACK", "a"),
            )
            .state(
                StateBuilder::new("c")
                    .on("OK", TransitionBuilder::to("completed").effect("saveAnswer"))
                    .on("GO_BACK", TransitionBuilder::to("a").effect("update")),
            )
            .state(outcome_state("completed", "complete"))
            .state(outcome_state("back", "quit"))
            .build()
            .unwrap(),
        pods::linear("third", "colour", Value::Null).unwrap(),
    ];
    let mut flow = QuestionFlow::new(pods, Context::new()).unwrap();
    flow.start().unwrap();
    flow
}

prop_compose! {
    fn arbitrary_inputs()(indices in prop::collection::vec(0..FLOW_INPUTS.len(), 0..30)) -> Vec<&'static str> {
        indices.into_iter().map(|i| FLOW_INPUTS[i]).collect()
    }
}

fn owned_by(flow: &QuestionFlow, index: usize) -> Vec<String> {
    flow.pods()[index].question_ids().map(str::to_string).collect()
}

proptest! {
    #[test]
    fn dispatch_is_deterministic(events in arbitrary_events()) {
        let a = run(&events);
        let b = run(&events);

        prop_assert_eq!(a.current_state(), b.current_state());
        prop_assert_eq!(a.context(), b.context());
        prop_assert_eq!(a.output(), b.output());
        prop_assert_eq!(a.history().get_path(), b.history().get_path());
    }

    #[test]
    fn terminated_instance_never_changes(events in arbitrary_events(), extra in arbitrary_events()) {
        let mut instance = run(&events);
        let _ = instance.dispatch(Event::new("STOP"));
        let before = instance.snapshot();

        for kind in extra {
            if instance.is_done() {
                prop_assert!(instance.dispatch(Event::new(kind)).is_err());
                prop_assert_eq!(&instance.snapshot(), &before);
            }
        }
    }

    #[test]
    fn history_length_matches_state_changes(events in arbitrary_events()) {
        let instance = run(&events);
        let path = instance.history().get_path();

        if instance.history().is_empty() {
            prop_assert!(path.is_empty());
            prop_assert_eq!(instance.current_state(), "even");
        } else {
            prop_assert_eq!(path.len(), instance.history().len() + 1);
            prop_assert_eq!(path.last().copied(), Some(instance.current_state()));
        }
    }

    #[test]
    fn retreat_never_leaves_stale_answers(inputs in arbitrary_inputs()) {
        let mut flow = sample_flow();

        for kind in inputs {
            if flow.is_done() {
                break;
            }
            let before = flow.progress();
            flow.send(Event::new(kind).with("answer", kind)).unwrap();
            let after = flow.progress();

            if after + 1 == before {
                let answers = flow.answers();
                for id in owned_by(&flow, before).into_iter().chain(owned_by(&flow, after)) {
                    prop_assert!(!answers.contains_key(&id), "stale answer for {}", id);
                }
            }
        }
    }

    #[test]
    fn at_most_one_live_question(inputs in arbitrary_inputs()) {
        let mut flow = sample_flow();

        for kind in inputs {
            if flow.is_done() {
                prop_assert!(flow.active_question().is_none());
                break;
            }
            flow.send(Event::new(kind)).unwrap();
            if let Some(question) = flow.active_question() {
                prop_assert_eq!(question.definition(), &flow.pods()[flow.progress()]);
            }
        }
    }
}
