//! The interpreter: a running instance of one machine definition.

use crate::builder::BuildError;
use crate::checkpoint::{Checkpoint, CheckpointError, CHECKPOINT_VERSION};
use crate::core::{
    Context, Envelope, Event, InstanceId, MachineDefinition, Signal, State, StateHistory,
    StateTransition,
};
use crate::effects::table::{Effect, EffectInput, EffectTable};
use crate::effects::transition::{
    resolve_transitions, DispatchError, DispatchOutcome, ProtocolViolation, TransitionTable,
};
use crate::state_enum;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

state_enum! {
    /// Lifecycle of an instance.
    pub enum InstanceStatus {
        Idle = "idle",
        Running = "running",
        Done = "done",
    }
    final: [Done]
}

/// Callback receiving every signal an instance emits.
pub type Subscriber = Box<dyn FnMut(&Envelope) + Send>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Point-in-time view of an instance, as handed to the rendering layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub machine: String,
    pub state: String,
    pub context: Context,
    /// Metadata of the current state
    pub meta: Value,
    /// Event types the current state accepts
    pub next_events: Vec<String>,
    pub done: bool,
    pub output: Option<Value>,
}

/// A running machine.
///
/// Instances are constructed idle so the spawner can subscribe before the
/// first signal; `start` makes them accept events. Once a terminal state is
/// reached the instance emits its output exactly once and rejects every
/// further dispatch.
///
/// # Example
///
/// ```rust
/// use waypoint::builder::{DefinitionBuilder, StateBuilder};
/// use waypoint::core::{Context, Event};
/// use waypoint::effects::{DispatchOutcome, EffectTable, MachineInstance};
///
/// let definition = DefinitionBuilder::new("door")
///     .initial("closed")
///     .state(StateBuilder::new("closed").goto("OPEN", "open"))
///     .state(StateBuilder::new("open").terminal())
///     .build()
///     .unwrap();
///
/// let mut door = MachineInstance::new(definition, &EffectTable::new(), Context::new()).unwrap();
/// door.start();
///
/// assert_eq!(door.dispatch(Event::new("KNOCK")).unwrap(), DispatchOutcome::Ignored);
/// door.dispatch(Event::new("OPEN")).unwrap();
/// assert!(door.is_done());
/// assert!(door.dispatch(Event::new("OPEN")).is_err());
/// ```
pub struct MachineInstance {
    id: InstanceId,
    definition: Arc<MachineDefinition>,
    transitions: TransitionTable,
    current: String,
    context: Context,
    status: InstanceStatus,
    output: Option<Value>,
    history: StateHistory,
    subscribers: Vec<(Subscription, Subscriber)>,
    next_subscription: u64,
}

enum Produced {
    Patch(Map<String, Value>),
    Notice(Option<Event>),
}

impl MachineInstance {
    /// Validate the definition and bind all of its effects.
    pub fn new(
        definition: impl Into<Arc<MachineDefinition>>,
        effects: &EffectTable,
        context: Context,
    ) -> Result<Self, BuildError> {
        let definition = definition.into();
        crate::validate::check(&definition)?;
        let transitions = resolve_transitions(&definition, effects)?;

        Ok(Self {
            id: InstanceId::new(),
            current: definition.initial.clone(),
            definition,
            transitions,
            context,
            status: InstanceStatus::Idle,
            output: None,
            history: StateHistory::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn definition(&self) -> &MachineDefinition {
        &self.definition
    }

    pub fn current_state(&self) -> &str {
        &self.current
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status.is_final()
    }

    /// Terminal output, once the instance is done.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    /// Metadata of the current state.
    pub fn meta(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.definition
            .state(&self.current)
            .map(|node| &node.meta)
            .unwrap_or(&NULL)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            machine: self.definition.id.clone(),
            state: self.current.clone(),
            context: self.context.clone(),
            meta: self.meta().clone(),
            next_events: self
                .definition
                .state(&self.current)
                .map(|node| node.next_events())
                .unwrap_or_default(),
            done: self.is_done(),
            output: self.output.clone(),
        }
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> Subscription
    where
        F: FnMut(&Envelope) + Send + 'static,
    {
        self.add_subscriber(Box::new(subscriber))
    }

    pub(crate) fn add_subscriber(&mut self, subscriber: Subscriber) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((subscription, subscriber));
        subscription
    }

    /// Drop a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != subscription);
        self.subscribers.len() != before
    }

    /// Begin accepting events. Terminates at once if the initial state is
    /// terminal. Calling it again has no effect.
    pub fn start(&mut self) {
        if self.status != InstanceStatus::Idle {
            return;
        }
        self.status = InstanceStatus::Running;
        debug!(machine = %self.definition.id, instance = %self.id, state = %self.current, "Instance started");

        if self.current_is_terminal() {
            self.finish();
        }
    }

    /// Apply one event.
    ///
    /// Effects run in declared order against the pre-transition context;
    /// assign patches are merged in that order and notifications are sent
    /// as they are produced. Only then does the state change.
    pub fn dispatch(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        match self.status {
            InstanceStatus::Idle => {
                return Err(ProtocolViolation::NotStarted {
                    machine: self.definition.id.clone(),
                }
                .into())
            }
            InstanceStatus::Done => {
                warn!(
                    machine = %self.definition.id,
                    event = %event.kind,
                    "Rejected event sent to terminated instance"
                );
                return Err(ProtocolViolation::AlreadyTerminated {
                    machine: self.definition.id.clone(),
                    state: self.current.clone(),
                }
                .into());
            }
            InstanceStatus::Running => {}
        }

        let Some(transition) = self
            .transitions
            .get(&self.current)
            .and_then(|by_event| by_event.get(&event.kind))
            .cloned()
        else {
            debug!(
                machine = %self.definition.id,
                state = %self.current,
                event = %event.kind,
                "Event ignored in current state"
            );
            return Ok(DispatchOutcome::Ignored);
        };

        let mut next_context: Option<Context> = None;
        for (_, effect) in &transition.effects {
            let produced = {
                let input = EffectInput {
                    state: &self.current,
                    context: &self.context,
                    event: &event,
                };
                match effect {
                    Effect::Assign(f) => Produced::Patch(f(&input)),
                    Effect::Notify(f) => Produced::Notice(f(&input)),
                }
            };
            match produced {
                Produced::Patch(patch) => next_context
                    .get_or_insert_with(|| self.context.clone())
                    .extend(patch),
                Produced::Notice(Some(notification)) => self.emit(Signal::Notify(notification)),
                Produced::Notice(None) => {}
            }
        }
        if let Some(context) = next_context {
            self.context = context;
        }

        let Some(target) = transition.target.clone() else {
            return Ok(DispatchOutcome::Stayed {
                state: self.current.clone(),
            });
        };

        let from = std::mem::replace(&mut self.current, target.clone());
        self.history = self.history.record(StateTransition {
            from: from.clone(),
            to: target.clone(),
            event: event.kind.clone(),
            timestamp: Utc::now(),
        });
        info!(
            machine = %self.definition.id,
            from = %from,
            to = %target,
            event = %event.kind,
            "Transition"
        );

        if self.current_is_terminal() {
            let output = self.finish();
            return Ok(DispatchOutcome::Terminated {
                state: target,
                output,
            });
        }

        Ok(DispatchOutcome::Transitioned { from, to: target })
    }

    /// Capture the instance for later `resume`.
    pub fn checkpoint(&self) -> Result<Checkpoint, CheckpointError> {
        let context = serde_json::to_string(&self.context)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))?;

        Ok(Checkpoint {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            machine: self.definition.id.clone(),
            state: self.current.clone(),
            context,
            done: self.is_done(),
            history: self.history.clone(),
        })
    }

    /// Rebuild a started instance from a checkpoint. A terminal checkpoint
    /// yields a terminal instance that does not emit its output again.
    pub fn resume(
        definition: impl Into<Arc<MachineDefinition>>,
        effects: &EffectTable,
        checkpoint: &Checkpoint,
    ) -> Result<Self, CheckpointError> {
        checkpoint.validate()?;
        let mut instance = Self::new(definition, effects, checkpoint.context()?)?;

        if checkpoint.machine != instance.definition.id {
            return Err(CheckpointError::ValidationFailed(format!(
                "checkpoint is for '{}', not '{}'",
                checkpoint.machine, instance.definition.id
            )));
        }
        if instance.definition.state(&checkpoint.state).is_none() {
            return Err(CheckpointError::ValidationFailed(format!(
                "state '{}' is not defined by '{}'",
                checkpoint.state, instance.definition.id
            )));
        }

        instance.current = checkpoint.state.clone();
        instance.history = checkpoint.history.clone();
        if checkpoint.done || instance.current_is_terminal() {
            instance.status = InstanceStatus::Done;
            instance.output = Some(instance.build_output());
        } else {
            instance.status = InstanceStatus::Running;
        }
        Ok(instance)
    }

    fn current_is_terminal(&self) -> bool {
        self.definition
            .state(&self.current)
            .is_some_and(|node| node.terminal)
    }

    fn build_output(&self) -> Value {
        self.definition
            .state(&self.current)
            .and_then(|node| node.output.as_ref())
            .map(|builder| builder.build(&self.context))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    fn finish(&mut self) -> Value {
        let output = self.build_output();
        self.status = InstanceStatus::Done;
        self.output = Some(output.clone());
        info!(machine = %self.definition.id, state = %self.current, "Instance terminated");
        self.emit(Signal::Done(output.clone()));
        output
    }

    fn emit(&mut self, signal: Signal) {
        let envelope = Envelope {
            source: self.id,
            machine: self.definition.id.clone(),
            signal,
        };
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&envelope);
        }
    }
}

impl std::fmt::Debug for MachineInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineInstance")
            .field("id", &self.id)
            .field("machine", &self.definition.id)
            .field("state", &self.current)
            .field("status", &self.status)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{outcome_state, DefinitionBuilder, StateBuilder, TransitionBuilder};
    use crate::core::{ContextPatch, OutputBuilder};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn counter() -> MachineDefinition {
        DefinitionBuilder::new("counter")
            .initial("counting")
            .state(
                StateBuilder::new("counting")
                    .on("INC", TransitionBuilder::internal().effect("inc"))
                    .on(
                        "STOP",
                        TransitionBuilder::to("stopped")
                            .effect("announce")
                            .effect("inc")
                            .effect("double"),
                    ),
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
                patch.insert("doubled".into(), json!(true));
                patch
            })
            .notify("announce", |input| {
                Some(Event::new("STOPPING").with("count", count(input.context)))
            })
    }

    fn recorder(machine: &mut MachineInstance) -> Arc<Mutex<Vec<Envelope>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.subscribe(move |envelope| sink.lock().unwrap().push(envelope.clone()));
        seen
    }

    fn started(definition: MachineDefinition, effects: &EffectTable) -> MachineInstance {
        let mut machine = MachineInstance::new(definition, effects, Context::new()).unwrap();
        machine.start();
        machine
    }

    #[test]
    fn unknown_effect_fails_construction() {
        let result = MachineInstance::new(counter(), &EffectTable::new(), Context::new());
        assert!(matches!(result, Err(BuildError::UnknownEffect { .. })));
    }

    #[test]
    fn dispatch_before_start_is_rejected() {
        let mut machine =
            MachineInstance::new(counter(), &counter_effects(), Context::new()).unwrap();

        let err = machine.dispatch(Event::new("INC")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Protocol(ProtocolViolation::NotStarted { .. })
        ));
        assert_eq!(machine.status(), InstanceStatus::Idle);
    }

    #[test]
    fn unknown_event_is_ignored() {
        let mut machine = started(counter(), &counter_effects());

        assert_eq!(
            machine.dispatch(Event::new("NOPE")).unwrap(),
            DispatchOutcome::Ignored
        );
        assert_eq!(machine.current_state(), "counting");
        assert!(machine.history().is_empty());
    }

    #[test]
    fn targetless_transition_stays_without_history() {
        let mut machine = started(counter(), &counter_effects());

        let outcome = machine.dispatch(Event::new("INC")).unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Stayed {
                state: "counting".to_string()
            }
        );
        assert_eq!(count(machine.context()), 1);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn effects_see_pre_transition_context_and_later_patches_win() {
        let mut machine = started(counter(), &counter_effects());
        machine.dispatch(Event::new("INC")).unwrap();
        machine.dispatch(Event::new("INC")).unwrap();

        machine.dispatch(Event::new("STOP")).unwrap();

        // inc and double both read count == 2; double is declared last
        assert_eq!(count(machine.context()), 4);
        assert_eq!(machine.context()["doubled"], json!(true));
    }

    #[test]
    fn notification_precedes_termination_and_sees_old_context() {
        let mut machine = started(counter(), &counter_effects());
        let seen = recorder(&mut machine);
        machine.dispatch(Event::new("INC")).unwrap();

        machine.dispatch(Event::new("STOP")).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[0].signal,
            Signal::Notify(Event::new("STOPPING").with("count", 1))
        );
        assert_eq!(seen[1].signal, Signal::Done(json!(2)));
        assert!(seen.iter().all(|e| e.source == machine.id()));
    }

    #[test]
    fn terminal_instance_rejects_events_without_mutation() {
        let mut machine = started(counter(), &counter_effects());
        let seen = recorder(&mut machine);
        machine.dispatch(Event::new("STOP")).unwrap();
        let before = machine.snapshot();

        let err = machine.dispatch(Event::new("INC")).unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Protocol(ProtocolViolation::AlreadyTerminated { .. })
        ));
        assert_eq!(machine.snapshot(), before);
        assert_eq!(machine.output(), Some(&json!(0)));
        let done_count = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e.signal, Signal::Done(_)))
            .count();
        assert_eq!(done_count, 1);
    }

    #[test]
    fn terminal_without_output_builder_yields_empty_object() {
        let definition = DefinitionBuilder::new("one-shot")
            .initial("ready")
            .state(StateBuilder::new("ready").goto("GO", "gone"))
            .state(StateBuilder::new("gone").terminal())
            .build()
            .unwrap();
        let mut machine = started(definition, &EffectTable::new());

        let outcome = machine.dispatch(Event::new("GO")).unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Terminated {
                state: "gone".to_string(),
                output: json!({})
            }
        );
    }

    #[test]
    fn terminal_initial_state_finishes_on_start() {
        let definition = DefinitionBuilder::new("instant")
            .initial("done")
            .state(outcome_state("done", "complete"))
            .build()
            .unwrap();
        let mut machine = MachineInstance::new(definition, &EffectTable::new(), Context::new())
            .unwrap();
        let seen = recorder(&mut machine);

        machine.start();
        machine.start();

        assert!(machine.is_done());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn unsubscribed_callbacks_receive_nothing() {
        let mut machine = started(counter(), &counter_effects());
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let subscription = machine.subscribe(move |_| *sink.lock().unwrap() += 1);

        assert!(machine.unsubscribe(subscription));
        assert!(!machine.unsubscribe(subscription));
        machine.dispatch(Event::new("STOP")).unwrap();

        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn snapshot_exposes_meta_and_next_events() {
        let definition = DefinitionBuilder::new("pod")
            .initial("name")
            .state(
                StateBuilder::new("name")
                    .meta(json!({"label": "What is your name", "type": "input"}))
                    .goto("SUBMIT", "completed")
                    .goto("GO_BACK", "quit"),
            )
            .state(outcome_state("completed", "complete"))
            .state(outcome_state("quit", "quit"))
            .build()
            .unwrap();
        let machine = started(definition, &EffectTable::new());

        let snapshot = machine.snapshot();

        assert_eq!(snapshot.state, "name");
        assert_eq!(snapshot.meta["type"], "input");
        assert_eq!(snapshot.next_events, vec!["GO_BACK", "SUBMIT"]);
        assert!(!snapshot.done);
    }

    #[test]
    fn history_records_accepted_transitions() {
        let mut machine = started(counter(), &counter_effects());
        machine.dispatch(Event::new("INC")).unwrap();
        machine.dispatch(Event::new("STOP")).unwrap();

        assert_eq!(machine.history().get_path(), vec!["counting", "stopped"]);
        assert_eq!(machine.history().events(), vec!["STOP"]);
    }

    #[test]
    fn checkpoint_resume_preserves_state_and_context() {
        let mut machine = started(counter(), &counter_effects());
        machine.dispatch(Event::new("INC")).unwrap();
        let checkpoint = machine.checkpoint().unwrap();

        let mut resumed =
            MachineInstance::resume(counter(), &counter_effects(), &checkpoint).unwrap();

        assert_eq!(resumed.snapshot(), machine.snapshot());
        assert_ne!(resumed.id(), machine.id());
        resumed.dispatch(Event::new("STOP")).unwrap();
        assert_eq!(resumed.output(), Some(&json!(2)));
    }

    #[test]
    fn resumed_terminal_instance_stays_terminal() {
        let mut machine = started(counter(), &counter_effects());
        machine.dispatch(Event::new("STOP")).unwrap();
        let checkpoint = machine.checkpoint().unwrap();

        let mut resumed =
            MachineInstance::resume(counter(), &counter_effects(), &checkpoint).unwrap();

        assert!(resumed.is_done());
        assert_eq!(resumed.output(), machine.output());
        assert!(resumed.dispatch(Event::new("INC")).is_err());
    }

    #[test]
    fn resume_rejects_foreign_checkpoint() {
        let machine = started(counter(), &counter_effects());
        let mut checkpoint = machine.checkpoint().unwrap();
        checkpoint.state = "elsewhere".to_string();

        let result = MachineInstance::resume(counter(), &counter_effects(), &checkpoint);
        assert!(matches!(result, Err(CheckpointError::ValidationFailed(_))));

        checkpoint.state = "counting".to_string();
        checkpoint.machine = "other".to_string();
        let result = MachineInstance::resume(counter(), &counter_effects(), &checkpoint);
        assert!(matches!(result, Err(CheckpointError::ValidationFailed(_))));
    }
}
