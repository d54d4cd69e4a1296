//! The question flow orchestrator.
//!
//! Runs its own small machine (`playing` / `complete`) whose context holds
//! the progress index and the answer set. Every time `playing` is entered
//! the orchestrator spawns a fresh instance of the pod at `progress`, or
//! completes with the answer set once the pods run out.

use crate::builder::{BuildError, DefinitionBuilder, StateBuilder, TransitionBuilder};
use crate::core::{
    Context, ContextPatch, Envelope, Event, InstanceId, MachineDefinition, OutputBuilder, Signal,
};
use crate::effects::{
    DispatchError, DispatchOutcome, EffectTable, InstanceStatus, MachineInstance,
    ProtocolViolation, Snapshot, Subscriber, Subscription,
};
use crate::flow::events;
use crate::flow::pods::{check_pods, question_bindings, PodOutcome};
use crate::hierarchy::{Child, ChildSlot, Mailbox};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MACHINE_ID: &str = "questions-machine";
pub const PLAYING: &str = "playing";
pub const COMPLETE: &str = "complete";

const PROGRESS: &str = "progress";
const ANSWERS: &str = "answers";
/// Which pod index produced each answer
const OWNERS: &str = "owners";

fn progress_of(context: &Context) -> usize {
    context
        .get(PROGRESS)
        .and_then(Value::as_u64)
        .map_or(0, |p| p as usize)
}

fn map_of(context: &Context, key: &str) -> Map<String, Value> {
    context
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// The orchestrator's own definition.
pub fn definition() -> Result<MachineDefinition, BuildError> {
    DefinitionBuilder::new(MACHINE_ID)
        .initial(PLAYING)
        .state(
            StateBuilder::new(PLAYING)
                .on(events::ANSWER, TransitionBuilder::internal().effect("saveAnswer"))
                .on(events::NEXT, TransitionBuilder::to(PLAYING).effect("advance"))
                .on(events::PREVIOUS, TransitionBuilder::to(PLAYING).effect("retreat"))
                .on(
                    events::START_FRESH,
                    TransitionBuilder::to(PLAYING).effect("startFresh"),
                )
                .goto(events::DONE, COMPLETE),
        )
        .state(StateBuilder::new(COMPLETE).output(OutputBuilder::Field(ANSWERS.to_string())))
        .build()
}

/// Effects of the orchestrator's own machine. `retreat` needs the pod list
/// to know which answers belong to the questions being unwound.
pub fn effects(pods: Arc<[MachineDefinition]>) -> EffectTable {
    EffectTable::new()
        .assign("saveAnswer", |input| {
            let mut patch = ContextPatch::new();
            let Some(question_id) = input.event.get_str("questionId") else {
                return patch;
            };
            let answer = input.event.get("answer").cloned().unwrap_or(Value::Null);

            let mut answers = map_of(input.context, ANSWERS);
            let mut owners = map_of(input.context, OWNERS);
            answers.insert(question_id.to_string(), answer);
            owners.insert(question_id.to_string(), json!(progress_of(input.context)));

            patch.insert(ANSWERS.to_string(), Value::Object(answers));
            patch.insert(OWNERS.to_string(), Value::Object(owners));
            patch
        })
        .assign("advance", |input| {
            let mut patch = ContextPatch::new();
            patch.insert(PROGRESS.to_string(), json!(progress_of(input.context) + 1));
            patch
        })
        .assign("retreat", move |input| {
            let mut patch = ContextPatch::new();
            let progress = progress_of(input.context);

            // the question being left and the one being re-entered both go
            // stale; at the first question they are the same one
            let unwound: Vec<usize> = if progress == 0 {
                vec![0]
            } else {
                vec![progress, progress - 1]
            };
            let mut answers = map_of(input.context, ANSWERS);
            let mut owners = map_of(input.context, OWNERS);

            let mut stale: BTreeSet<String> = owners
                .iter()
                .filter(|(_, owner)| {
                    owner
                        .as_u64()
                        .is_some_and(|owner| unwound.contains(&(owner as usize)))
                })
                .map(|(id, _)| id.clone())
                .collect();
            for &index in &unwound {
                if let Some(pod) = pods.get(index) {
                    stale.extend(pod.question_ids().map(str::to_string));
                }
            }
            for id in &stale {
                answers.remove(id);
                owners.remove(id);
            }

            patch.insert(PROGRESS.to_string(), json!(progress.saturating_sub(1)));
            patch.insert(ANSWERS.to_string(), Value::Object(answers));
            patch.insert(OWNERS.to_string(), Value::Object(owners));
            patch
        })
        .assign("startFresh", |_| {
            let mut patch = ContextPatch::new();
            patch.insert(PROGRESS.to_string(), json!(0));
            patch.insert(ANSWERS.to_string(), json!({}));
            patch.insert(OWNERS.to_string(), json!({}));
            patch
        })
}

/// Runs an ordered list of question pods, one live pod at a time.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{Context, Event};
/// use waypoint::flow::{pods, QuestionFlow};
/// use serde_json::json;
///
/// let pods = vec![pods::linear("simple", "name", json!(null)).unwrap()];
/// let mut flow = QuestionFlow::new(pods, Context::new()).unwrap();
/// flow.start().unwrap();
///
/// flow.send(Event::new("SUBMIT").with("answer", "Ada")).unwrap();
///
/// assert!(flow.is_done());
/// assert_eq!(flow.output(), Some(&json!({"name": "Ada"})));
/// ```
pub struct QuestionFlow {
    machine: MachineInstance,
    pods: Arc<[MachineDefinition]>,
    bindings: EffectTable,
    active: ChildSlot<MachineInstance>,
    mailbox: Mailbox,
}

impl QuestionFlow {
    /// Build an orchestrator over `pods`, seeded with earlier `answers`.
    ///
    /// Every pod is validated and its effects resolved against the question
    /// bindings up front, so a bad pod fails here rather than mid-flow.
    pub fn new(
        pods: impl Into<Arc<[MachineDefinition]>>,
        answers: Context,
    ) -> Result<Self, BuildError> {
        let pods: Arc<[MachineDefinition]> = pods.into();
        check_pods(&pods)?;

        let mut context = Context::new();
        context.insert(PROGRESS.to_string(), json!(0));
        context.insert(ANSWERS.to_string(), Value::Object(answers));
        context.insert(OWNERS.to_string(), json!({}));
        let machine = MachineInstance::new(definition()?, &effects(Arc::clone(&pods)), context)?;

        Ok(Self {
            machine,
            pods,
            bindings: question_bindings(),
            active: ChildSlot::empty(),
            mailbox: Mailbox::new(),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.machine.id()
    }

    /// Start the orchestrator and spawn the first pod.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        if self.machine.status() != InstanceStatus::Idle {
            return Ok(());
        }
        self.machine.start();
        self.enter_playing()?;
        self.pump()
    }

    /// Deliver an external event.
    ///
    /// `START_FRESH` is handled by the orchestrator itself; everything else
    /// goes to the active pod.
    pub fn send(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        let own_event = event.kind == events::START_FRESH;
        let outcome = if own_event || self.machine.status() != InstanceStatus::Running {
            let outcome = self.machine.dispatch(event)?;
            self.react(&outcome)?;
            outcome
        } else {
            self.active.send(MACHINE_ID, event)?
        };
        self.pump()?;
        Ok(outcome)
    }

    pub fn progress(&self) -> usize {
        progress_of(self.machine.context())
    }

    pub fn answers(&self) -> Map<String, Value> {
        map_of(self.machine.context(), ANSWERS)
    }

    pub fn pods(&self) -> &[MachineDefinition] {
        &self.pods
    }

    /// The pod currently being asked, if any.
    pub fn active_question(&self) -> Option<&MachineInstance> {
        self.active.get()
    }

    pub fn question_snapshot(&self) -> Option<Snapshot> {
        self.active.get().map(MachineInstance::snapshot)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    pub fn is_done(&self) -> bool {
        self.machine.is_done()
    }

    /// The final answer set, once complete.
    pub fn output(&self) -> Option<&Value> {
        self.machine.output()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> Subscription
    where
        F: FnMut(&Envelope) + Send + 'static,
    {
        self.machine.subscribe(subscriber)
    }

    /// Turn queued pod signals into orchestrator events until none remain.
    fn pump(&mut self) -> Result<(), DispatchError> {
        while let Some(envelope) = self.mailbox.next() {
            if !self.active.is_current(envelope.source) {
                let violation = ProtocolViolation::StaleChild {
                    machine: MACHINE_ID.to_string(),
                    child: envelope.source,
                };
                warn!(error = %violation, pod = %envelope.machine, "Discarded signal");
                continue;
            }

            let event = match envelope.signal {
                Signal::Notify(event) => event,
                Signal::Done(output) => match PodOutcome::from_output(&output) {
                    PodOutcome::Advance => Event::new(events::NEXT),
                    PodOutcome::Retreat => Event::new(events::PREVIOUS),
                },
            };

            if event.kind == events::PREVIOUS && self.progress() == 0 {
                let pod_live = self.active.get().is_some_and(|pod| !pod.is_done());
                if pod_live {
                    debug!(pod = %envelope.machine, "Retreat before the first question ignored");
                    continue;
                }
            }

            let outcome = self.machine.dispatch(event)?;
            self.react(&outcome)?;
        }
        Ok(())
    }

    fn react(&mut self, outcome: &DispatchOutcome) -> Result<(), DispatchError> {
        match outcome {
            DispatchOutcome::Transitioned { to, .. } if to == PLAYING => self.enter_playing(),
            DispatchOutcome::Terminated { .. } => {
                self.active.clear();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn enter_playing(&mut self) -> Result<(), DispatchError> {
        self.active.clear();
        let progress = self.progress();

        match self.pods.get(progress) {
            Some(pod) => {
                let pod = MachineInstance::new(pod.clone(), &self.bindings, Context::new())?;
                debug!(progress, pod = %pod.definition().id, "Spawning question");
                self.active.install(pod, &self.mailbox)?;
                Ok(())
            }
            None => {
                debug!(progress, "No more questions");
                let outcome = self.machine.dispatch(Event::new(events::DONE))?;
                self.react(&outcome)
            }
        }
    }
}

impl Child for QuestionFlow {
    fn id(&self) -> InstanceId {
        self.machine.id()
    }

    fn machine(&self) -> &str {
        MACHINE_ID
    }

    fn start(&mut self) -> Result<(), DispatchError> {
        QuestionFlow::start(self)
    }

    fn send(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        QuestionFlow::send(self, event)
    }

    fn add_subscriber(&mut self, subscriber: Subscriber) -> Subscription {
        Child::add_subscriber(&mut self.machine, subscriber)
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.machine.unsubscribe(subscription)
    }

    fn is_done(&self) -> bool {
        self.machine.is_done()
    }
}
