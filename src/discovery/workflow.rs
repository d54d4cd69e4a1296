//! The Discovery Workflow: the root of the whole journey.

use super::establish_user;
use crate::builder::{BuildError, DefinitionBuilder, StateBuilder, TransitionBuilder};
use crate::config::FlowConfig;
use crate::core::{Context, ContextPatch, Event, MachineDefinition, OutputBuilder, Signal, State};
use crate::effects::{
    DispatchError, DispatchOutcome, EffectInput, EffectTable, InstanceStatus, MachineInstance,
    ProtocolViolation, Snapshot,
};
use crate::flow::{pods::check_pods, QuestionFlow};
use crate::hierarchy::{ChildSlot, Mailbox};
use crate::state_enum;
use serde_json::{json, Map, Value};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const MACHINE_ID: &str = "discovery";

const USER: &str = "user";
const ANSWERS: &str = "answers";
const ERROR_KEY: &str = "error";

/// Events understood by the root machine.
pub mod events {
    /// Establish-User finished; carries `user`
    pub const USER_ESTABLISHED: &str = "USER_ESTABLISHED";
    /// Carries `error`
    pub const ERROR: &str = "ERROR";
    pub const CONTINUE: &str = "CONTINUE";
    pub const START_FRESH: &str = "START_FRESH";
    /// The question flow finished; carries `answers`
    pub const QUESTIONS_DONE: &str = "QUESTIONS_DONE";
    /// Submission succeeded
    pub const DONE: &str = "DONE";
}

state_enum! {
    /// Coarse phases of the journey.
    pub enum DiscoveryPhase {
        Loading = "loading",
        Welcome = "welcome",
        Questions = "questions",
        Submitting = "submitting",
        Done = "done",
        Error = "error",
    }
    final: [Done, Error]
    error: [Error]
}

pub fn definition() -> Result<MachineDefinition, BuildError> {
    use self::events::*;
    use DiscoveryPhase::*;

    DefinitionBuilder::new(MACHINE_ID)
        .initial(Loading.name())
        .state(
            StateBuilder::new(Loading.name())
                .on(USER_ESTABLISHED, TransitionBuilder::to(Welcome.name()).effect("saveUser"))
                .on(ERROR, TransitionBuilder::to(Error.name()).effect("saveError")),
        )
        .state(
            StateBuilder::new(Welcome.name())
                .goto(CONTINUE, Questions.name())
                .on(
                    START_FRESH,
                    TransitionBuilder::to(Questions.name()).effect("clearAnswers"),
                ),
        )
        .state(
            StateBuilder::new(Questions.name()).on(
                QUESTIONS_DONE,
                TransitionBuilder::to(Submitting.name()).effect("saveAnswers"),
            ),
        )
        .state(
            StateBuilder::new(Submitting.name())
                .goto(DONE, Done.name())
                .on(ERROR, TransitionBuilder::to(Error.name()).effect("saveError")),
        )
        .state(
            StateBuilder::new(Done.name())
                .output(OutputBuilder::Pick(vec![USER.to_string(), ANSWERS.to_string()])),
        )
        .state(StateBuilder::new(Error.name()).output(OutputBuilder::Field(ERROR_KEY.to_string())))
        .build()
}

fn copy_field(key: &'static str) -> impl Fn(&EffectInput<'_>) -> ContextPatch + Send + Sync {
    move |input: &EffectInput<'_>| {
        let mut patch = ContextPatch::new();
        let value = input.event.get(key).cloned().unwrap_or(Value::Null);
        patch.insert(key.to_string(), value);
        patch
    }
}

pub fn effects() -> EffectTable {
    EffectTable::new()
        .assign("saveUser", copy_field(USER))
        .assign("saveError", copy_field(ERROR_KEY))
        .assign("saveAnswers", copy_field(ANSWERS))
        .assign("clearAnswers", |_| {
            let mut patch = ContextPatch::new();
            patch.insert(ANSWERS.to_string(), json!({}));
            patch
        })
}

/// The root workflow.
///
/// Owns the root machine and whichever child the current phase needs:
/// the Establish-User machine while `loading`, the question flow during
/// `questions`. External events go through [`send`](Self::send), which
/// routes them to the deepest live machine.
pub struct DiscoveryWorkflow {
    machine: MachineInstance,
    pods: Arc<[MachineDefinition]>,
    establish: ChildSlot<MachineInstance>,
    questions: ChildSlot<QuestionFlow>,
    mailbox: Mailbox,
}

impl DiscoveryWorkflow {
    /// Build the workflow over `pods`, seeded with earlier `answers`.
    pub fn new(
        pods: impl Into<Arc<[MachineDefinition]>>,
        answers: Context,
    ) -> Result<Self, BuildError> {
        let pods: Arc<[MachineDefinition]> = pods.into();
        check_pods(&pods)?;

        let mut context = Context::new();
        context.insert(ANSWERS.to_string(), Value::Object(answers));
        let machine = MachineInstance::new(definition()?, &effects(), context)?;

        Ok(Self {
            machine,
            pods,
            establish: ChildSlot::empty(),
            questions: ChildSlot::empty(),
            mailbox: Mailbox::new(),
        })
    }

    pub fn from_config(config: FlowConfig) -> Result<Self, BuildError> {
        Self::new(config.pods, config.answers)
    }

    /// Start the root machine and spawn the Establish-User child.
    pub fn start(&mut self) -> Result<(), DispatchError> {
        if self.machine.status() != InstanceStatus::Idle {
            return Ok(());
        }
        self.machine.start();
        self.enter(DiscoveryPhase::Loading)?;
        self.pump()
    }

    /// Deliver an external event to whichever machine should see it.
    pub fn send(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        let outcome = match self.phase() {
            DiscoveryPhase::Loading
                if self.machine.status() == InstanceStatus::Running
                    && event.kind != events::ERROR =>
            {
                match self.establish.send(MACHINE_ID, event) {
                    Ok(outcome) => outcome,
                    Err(err) => self.escalate(err)?,
                }
            }
            DiscoveryPhase::Questions if !self.machine.is_done() => {
                self.questions.send(MACHINE_ID, event)?
            }
            _ => {
                let outcome = self.machine.dispatch(event)?;
                self.react(&outcome)?;
                outcome
            }
        };
        self.pump()?;
        Ok(outcome)
    }

    pub fn phase(&self) -> DiscoveryPhase {
        DiscoveryPhase::from_name(self.machine.current_state()).unwrap_or(DiscoveryPhase::Error)
    }

    pub fn user(&self) -> Option<&Value> {
        self.machine.context().get(USER)
    }

    pub fn answers(&self) -> Map<String, Value> {
        self.machine
            .context()
            .get(ANSWERS)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// The error payload, once the workflow has failed.
    pub fn error(&self) -> Option<&Value> {
        self.machine.context().get(ERROR_KEY)
    }

    pub fn establish_user(&self) -> Option<&MachineInstance> {
        self.establish.get()
    }

    pub fn question_flow(&self) -> Option<&QuestionFlow> {
        self.questions.get()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    pub fn is_done(&self) -> bool {
        self.machine.is_done()
    }

    pub fn output(&self) -> Option<&Value> {
        self.machine.output()
    }

    fn pump(&mut self) -> Result<(), DispatchError> {
        while let Some(envelope) = self.mailbox.next() {
            let event = if self.establish.is_current(envelope.source) {
                match envelope.signal {
                    Signal::Done(user) => Event::new(events::USER_ESTABLISHED).with(USER, user),
                    Signal::Notify(notice) => {
                        debug!(child = %envelope.machine, event = %notice.kind, "Unhandled notification");
                        continue;
                    }
                }
            } else if self.questions.is_current(envelope.source) {
                match envelope.signal {
                    Signal::Done(answers) => {
                        Event::new(events::QUESTIONS_DONE).with(ANSWERS, answers)
                    }
                    Signal::Notify(notice) => {
                        debug!(child = %envelope.machine, event = %notice.kind, "Unhandled notification");
                        continue;
                    }
                }
            } else {
                let violation = ProtocolViolation::StaleChild {
                    machine: MACHINE_ID.to_string(),
                    child: envelope.source,
                };
                warn!(error = %violation, child = %envelope.machine, "Discarded signal");
                continue;
            };

            let outcome = self.machine.dispatch(event)?;
            self.react(&outcome)?;
        }
        Ok(())
    }

    fn react(&mut self, outcome: &DispatchOutcome) -> Result<(), DispatchError> {
        match outcome {
            DispatchOutcome::Transitioned { to, .. } => match DiscoveryPhase::from_name(to) {
                Some(phase) => self.enter(phase),
                None => Ok(()),
            },
            DispatchOutcome::Terminated { .. } => {
                self.establish.clear();
                self.questions.clear();
                Ok(())
            }
            DispatchOutcome::Ignored | DispatchOutcome::Stayed { .. } => Ok(()),
        }
    }

    fn enter(&mut self, phase: DiscoveryPhase) -> Result<(), DispatchError> {
        self.establish.clear();
        self.questions.clear();

        match phase {
            DiscoveryPhase::Loading => {
                let spawned = establish_user::definition()
                    .and_then(|definition| {
                        MachineInstance::new(definition, &establish_user::effects(), Context::new())
                    })
                    .map_err(DispatchError::from)
                    .and_then(|child| self.establish.install(child, &self.mailbox));
                if let Err(err) = spawned {
                    self.escalate(err)?;
                }
                Ok(())
            }
            DiscoveryPhase::Questions => {
                let flow = QuestionFlow::new(Arc::clone(&self.pods), self.answers())?;
                debug!(pods = self.pods.len(), "Starting question flow");
                self.questions.install(flow, &self.mailbox)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Move to `error` with `cause` attached.
    fn escalate(&mut self, cause: impl Display) -> Result<DispatchOutcome, DispatchError> {
        let msg = cause.to_string();
        error!(machine = MACHINE_ID, error = %msg, "Establishing the user failed");

        let event = Event::new(events::ERROR).with(ERROR_KEY, json!({ "msg": msg }));
        let outcome = self.machine.dispatch(event)?;
        self.react(&outcome)?;
        Ok(outcome)
    }
}

impl std::fmt::Debug for DiscoveryWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryWorkflow")
            .field("phase", &self.phase())
            .field("pods", &self.pods.len())
            .field("machine", &self.machine)
            .finish()
    }
}
