//! Parent/child plumbing for nested machines.
//!
//! A parent never shares context with a child. It hands the child an
//! explicit outlet into its own [`Mailbox`], and every signal arrives tagged
//! with the child's [`InstanceId`]. A [`ChildSlot`] holds at most one live
//! child. Replacing or clearing it unsubscribes the old child first, and
//! anything the old child had already queued is recognisably stale.

use crate::core::{Envelope, Event, InstanceId};
use crate::effects::{
    DispatchError, DispatchOutcome, MachineInstance, ProtocolViolation, Subscriber, Subscription,
};
use std::sync::mpsc::{channel, Receiver, Sender};
use tracing::debug;

/// Anything a parent can spawn and talk to.
pub trait Child {
    fn id(&self) -> InstanceId;

    /// Id of the definition the child runs, for diagnostics.
    fn machine(&self) -> &str;

    fn start(&mut self) -> Result<(), DispatchError>;

    fn send(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError>;

    fn add_subscriber(&mut self, subscriber: Subscriber) -> Subscription;

    fn unsubscribe(&mut self, subscription: Subscription) -> bool;

    fn is_done(&self) -> bool;
}

impl Child for MachineInstance {
    fn id(&self) -> InstanceId {
        MachineInstance::id(self)
    }

    fn machine(&self) -> &str {
        &self.definition().id
    }

    fn start(&mut self) -> Result<(), DispatchError> {
        MachineInstance::start(self);
        Ok(())
    }

    fn send(&mut self, event: Event) -> Result<DispatchOutcome, DispatchError> {
        self.dispatch(event)
    }

    fn add_subscriber(&mut self, subscriber: Subscriber) -> Subscription {
        MachineInstance::add_subscriber(self, subscriber)
    }

    fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        MachineInstance::unsubscribe(self, subscription)
    }

    fn is_done(&self) -> bool {
        MachineInstance::is_done(self)
    }
}

/// Queue of signals sent to a parent by its children.
pub struct Mailbox {
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
}

impl Mailbox {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    /// A subscriber that forwards everything into this mailbox.
    pub fn outlet(&self) -> Subscriber {
        let sender = self.sender.clone();
        Box::new(move |envelope: &Envelope| {
            // fails only once the mailbox itself is gone
            let _ = sender.send(envelope.clone());
        })
    }

    /// Next queued signal, if any.
    pub fn next(&self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

struct Attached<C> {
    child: C,
    subscription: Subscription,
}

/// Holder for at most one live child.
pub struct ChildSlot<C: Child> {
    active: Option<Attached<C>>,
}

impl<C: Child> ChildSlot<C> {
    pub fn empty() -> Self {
        Self { active: None }
    }

    /// Replace the current child with `child`, wire it to `mailbox` and
    /// start it. The previous child is detached before the new one can emit.
    pub fn install(&mut self, mut child: C, mailbox: &Mailbox) -> Result<InstanceId, DispatchError> {
        self.clear();
        let id = child.id();
        let subscription = child.add_subscriber(mailbox.outlet());
        debug!(machine = %child.machine(), child = %id, "Child installed");

        let attached = self.active.insert(Attached {
            child,
            subscription,
        });
        attached.child.start()?;
        Ok(id)
    }

    /// Detach and return the current child, if any.
    pub fn clear(&mut self) -> Option<C> {
        let mut attached = self.active.take()?;
        attached.child.unsubscribe(attached.subscription);
        debug!(machine = %attached.child.machine(), child = %attached.child.id(), "Child detached");
        Some(attached.child)
    }

    pub fn get(&self) -> Option<&C> {
        self.active.as_ref().map(|a| &a.child)
    }

    pub fn get_mut(&mut self) -> Option<&mut C> {
        self.active.as_mut().map(|a| &mut a.child)
    }

    pub fn is_current(&self, id: InstanceId) -> bool {
        self.get().is_some_and(|child| child.id() == id)
    }

    /// Forward an event to the current child.
    pub fn send(&mut self, parent: &str, event: Event) -> Result<DispatchOutcome, DispatchError> {
        match self.get_mut() {
            Some(child) => child.send(event),
            None => Err(ProtocolViolation::NoActiveChild {
                machine: parent.to_string(),
                event: event.kind,
            }
            .into()),
        }
    }
}

impl<C: Child> Default for ChildSlot<C> {
    fn default() -> Self {
        Self::empty()
    }
}
