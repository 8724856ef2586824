//! Tree-wide interrupt/reset broadcast.
//!
//! Signals are never applied where they are sent. Sending only fills the receiver's
//! mailbox; the tree drains every mailbox at the start of the next tick, before any node
//! runs its control-flow logic, so no composite ever sees a half-rewound subtree.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Stable per-node identifier handed out by a [`SignalBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Optional payload carried by an interrupt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interrupt {
    pub reason: Option<Cow<'static, str>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn because(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

/// Signals waiting for the next drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pending {
    pub interrupt: Option<Interrupt>,
    pub reset: bool,
}

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.interrupt.is_none() && !self.reset
    }
}

#[derive(Debug, Default)]
struct BusInner {
    next_id: u64,
    mailboxes: BTreeMap<NodeId, Pending>,
}

/// Publish/subscribe list owned by a tree controller.
///
/// Repeated posts to the same mailbox before a drain coalesce, so each subscriber
/// observes a signal generation exactly once.
#[derive(Debug, Clone, Default)]
pub struct SignalBus {
    inner: Rc<RefCell<BusInner>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.next_id);
        inner.next_id += 1;
        inner.mailboxes.insert(id, Pending::default());
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().mailboxes.len()
    }

    /// Returns the number of subscribers reached.
    pub fn broadcast_interrupt(&self, interrupt: Interrupt) -> usize {
        let mut inner = self.inner.borrow_mut();
        for pending in inner.mailboxes.values_mut() {
            pending.interrupt = Some(interrupt.clone());
        }
        inner.mailboxes.len()
    }

    /// Returns the number of subscribers reached.
    pub fn broadcast_reset(&self) -> usize {
        let mut inner = self.inner.borrow_mut();
        for pending in inner.mailboxes.values_mut() {
            pending.reset = true;
        }
        inner.mailboxes.len()
    }
}

/// Scoped registration on a [`SignalBus`]. Dropping it removes the mailbox.
///
/// A subscription that outlives its bus is inert: posts are ignored and draining yields
/// nothing.
#[derive(Debug)]
pub struct Subscription {
    id: NodeId,
    bus: Weak<RefCell<BusInner>>,
}

impl Subscription {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| bus.borrow().mailboxes.contains_key(&self.id))
    }

    pub fn post_interrupt(&self, interrupt: Interrupt) {
        self.with_mailbox(|pending| pending.interrupt = Some(interrupt));
    }

    pub fn post_reset(&self) {
        self.with_mailbox(|pending| pending.reset = true);
    }

    /// Empties the mailbox, returning what was waiting in it.
    pub fn take(&self) -> Pending {
        let mut taken = Pending::default();
        self.with_mailbox(|pending| taken = std::mem::take(pending));
        taken
    }

    fn with_mailbox(&self, f: impl FnOnce(&mut Pending)) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut inner = bus.borrow_mut();
        if let Some(pending) = inner.mailboxes.get_mut(&self.id) {
            f(pending);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().mailboxes.remove(&self.id);
        }
    }
}
