//! Node state machine shared by every node kind.
//!
//! A [`Node`] is the common bookkeeping (name, lifecycle, last status, signal mailbox,
//! optional precondition) wrapped around a closed set of node kinds in [`NodeKind`].

use std::borrow::Cow;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use ai_core::{ActionSystem, TickContext};

use crate::bt::{BtStatus, Lifecycle};
use crate::error::StructuralError;
use crate::signal::{Interrupt, NodeId, SignalBus, Subscription};

mod composite;
mod decorator;
mod leaf;

pub use composite::{Composite, Failover, Parallel, SELECTOR_FAILOVER};
pub use decorator::{Decorator, Repeater};
pub use leaf::{ActionLeaf, Condition};

pub type Predicate<A> = Box<dyn FnMut(&TickContext, &A) -> bool>;
pub type FalliblePredicate<A> = Box<dyn FnMut(&TickContext, &A) -> anyhow::Result<bool>>;

/// Everything a node may touch during one update pass.
pub struct TickScope<'a, A> {
    ctx: &'a TickContext,
    agent: &'a mut A,
    started: Instant,
    budget: Duration,
}

impl<'a, A> TickScope<'a, A> {
    pub fn new(ctx: &'a TickContext, agent: &'a mut A, budget: Duration) -> Self {
        Self {
            ctx,
            agent,
            started: Instant::now(),
            budget,
        }
    }

    pub fn ctx(&self) -> &TickContext {
        self.ctx
    }

    pub fn agent(&self) -> &A {
        &*self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut *self.agent
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Cooperative soft deadline. Nodes that can defer work check this and yield
    /// `Running` instead of continuing the walk.
    pub fn budget_exhausted(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

struct NodeState {
    id: NodeId,
    name: Cow<'static, str>,
    lifecycle: Lifecycle,
    last_status: Option<BtStatus>,
    // Set by the drain pass that applied an interrupt; cleared by the next one.
    interrupted: bool,
    subscription: Option<Subscription>,
}

impl NodeState {
    fn record(&mut self, status: BtStatus) {
        self.lifecycle = status.into();
        self.last_status = Some(status);
    }

    fn rewind(&mut self) -> bool {
        let changed = self.lifecycle != Lifecycle::Ready || self.last_status.is_some();
        self.lifecycle = Lifecycle::Ready;
        self.last_status = None;
        changed
    }
}

pub enum NodeKind<A>
where
    A: ActionSystem + 'static,
{
    Sequence(Composite<A>),
    Selector(Composite<A>),
    Parallel(Parallel<A>),
    Root(Composite<A>),
    Inverter(Decorator<A>),
    Repeater(Repeater<A>),
    Succeeder(Decorator<A>),
    Condition(Condition<A>),
    Action(ActionLeaf<A>),
}

impl<A> NodeKind<A>
where
    A: ActionSystem + 'static,
{
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Sequence(_) => "Sequence",
            NodeKind::Selector(_) => "Selector",
            NodeKind::Parallel(_) => "Parallel",
            NodeKind::Root(_) => "Root",
            NodeKind::Inverter(_) => "Inverter",
            NodeKind::Repeater(_) => "Repeater",
            NodeKind::Succeeder(_) => "Succeeder",
            NodeKind::Condition(_) => "Condition",
            NodeKind::Action(_) => "Action",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Condition(_) | NodeKind::Action(_))
    }

    fn rewind(&mut self, agent: &mut A) -> bool {
        match self {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => c.rewind(),
            NodeKind::Parallel(p) => p.rewind(),
            NodeKind::Repeater(r) => r.rewind(),
            NodeKind::Action(a) => a.rewind(agent),
            NodeKind::Inverter(_) | NodeKind::Succeeder(_) | NodeKind::Condition(_) => false,
        }
    }
}

pub struct Node<A>
where
    A: ActionSystem + 'static,
{
    state: NodeState,
    precondition: Option<Predicate<A>>,
    kind: NodeKind<A>,
}

impl<A> Node<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(bus: &SignalBus, name: impl Into<Cow<'static, str>>, kind: NodeKind<A>) -> Self {
        let subscription = bus.subscribe();
        Self {
            state: NodeState {
                id: subscription.id(),
                name: name.into(),
                lifecycle: Lifecycle::Ready,
                last_status: None,
                interrupted: false,
                subscription: Some(subscription),
            },
            precondition: None,
            kind,
        }
    }

    pub(crate) fn sequence(bus: &SignalBus, name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(bus, name, NodeKind::Sequence(Composite::new()))
    }

    pub(crate) fn selector(bus: &SignalBus, name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(bus, name, NodeKind::Selector(Composite::new()))
    }

    pub(crate) fn root(bus: &SignalBus, name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(bus, name, NodeKind::Root(Composite::new()))
    }

    pub(crate) fn parallel(
        bus: &SignalBus,
        name: impl Into<Cow<'static, str>>,
        required_successes: Option<usize>,
    ) -> Self {
        Self::new(bus, name, NodeKind::Parallel(Parallel::new(required_successes)))
    }

    pub(crate) fn inverter(bus: &SignalBus, name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(bus, name, NodeKind::Inverter(Decorator::new()))
    }

    pub(crate) fn succeeder(bus: &SignalBus, name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(bus, name, NodeKind::Succeeder(Decorator::new()))
    }

    pub(crate) fn repeater(
        bus: &SignalBus,
        name: impl Into<Cow<'static, str>>,
        times: Option<u32>,
    ) -> Self {
        Self::new(bus, name, NodeKind::Repeater(Repeater::new(times)))
    }

    pub(crate) fn condition(
        bus: &SignalBus,
        name: impl Into<Cow<'static, str>>,
        predicate: FalliblePredicate<A>,
    ) -> Self {
        Self::new(bus, name, NodeKind::Condition(Condition::new(predicate)))
    }

    pub(crate) fn action(
        bus: &SignalBus,
        name: impl Into<Cow<'static, str>>,
        action: A::Action,
    ) -> Self {
        Self::new(bus, name, NodeKind::Action(ActionLeaf::new(action)))
    }

    pub fn id(&self) -> NodeId {
        self.state.id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn kind(&self) -> &NodeKind<A> {
        &self.kind
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    pub fn last_status(&self) -> Option<BtStatus> {
        self.state.last_status
    }

    /// Resumption cursor of composites; `None` for every other kind.
    pub fn cursor(&self) -> Option<usize> {
        match &self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => Some(c.cursor()),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node<A>] {
        match &self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => c.children(),
            NodeKind::Parallel(p) => p.children(),
            NodeKind::Inverter(d) | NodeKind::Succeeder(d) => d.as_slice(),
            NodeKind::Repeater(r) => r.decorator().as_slice(),
            NodeKind::Condition(_) | NodeKind::Action(_) => &[],
        }
    }

    fn children_mut(&mut self) -> &mut [Node<A>] {
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => c.children_mut(),
            NodeKind::Parallel(p) => p.children_mut(),
            NodeKind::Inverter(d) | NodeKind::Succeeder(d) => d.as_mut_slice(),
            NodeKind::Repeater(r) => r.decorator_mut().as_mut_slice(),
            NodeKind::Condition(_) | NodeKind::Action(_) => &mut [],
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.state
            .subscription
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Evaluated before every start or resumption; `true` when no precondition is set.
    pub fn precondition(&mut self, ctx: &TickContext, agent: &A) -> bool {
        match self.precondition.as_mut() {
            Some(check) => check(ctx, agent),
            None => true,
        }
    }

    pub fn update(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        let status = if self.state.interrupted && !matches!(self.kind, NodeKind::Condition(_)) {
            BtStatus::Failure
        } else if !self.precondition(cx.ctx(), cx.agent()) {
            tracing::trace!(node = %self.state.name, "precondition failed");
            // Anything this node left running must stop before a sibling takes over.
            self.kind.rewind(cx.agent_mut());
            rewind_all(self.children_mut(), cx.agent_mut());
            BtStatus::Failure
        } else {
            let name = &self.state.name;
            match &mut self.kind {
                NodeKind::Sequence(c) => c.sequence(cx),
                NodeKind::Selector(c) => c.select(SELECTOR_FAILOVER, cx),
                NodeKind::Root(c) => c.select(Failover::SameTick, cx),
                NodeKind::Parallel(p) => p.update(cx),
                NodeKind::Inverter(d) => d.invert(cx),
                NodeKind::Succeeder(d) => d.succeed(cx),
                NodeKind::Repeater(r) => r.update(cx),
                NodeKind::Condition(c) => c.evaluate(name, cx),
                NodeKind::Action(a) => a.update(name, cx),
            }
        };
        self.state.record(status);
        status
    }

    /// Marks this node and its whole subtree as pending-interrupt. Applied by the next
    /// drain pass.
    pub fn interrupt(&self, interrupt: Interrupt) {
        if let Some(subscription) = &self.state.subscription {
            subscription.post_interrupt(interrupt.clone());
        }
        for child in self.children() {
            child.interrupt(interrupt.clone());
        }
    }

    /// Marks this node and its whole subtree as pending-reset. Applied by the next drain
    /// pass.
    pub fn reset(&self) {
        if let Some(subscription) = &self.state.subscription {
            subscription.post_reset();
        }
        for child in self.children() {
            child.reset();
        }
    }

    /// Converts this node's pending signals into live state.
    ///
    /// Returns whether anything actually changed; resetting a node that is already
    /// `Ready` is a no-op.
    pub fn process_pending_signals(&mut self, agent: &mut A) -> bool {
        self.state.interrupted = false;
        let Some(subscription) = self.state.subscription.as_ref() else {
            return false;
        };
        let pending = subscription.take();
        if pending.is_empty() {
            return false;
        }

        let mut changed = self.state.rewind();
        changed |= self.kind.rewind(agent);

        if let Some(interrupt) = pending.interrupt {
            // Conditions keep no state worth interrupting.
            if !matches!(self.kind, NodeKind::Condition(_)) {
                self.state.interrupted = true;
                changed = true;
            }
            tracing::trace!(node = %self.state.name, reason = ?interrupt.reason, "interrupt applied");
        }

        changed
    }

    /// Rewinds this node and its subtree in place, cancelling any action still in flight.
    ///
    /// Only valid on nodes that are not part of the current walk; the owning parent calls
    /// it after the child has returned.
    pub(crate) fn rewind_subtree(&mut self, agent: &mut A) -> bool {
        let mut changed = self.state.rewind();
        changed |= self.kind.rewind(agent);
        for child in self.children_mut() {
            changed |= child.rewind_subtree(agent);
        }
        changed
    }

    /// Pre-order drain of the whole subtree. Returns the number of nodes that changed.
    pub(crate) fn drain_signals(&mut self, agent: &mut A) -> usize {
        let mut changed = usize::from(self.process_pending_signals(agent));
        for child in self.children_mut() {
            changed += child.drain_signals(agent);
        }
        changed
    }

    /// Deregisters this node and its subtree from the broadcast channel.
    pub fn destroy(&mut self) {
        self.state.subscription = None;
        self.state.interrupted = false;
        for child in self.children_mut() {
            child.destroy();
        }
    }

    pub(crate) fn set_precondition(&mut self, precondition: Predicate<A>) {
        self.precondition = Some(precondition);
    }

    pub(crate) fn last_child_mut(&mut self) -> Option<&mut Node<A>> {
        self.children_mut().last_mut()
    }

    pub(crate) fn pop_child(&mut self) -> Option<Node<A>> {
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => c.pop(),
            _ => None,
        }
    }

    /// `false` only for decorators whose single slot is already bound.
    pub(crate) fn has_vacancy(&self) -> bool {
        match &self.kind {
            NodeKind::Inverter(d) | NodeKind::Succeeder(d) => d.child().is_none(),
            NodeKind::Repeater(r) => r.decorator().child().is_none(),
            _ => true,
        }
    }

    pub(crate) fn attach(&mut self, child: Node<A>) -> Result<(), StructuralError> {
        match &mut self.kind {
            NodeKind::Sequence(c) | NodeKind::Selector(c) | NodeKind::Root(c) => {
                c.push(child);
                Ok(())
            }
            NodeKind::Parallel(p) => {
                p.push(child);
                Ok(())
            }
            NodeKind::Inverter(d) | NodeKind::Succeeder(d) => {
                attach_single(d, &self.state.name, child)
            }
            NodeKind::Repeater(r) => attach_single(r.decorator_mut(), &self.state.name, child),
            NodeKind::Condition(_) | NodeKind::Action(_) => Err(StructuralError::LeafChild {
                leaf: self.state.name.clone(),
                child: Cow::Owned(child.name().to_owned()),
            }),
        }
    }

    /// Checks invariants that can only be validated once all children are attached.
    pub(crate) fn finish(&self) -> Result<(), StructuralError> {
        match &self.kind {
            NodeKind::Parallel(p) => p.validate(&self.state.name),
            NodeKind::Sequence(c) | NodeKind::Selector(c) if c.children().is_empty() => {
                tracing::warn!(node = %self.state.name, kind = self.kind_name(), "empty composite always fails");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn write_tree(&self, out: &mut String, depth: usize) {
        let _ = write!(
            out,
            "{:indent$}{} \"{}\" [{:?}",
            "",
            self.kind_name(),
            self.name(),
            self.lifecycle(),
            indent = depth * 2
        );
        if let Some(cursor) = self.cursor() {
            let _ = write!(out, ", cursor {cursor}");
        }
        if let Some(status) = self.last_status() {
            let _ = write!(out, ", last {status:?}");
        }
        out.push_str("]\n");
        for child in self.children() {
            child.write_tree(out, depth + 1);
        }
    }
}

fn attach_single<A>(
    decorator: &mut Decorator<A>,
    name: &Cow<'static, str>,
    child: Node<A>,
) -> Result<(), StructuralError>
where
    A: ActionSystem + 'static,
{
    if decorator.child().is_some() {
        return Err(StructuralError::DecoratorOccupied {
            decorator: name.clone(),
            child: Cow::Owned(child.name().to_owned()),
        });
    }
    decorator.set_child(child);
    Ok(())
}

pub(crate) fn rewind_all<A>(children: &mut [Node<A>], agent: &mut A)
where
    A: ActionSystem + 'static,
{
    for child in children {
        child.rewind_subtree(agent);
    }
}
