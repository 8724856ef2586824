//! Fluent, stack-based tree construction.
//!
//! Opening a composite or decorator pushes a build scope; leaves attach to the innermost
//! open scope; [`BtBuilder::end`] closes it; [`BtBuilder::root`] closes everything back to
//! the implicit top-level `Root`. Nodes are created already subscribed to the tree's
//! broadcast channel, so no manual wiring is needed.
//!
//! ```rust,ignore
//! let tree = BtBuilder::<Guard>::new()
//!     .sequence("chase")
//!     .condition("sees_intruder", |_, guard| guard.sees_intruder())
//!     .action("run_to_intruder", ActionKey("run"))
//!     .root()
//!     .action("patrol", ActionKey("patrol"))
//!     .build()?;
//! ```

use std::borrow::Cow;

use ai_core::{ActionSystem, TickContext};

use crate::config::TreeConfig;
use crate::error::StructuralError;
use crate::nodes::Node;
use crate::signal::SignalBus;
use crate::tree::BehaviorTree;

// Which node a following `precondition()` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Touched {
    Nothing,
    OpenScope,
    LastChild,
}

pub struct BtBuilder<A>
where
    A: ActionSystem + 'static,
{
    bus: SignalBus,
    config: TreeConfig,
    top: Node<A>,
    open: Vec<Node<A>>,
    touched: Touched,
    error: Option<StructuralError>,
}

impl<A> Default for BtBuilder<A>
where
    A: ActionSystem + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<A> BtBuilder<A>
where
    A: ActionSystem + 'static,
{
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        let bus = SignalBus::new();
        let top = Node::root(&bus, "root");
        Self {
            bus,
            config,
            top,
            open: Vec::new(),
            touched: Touched::Nothing,
            error: None,
        }
    }

    /// Nesting depth of the innermost open scope; 0 is the top-level `Root`.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn sequence(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.open_scope(|bus| Node::sequence(bus, name))
    }

    pub fn selector(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.open_scope(|bus| Node::selector(bus, name))
    }

    /// Parallel that succeeds only when every child succeeds.
    pub fn parallel(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.open_scope(|bus| Node::parallel(bus, name, None))
    }

    /// Parallel that succeeds once `required_successes` children have succeeded.
    pub fn parallel_with(self, name: impl Into<Cow<'static, str>>, required_successes: usize) -> Self {
        self.open_scope(|bus| Node::parallel(bus, name, Some(required_successes)))
    }

    pub fn inverter(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.open_scope(|bus| Node::inverter(bus, name))
    }

    pub fn succeeder(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.open_scope(|bus| Node::succeeder(bus, name))
    }

    /// Repeats its child `times` times, or forever when `times` is `None`.
    pub fn repeater(self, name: impl Into<Cow<'static, str>>, times: Option<u32>) -> Self {
        let name = name.into();
        if times == Some(0) {
            return self.fail(StructuralError::ZeroRepeatCount(name));
        }
        self.open_scope(|bus| Node::repeater(bus, name, times))
    }

    pub fn condition<F>(self, name: impl Into<Cow<'static, str>>, mut predicate: F) -> Self
    where
        F: FnMut(&TickContext, &A) -> bool + 'static,
    {
        self.leaf(|bus| {
            Node::condition(
                bus,
                name,
                Box::new(move |ctx: &TickContext, agent: &A| Ok(predicate(ctx, agent))),
            )
        })
    }

    /// Condition whose predicate can fail; an `Err` is logged and counts as `Failure`.
    pub fn try_condition<F>(self, name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: FnMut(&TickContext, &A) -> anyhow::Result<bool> + 'static,
    {
        self.leaf(|bus| Node::condition(bus, name, Box::new(predicate)))
    }

    pub fn action(self, name: impl Into<Cow<'static, str>>, action: A::Action) -> Self {
        self.leaf(|bus| Node::action(bus, name, action))
    }

    /// Guards the most recently added node (leaf or just-opened scope).
    pub fn precondition<F>(mut self, check: F) -> Self
    where
        F: FnMut(&TickContext, &A) -> bool + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let touched = self.touched;
        let target = match touched {
            Touched::OpenScope => self.open.last_mut(),
            Touched::LastChild => self.scope().last_child_mut(),
            Touched::Nothing => None,
        };
        match target {
            Some(node) => node.set_precondition(Box::new(check)),
            None => return self.fail(StructuralError::DanglingPrecondition),
        }
        self
    }

    /// Closes the innermost open scope.
    pub fn end(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(node) = self.open.pop() else {
            return self.fail(StructuralError::UnbalancedEnd);
        };
        if let Err(err) = node.finish() {
            return self.fail(err);
        }
        if let Err(err) = self.scope().attach(node) {
            return self.fail(err);
        }
        self.touched = Touched::LastChild;
        self
    }

    /// Closes every open scope, returning to the top-level `Root`.
    pub fn root(mut self) -> Self {
        while self.error.is_none() && !self.open.is_empty() {
            self = self.end();
        }
        self
    }

    /// Finishes the tree.
    ///
    /// A single top-level composite or decorator becomes the root itself; otherwise the
    /// implicit `Root` selector is kept.
    pub fn build(self) -> Result<BehaviorTree<A>, StructuralError> {
        let mut this = self.root();
        if let Some(err) = this.error.take() {
            return Err(err);
        }
        if this.top.children().is_empty() {
            tracing::error!(tree = %this.config.name, "behavior tree has no nodes");
            return Err(StructuralError::EmptyTree);
        }

        let single_branch = matches!(this.top.children(), [only] if !only.kind().is_leaf());
        let mut top = this.top;
        let root = match single_branch.then(|| top.pop_child()).flatten() {
            Some(branch) => {
                drop(top);
                branch
            }
            None => top,
        };
        Ok(BehaviorTree::new(root, this.bus, this.config))
    }

    fn scope(&mut self) -> &mut Node<A> {
        self.open.last_mut().unwrap_or(&mut self.top)
    }

    fn open_scope(mut self, make: impl FnOnce(&SignalBus) -> Node<A>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let node = make(&self.bus);
        if let Err(err) = self.check_vacancy(&node) {
            return self.fail(err);
        }
        self.open.push(node);
        self.touched = Touched::OpenScope;
        self
    }

    fn leaf(mut self, make: impl FnOnce(&SignalBus) -> Node<A>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let node = make(&self.bus);
        if let Err(err) = self.check_vacancy(&node) {
            return self.fail(err);
        }
        if let Err(err) = self.scope().attach(node) {
            return self.fail(err);
        }
        self.touched = Touched::LastChild;
        self
    }

    fn check_vacancy(&mut self, child: &Node<A>) -> Result<(), StructuralError> {
        let parent = self.scope();
        if parent.has_vacancy() {
            return Ok(());
        }
        Err(StructuralError::DecoratorOccupied {
            decorator: Cow::Owned(parent.name().to_owned()),
            child: Cow::Owned(child.name().to_owned()),
        })
    }

    fn fail(mut self, err: StructuralError) -> Self {
        if self.error.is_none() {
            tracing::error!(tree = %self.config.name, error = %err, "invalid behavior tree structure");
            self.error = Some(err);
        }
        self
    }
}
