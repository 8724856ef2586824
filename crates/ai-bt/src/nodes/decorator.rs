use ai_core::ActionSystem;

use super::{Node, TickScope};
use crate::bt::BtStatus;

/// Single child slot shared by every decorator.
pub struct Decorator<A>
where
    A: ActionSystem + 'static,
{
    child: Option<Box<Node<A>>>,
}

impl<A> Decorator<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new() -> Self {
        Self { child: None }
    }

    pub fn child(&self) -> Option<&Node<A>> {
        self.child.as_deref()
    }

    /// Binds `child`, handing back whatever was bound before.
    pub(crate) fn set_child(&mut self, child: Node<A>) -> Option<Node<A>> {
        self.child.replace(Box::new(child)).map(|previous| *previous)
    }

    pub(crate) fn as_slice(&self) -> &[Node<A>] {
        match &self.child {
            Some(child) => std::slice::from_ref(&**child),
            None => &[],
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Node<A>] {
        match &mut self.child {
            Some(child) => std::slice::from_mut(&mut **child),
            None => &mut [],
        }
    }

    pub(crate) fn invert(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        match self.child.as_deref_mut() {
            Some(child) => child.update(cx).invert(),
            None => BtStatus::Failure,
        }
    }

    pub(crate) fn succeed(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        match self.child.as_deref_mut().map(|child| child.update(cx)) {
            Some(BtStatus::Running) => BtStatus::Running,
            Some(_) | None => BtStatus::Success,
        }
    }
}

/// Re-runs its child after every success, `times` times or forever.
pub struct Repeater<A>
where
    A: ActionSystem + 'static,
{
    decorator: Decorator<A>,
    times: Option<u32>,
    count: u32,
}

impl<A> Repeater<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(times: Option<u32>) -> Self {
        Self {
            decorator: Decorator::new(),
            times,
            count: 0,
        }
    }

    pub fn times(&self) -> Option<u32> {
        self.times
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn decorator(&self) -> &Decorator<A> {
        &self.decorator
    }

    pub fn decorator_mut(&mut self) -> &mut Decorator<A> {
        &mut self.decorator
    }

    pub(crate) fn rewind(&mut self) -> bool {
        let changed = self.count != 0;
        self.count = 0;
        changed
    }

    pub(crate) fn update(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        let Some(child) = self.decorator.child.as_deref_mut() else {
            return BtStatus::Failure;
        };

        match child.update(cx) {
            BtStatus::Running => BtStatus::Running,
            BtStatus::Failure => {
                self.count = 0;
                BtStatus::Failure
            }
            BtStatus::Success => {
                self.count = self.count.saturating_add(1);
                child.rewind_subtree(cx.agent_mut());
                match self.times {
                    Some(times) if self.count >= times => {
                        self.count = 0;
                        BtStatus::Success
                    }
                    _ => BtStatus::Running,
                }
            }
        }
    }
}
