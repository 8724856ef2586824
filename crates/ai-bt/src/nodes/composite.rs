use ai_core::ActionSystem;

use super::{rewind_all, Node, TickScope};
use crate::bt::BtStatus;
use crate::error::StructuralError;

/// What a selecting composite does after a child fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failover {
    /// Advance the cursor and yield `Running`; the next child runs next tick.
    NextTick,
    /// Advance the cursor and run the next child immediately while the time budget lasts.
    SameTick,
}

/// Failover used by `Selector`. `Root` always fails over within the tick.
pub const SELECTOR_FAILOVER: Failover = Failover::NextTick;

/// Ordered children plus the resumption cursor shared by Sequence, Selector and Root.
///
/// The cursor stays in `0..children.len()` between ticks; reaching the end rewinds it
/// before the result is returned.
pub struct Composite<A>
where
    A: ActionSystem + 'static,
{
    children: Vec<Node<A>>,
    cursor: usize,
}

impl<A> Composite<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            children: Vec::new(),
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn children(&self) -> &[Node<A>] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node<A>] {
        &mut self.children
    }

    pub(crate) fn push(&mut self, child: Node<A>) {
        self.children.push(child);
    }

    pub(crate) fn pop(&mut self) -> Option<Node<A>> {
        self.cursor = 0;
        self.children.pop()
    }

    pub(crate) fn rewind(&mut self) -> bool {
        let changed = self.cursor != 0;
        self.cursor = 0;
        changed
    }

    /// AND over the children, one child per tick.
    pub(crate) fn sequence(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        let Some(child) = self.children.get_mut(self.cursor) else {
            return BtStatus::Failure;
        };

        match child.update(cx) {
            BtStatus::Running => BtStatus::Running,
            BtStatus::Failure => {
                self.cursor = 0;
                BtStatus::Failure
            }
            BtStatus::Success => {
                self.cursor += 1;
                if self.cursor < self.children.len() {
                    return BtStatus::Running;
                }
                self.cursor = 0;
                rewind_all(&mut self.children, cx.agent_mut());
                BtStatus::Success
            }
        }
    }

    /// OR over the children.
    pub(crate) fn select(&mut self, failover: Failover, cx: &mut TickScope<'_, A>) -> BtStatus {
        loop {
            let Some(child) = self.children.get_mut(self.cursor) else {
                return BtStatus::Failure;
            };

            match child.update(cx) {
                BtStatus::Running => return BtStatus::Running,
                BtStatus::Success => {
                    self.cursor = 0;
                    rewind_all(&mut self.children, cx.agent_mut());
                    return BtStatus::Success;
                }
                BtStatus::Failure => {
                    self.cursor += 1;
                    if self.cursor == self.children.len() {
                        self.cursor = 0;
                        return BtStatus::Failure;
                    }
                    if failover == Failover::NextTick || cx.budget_exhausted() {
                        return BtStatus::Running;
                    }
                }
            }
        }
    }
}

/// Runs every unfinished child each tick and succeeds once enough of them have.
pub struct Parallel<A>
where
    A: ActionSystem + 'static,
{
    children: Vec<Node<A>>,
    // Last known status per child; `None` until the child has run since the last reset.
    statuses: Vec<Option<BtStatus>>,
    required_successes: Option<usize>,
    // First child of the next pass; advances when the budget cuts a pass short.
    next: usize,
}

impl<A> Parallel<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(required_successes: Option<usize>) -> Self {
        Self {
            children: Vec::new(),
            statuses: Vec::new(),
            required_successes,
            next: 0,
        }
    }

    pub fn children(&self) -> &[Node<A>] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node<A>] {
        &mut self.children
    }

    /// Successes needed to succeed; defaults to every child.
    pub fn required_successes(&self) -> usize {
        self.required_successes.unwrap_or(self.children.len())
    }

    pub fn statuses(&self) -> &[Option<BtStatus>] {
        &self.statuses
    }

    pub(crate) fn push(&mut self, child: Node<A>) {
        self.children.push(child);
        self.statuses.push(None);
    }

    pub(crate) fn validate(&self, name: &std::borrow::Cow<'static, str>) -> Result<(), StructuralError> {
        match self.required_successes {
            Some(required) if required == 0 || required > self.children.len() => {
                Err(StructuralError::InvalidParallelThreshold {
                    name: name.clone(),
                    required,
                    children: self.children.len(),
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn rewind(&mut self) -> bool {
        let changed = self.statuses.iter().any(Option::is_some);
        self.statuses.fill(None);
        self.next = 0;
        changed
    }

    pub(crate) fn update(&mut self, cx: &mut TickScope<'_, A>) -> BtStatus {
        let total = self.children.len();
        if total == 0 {
            return BtStatus::Failure;
        }

        let mut ran = 0usize;
        for offset in 0..total {
            let index = (self.next + offset) % total;
            if matches!(self.statuses[index], Some(status) if status.is_terminal()) {
                continue;
            }
            // At least one child runs per tick, whatever the budget says.
            if ran > 0 && cx.budget_exhausted() {
                self.next = index;
                break;
            }
            ran += 1;
            self.statuses[index] = Some(self.children[index].update(cx));
        }

        let required = self.required_successes();
        let successes = self.count(BtStatus::Success);
        let failures = self.count(BtStatus::Failure);
        let unfinished = self
            .statuses
            .iter()
            .any(|s| !matches!(s, Some(status) if status.is_terminal()));

        let status = if successes >= required {
            BtStatus::Success
        } else if failures > total.saturating_sub(required) {
            BtStatus::Failure
        } else if unfinished {
            BtStatus::Running
        } else {
            BtStatus::Failure
        };

        if status.is_terminal() {
            self.statuses.fill(None);
            self.next = 0;
            // Branches still running are cancelled now, before any sibling of this node runs.
            rewind_all(&mut self.children, cx.agent_mut());
        }
        status
    }

    fn count(&self, wanted: BtStatus) -> usize {
        self.statuses.iter().filter(|s| **s == Some(wanted)).count()
    }
}
