use std::borrow::Cow;

use ai_core::ActionSystem;

use super::{FalliblePredicate, TickScope};
use crate::bt::BtStatus;

/// Stateless predicate, re-evaluated on every update.
pub struct Condition<A>
where
    A: ActionSystem + 'static,
{
    predicate: FalliblePredicate<A>,
}

impl<A> Condition<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(predicate: FalliblePredicate<A>) -> Self {
        Self { predicate }
    }

    pub(crate) fn evaluate(&mut self, name: &Cow<'static, str>, cx: &mut TickScope<'_, A>) -> BtStatus {
        match (self.predicate)(cx.ctx(), cx.agent()) {
            Ok(true) => BtStatus::Success,
            Ok(false) => BtStatus::Failure,
            Err(err) => {
                tracing::warn!(node = %name, error = %err, "condition faulted; treating as failure");
                BtStatus::Failure
            }
        }
    }
}

/// Starts an external action once and polls the agent for its completion.
pub struct ActionLeaf<A>
where
    A: ActionSystem + 'static,
{
    action: A::Action,
    has_started: bool,
}

impl<A> ActionLeaf<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(action: A::Action) -> Self {
        Self {
            action,
            has_started: false,
        }
    }

    pub fn action(&self) -> &A::Action {
        &self.action
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub(crate) fn rewind(&mut self, agent: &mut A) -> bool {
        if !self.has_started {
            return false;
        }
        tracing::debug!(action = ?self.action, "cancelling in-flight action");
        agent.clear_actions();
        self.has_started = false;
        true
    }

    pub(crate) fn update(&mut self, name: &Cow<'static, str>, cx: &mut TickScope<'_, A>) -> BtStatus {
        if !self.has_started {
            if let Err(err) = cx.agent_mut().start(&self.action) {
                tracing::warn!(node = %name, action = ?self.action, error = %err, "action failed to start; treating as failure");
                return BtStatus::Failure;
            }
            self.has_started = true;
            tracing::debug!(node = %name, action = ?self.action, tick = cx.ctx().tick, "action started");
        }

        let agent = cx.agent();
        if agent.is_complete(&self.action) {
            self.has_started = false;
            BtStatus::Success
        } else if agent.has_failed(&self.action) {
            self.has_started = false;
            BtStatus::Failure
        } else {
            BtStatus::Running
        }
    }
}
