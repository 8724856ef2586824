use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::TickContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure,
}

impl From<ActionOutcome> for ActionStatus {
    fn from(value: ActionOutcome) -> Self {
        match value {
            ActionOutcome::Success => ActionStatus::Success,
            ActionOutcome::Failure => ActionStatus::Failure,
        }
    }
}

impl ActionStatus {
    pub fn outcome(self) -> Option<ActionOutcome> {
        match self {
            ActionStatus::Running => None,
            ActionStatus::Success => Some(ActionOutcome::Success),
            ActionStatus::Failure => Some(ActionOutcome::Failure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionKey(pub &'static str);

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no action registered for key `{0}`")]
    Unregistered(ActionKey),
}

/// A concrete piece of agent work (movement, animation, waiting, ...).
///
/// Actions are owned and advanced by a runtime such as [`ActionQueue`]; policies never
/// tick them directly.
pub trait Action: 'static {
    fn tick(&mut self, ctx: &TickContext) -> ActionStatus;

    fn cancel(&mut self) {}
}

/// The agent-side action interface a policy commands.
///
/// A policy only starts work, polls whether it finished and cancels everything in flight;
/// it never looks at how an action is timed or executed.
pub trait ActionSystem {
    /// What a policy leaf holds to identify the work it wants started.
    type Action: fmt::Debug;

    fn start(&mut self, action: &Self::Action) -> anyhow::Result<()>;

    fn is_complete(&self, action: &Self::Action) -> bool;

    /// Whether `action` finished without succeeding. Systems that cannot fail report `false`.
    fn has_failed(&self, _action: &Self::Action) -> bool {
        false
    }

    fn clear_actions(&mut self);
}

type ActionFactory = Box<dyn FnMut() -> Box<dyn Action>>;

struct RunningAction {
    key: ActionKey,
    action: Box<dyn Action>,
}

/// Single-slot action runtime keyed by [`ActionKey`].
///
/// At most one action is in flight: starting a different key cancels the current one.
/// The host advances the in-flight action once per frame with [`ActionQueue::tick`].
#[derive(Default)]
pub struct ActionQueue {
    factories: BTreeMap<ActionKey, ActionFactory>,
    current: Option<RunningAction>,
    just_finished: Option<(ActionKey, ActionOutcome)>,
    clears: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, key: ActionKey, factory: F)
    where
        F: FnMut() -> Box<dyn Action> + 'static,
    {
        self.factories.insert(key, Box::new(factory));
    }

    pub fn with_action<F>(mut self, key: ActionKey, factory: F) -> Self
    where
        F: FnMut() -> Box<dyn Action> + 'static,
    {
        self.register(key, factory);
        self
    }

    pub fn current_key(&self) -> Option<ActionKey> {
        self.current.as_ref().map(|a| a.key)
    }

    pub fn is_running(&self, key: ActionKey) -> bool {
        self.current_key() == Some(key)
    }

    pub fn last_outcome(&self, key: ActionKey) -> Option<ActionOutcome> {
        match self.just_finished {
            Some((finished_key, outcome)) if finished_key == key => Some(outcome),
            _ => None,
        }
    }

    /// Number of times [`ActionSystem::clear_actions`] was called.
    pub fn clear_count(&self) -> u64 {
        self.clears
    }

    pub fn tick(&mut self, ctx: &TickContext) -> Option<ActionOutcome> {
        let current = self.current.as_mut()?;

        let status = current.action.tick(ctx);
        let outcome = status.outcome()?;
        let key = current.key;

        tracing::debug!(action = %key, ?outcome, tick = ctx.tick, "action finished");
        self.current = None;
        self.just_finished = Some((key, outcome));
        Some(outcome)
    }

    fn cancel_current(&mut self) {
        if let Some(mut current) = self.current.take() {
            tracing::debug!(action = %current.key, "action cancelled");
            current.action.cancel();
        }
    }
}

impl ActionSystem for ActionQueue {
    type Action = ActionKey;

    fn start(&mut self, key: &ActionKey) -> anyhow::Result<()> {
        let key = *key;
        if self.is_running(key) {
            return Ok(());
        }

        let factory = self
            .factories
            .get_mut(&key)
            .ok_or(ActionError::Unregistered(key))?;
        let action = factory();

        self.cancel_current();
        self.just_finished = None;
        self.current = Some(RunningAction { key, action });
        tracing::debug!(action = %key, "action started");
        Ok(())
    }

    fn is_complete(&self, key: &ActionKey) -> bool {
        self.last_outcome(*key) == Some(ActionOutcome::Success)
    }

    fn has_failed(&self, key: &ActionKey) -> bool {
        self.last_outcome(*key) == Some(ActionOutcome::Failure)
    }

    fn clear_actions(&mut self) {
        self.clears += 1;
        self.cancel_current();
        self.just_finished = None;
    }
}
