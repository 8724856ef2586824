//! Tree controller: owns the root node and the broadcast channel, and drives the
//! two-phase tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use ai_core::{ActionSystem, TickContext};

use crate::bt::BtStatus;
use crate::config::TreeConfig;
use crate::nodes::{Node, TickScope};
use crate::signal::{Interrupt, SignalBus};

/// A built behavior tree for one agent.
///
/// Each [`tick`](Self::tick) first drains every pending interrupt/reset across the whole
/// tree (parents before children), and only then runs the root's control-flow logic.
pub struct BehaviorTree<A>
where
    A: ActionSystem + 'static,
{
    root: Node<A>,
    bus: SignalBus,
    config: TreeConfig,
    last: Option<BtStatus>,
}

impl<A> BehaviorTree<A>
where
    A: ActionSystem + 'static,
{
    pub(crate) fn new(root: Node<A>, bus: SignalBus, config: TreeConfig) -> Self {
        tracing::debug!(
            tree = %config.name,
            nodes = bus.subscriber_count(),
            budget_us = config.time_budget_micros,
            "behavior tree built"
        );
        Self {
            root,
            bus,
            config,
            last: None,
        }
    }

    pub fn root(&self) -> &Node<A> {
        &self.root
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Result of the most recent tick; `None` before the first one.
    pub fn last_status(&self) -> Option<BtStatus> {
        self.last
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    pub fn tick(&mut self, ctx: &TickContext, agent: &mut A) -> BtStatus {
        let span = tracing::debug_span!("bt.tick", tree = %self.config.name, tick = ctx.tick);
        let _enter = span.enter();

        let budget = self.config.time_budget();
        let root = &mut self.root;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let changed = root.drain_signals(agent);
            if changed > 0 {
                tracing::debug!(changed, "applied pending signals");
            }

            let mut scope = TickScope::new(ctx, agent, budget);
            let status = root.update(&mut scope);
            if scope.budget_exhausted() {
                tracing::trace!(elapsed_us = scope.elapsed().as_micros() as u64, "time budget spent");
            }
            status
        }));

        let status = match outcome {
            Ok(status) => status,
            Err(fault) => {
                tracing::error!(fault = %panic_message(fault.as_ref()), "uncaught fault during tick; resetting tree");
                self.recover(agent);
                BtStatus::Failure
            }
        };
        self.last = Some(status);
        status
    }

    /// Broadcasts an interrupt; every node observes it at the start of the next tick.
    pub fn interrupt(&self, interrupt: Interrupt) {
        let reached = self.bus.broadcast_interrupt(interrupt);
        tracing::debug!(tree = %self.config.name, reached, "interrupt broadcast");
    }

    /// Broadcasts a reset; every node observes it at the start of the next tick.
    pub fn reset(&self) {
        let reached = self.bus.broadcast_reset();
        tracing::debug!(tree = %self.config.name, reached, "reset broadcast");
    }

    /// Depth-first textual dump of the tree, for diagnostics.
    pub fn log_tree(&self) -> String {
        let mut out = String::new();
        self.root.write_tree(&mut out, 0);
        out
    }

    // Rewinds everything to ground state so the next tick starts clean.
    fn recover(&mut self, agent: &mut A) {
        self.bus.broadcast_reset();
        self.root.drain_signals(agent);
        agent.clear_actions();
    }
}

impl<A> Drop for BehaviorTree<A>
where
    A: ActionSystem + 'static,
{
    fn drop(&mut self) {
        self.root.destroy();
        tracing::debug!(
            tree = %self.config.name,
            remaining = self.bus.subscriber_count(),
            "behavior tree torn down"
        );
    }
}

fn panic_message(fault: &(dyn Any + Send)) -> String {
    if let Some(s) = fault.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = fault.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
