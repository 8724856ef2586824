//! Tick-driven behavior tree engine built on `ai-core`.
//!
//! Trees are assembled with [`BtBuilder`] and driven by [`BehaviorTree::tick`]. Every tick
//! runs in two phases: pending interrupts/resets are applied across the whole tree first,
//! then the root's control flow runs. Leaves talk to the agent only through
//! [`ai_core::ActionSystem`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod bt;
pub mod builder;
pub mod config;
pub mod error;
pub mod nodes;
pub mod signal;
pub mod tree;

pub use bt::{BtStatus, Lifecycle};
pub use builder::BtBuilder;
pub use config::{TreeConfig, DEFAULT_TIME_BUDGET};
pub use error::StructuralError;
pub use nodes::{Failover, Node, NodeKind, TickScope, SELECTOR_FAILOVER};
pub use signal::{Interrupt, NodeId, SignalBus, Subscription};
pub use tree::BehaviorTree;
