//! Deterministic, engine-agnostic AI kernel primitives.
//!
//! Policies (such as the behavior tree engine in `ai-bt`) only ever talk to an
//! agent through [`ActionSystem`]. [`ActionQueue`] is a ready-made runtime that
//! hosts can embed to satisfy it.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod tick;

pub use action::{
    Action, ActionError, ActionKey, ActionOutcome, ActionQueue, ActionStatus, ActionSystem,
};
pub use tick::TickContext;
