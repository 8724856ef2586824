use std::time::Duration;

use ai_bt::{BtBuilder, BtStatus, Lifecycle, NodeKind, TreeConfig};
use ai_core::{ActionSystem, TickContext};

#[derive(Debug, Default)]
struct Scripted {
    started: Vec<&'static str>,
    complete: Vec<&'static str>,
    failed: Vec<&'static str>,
    clears: usize,
}

impl ActionSystem for Scripted {
    type Action = &'static str;

    fn start(&mut self, action: &&'static str) -> anyhow::Result<()> {
        self.started.push(*action);
        Ok(())
    }

    fn is_complete(&self, action: &&'static str) -> bool {
        self.complete.contains(action)
    }

    fn has_failed(&self, action: &&'static str) -> bool {
        self.failed.contains(action)
    }

    fn clear_actions(&mut self) {
        self.clears += 1;
    }
}

fn generous() -> TreeConfig {
    TreeConfig::default().with_time_budget(Duration::from_secs(10))
}

fn ctx(tick: u64) -> TickContext {
    TickContext::new(tick, 0.1)
}

#[test]
fn sequence_consumes_one_child_per_tick_then_succeeds() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .sequence("all")
        .condition("a", |_, _| true)
        .condition("b", |_, _| true)
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert!(matches!(tree.root().kind(), NodeKind::Sequence(_)));
    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.root().cursor(), Some(1));
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Success);
    assert_eq!(tree.root().cursor(), Some(0));
}

#[test]
fn sequence_fails_fast_and_restarts_from_the_first_child() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .sequence("fail_fast")
        .condition("ok", |_, _| true)
        .condition("nope", |_, _| false)
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Failure);
    assert_eq!(tree.root().cursor(), Some(0));

    assert_eq!(tree.tick(&ctx(3), &mut agent), BtStatus::Running);
    assert_eq!(tree.root().cursor(), Some(1));
}

#[test]
fn selector_advances_past_failures_one_tick_at_a_time() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .selector("first_wins")
        .condition("nope", |_, _| false)
        .condition("ok", |_, _| true)
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Success);
    assert_eq!(tree.root().cursor(), Some(0));
}

#[test]
fn selector_fails_after_exhausting_every_child() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .selector("all_fail")
        .condition("a", |_, _| false)
        .condition("b", |_, _| false)
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Failure);
    assert_eq!(tree.root().cursor(), Some(0));
}

#[test]
fn root_fails_over_within_the_tick_while_budget_remains() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .condition("nope", |_, _| false)
        .condition("ok", |_, _| true)
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert!(matches!(tree.root().kind(), NodeKind::Root(_)));
    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Success);
}

#[test]
fn root_yields_when_budget_is_spent() {
    let config = TreeConfig::default().with_time_budget(Duration::ZERO);
    let mut tree = BtBuilder::<Scripted>::with_config(config)
        .condition("nope", |_, _| false)
        .condition("ok", |_, _| true)
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.root().cursor(), Some(1));
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Success);
}

#[test]
fn parallel_runs_every_child_and_waits_for_all_by_default() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .parallel("both")
        .action("walk", "walk")
        .action("talk", "talk")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(agent.started, vec!["walk", "talk"]);

    agent.complete.push("walk");
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Running);

    agent.complete.push("talk");
    assert_eq!(tree.tick(&ctx(3), &mut agent), BtStatus::Success);
    // Each leaf was started exactly once; finished children are skipped.
    assert_eq!(agent.started, vec!["walk", "talk"]);
}

#[test]
fn parallel_threshold_succeeds_early_and_cancels_the_rest() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .parallel_with("any", 1)
        .action("walk", "walk")
        .action("talk", "talk")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(agent.clears, 0);

    agent.complete.push("walk");
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Success);
    // The losing branch is cancelled within the tick that decided the result.
    assert_eq!(agent.clears, 1);
    assert!(tree.root().children().iter().all(|child| child.lifecycle() == Lifecycle::Ready));
}

#[test]
fn parallel_fails_once_the_threshold_is_unreachable() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .parallel_with("two_of_three", 2)
        .action("a", "a")
        .action("b", "b")
        .action("c", "c")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    agent.failed.push("a");
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Running);
    agent.failed.push("b");
    assert_eq!(tree.tick(&ctx(3), &mut agent), BtStatus::Failure);
}

#[test]
fn parallel_runs_at_least_one_child_on_a_spent_budget() {
    let config = TreeConfig::default().with_time_budget(Duration::ZERO);
    let mut tree = BtBuilder::<Scripted>::with_config(config)
        .parallel("both")
        .action("walk", "walk")
        .action("talk", "talk")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(agent.started, vec!["walk"]);
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Running);
    assert_eq!(agent.started, vec!["walk", "talk"]);
}

#[test]
fn empty_composites_fail_at_runtime() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .sequence("empty")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Failure);
}

#[test]
fn selector_success_rewinds_its_children_immediately() {
    let mut tree = BtBuilder::<Scripted>::with_config(generous())
        .selector("pick")
        .condition("nope", |_, _| false)
        .action("walk", "walk")
        .end()
        .build()
        .unwrap();
    let mut agent = Scripted::default();

    assert_eq!(tree.tick(&ctx(1), &mut agent), BtStatus::Running);
    assert_eq!(tree.tick(&ctx(2), &mut agent), BtStatus::Running);
    agent.complete.push("walk");
    assert_eq!(tree.tick(&ctx(3), &mut agent), BtStatus::Success);

    assert!(tree.root().children().iter().all(|child| child.last_status().is_none()));
    assert_eq!(agent.clears, 0);
}
