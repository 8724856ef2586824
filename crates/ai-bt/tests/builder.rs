use std::borrow::Cow;
use std::cell::Cell;
use std::rc::Rc;

use ai_bt::{BtBuilder, BtStatus, NodeKind, StructuralError, TreeConfig};
use ai_core::{ActionKey, ActionQueue, TickContext};

fn builder() -> BtBuilder<ActionQueue> {
    BtBuilder::with_config(TreeConfig::default().with_name("guard"))
}

#[test]
fn end_without_open_scope_is_rejected() {
    let result = builder().condition("ok", |_, _| true).end().build();
    assert_eq!(result.err(), Some(StructuralError::UnbalancedEnd));
}

#[test]
fn second_decorator_child_is_rejected() {
    let result = builder()
        .inverter("not")
        .condition("first", |_, _| true)
        .condition("second", |_, _| true)
        .end()
        .build();

    assert_eq!(
        result.err(),
        Some(StructuralError::DecoratorOccupied {
            decorator: Cow::Borrowed("not"),
            child: Cow::Borrowed("second"),
        })
    );
}

#[test]
fn opening_a_scope_inside_a_full_decorator_is_rejected() {
    let result = builder()
        .repeater("loop", Some(2))
        .condition("first", |_, _| true)
        .sequence("late")
        .end()
        .end()
        .build();

    assert!(matches!(
        result.err(),
        Some(StructuralError::DecoratorOccupied { child, .. }) if child == "late"
    ));
}

#[test]
fn zero_repeat_count_is_rejected() {
    let result = builder()
        .repeater("never", Some(0))
        .condition("ok", |_, _| true)
        .end()
        .build();
    assert_eq!(
        result.err(),
        Some(StructuralError::ZeroRepeatCount(Cow::Borrowed("never")))
    );
}

#[test]
fn unreachable_parallel_threshold_is_rejected() {
    let result = builder()
        .parallel_with("three_of_two", 3)
        .condition("a", |_, _| true)
        .condition("b", |_, _| true)
        .end()
        .build();
    assert_eq!(
        result.err(),
        Some(StructuralError::InvalidParallelThreshold {
            name: Cow::Borrowed("three_of_two"),
            required: 3,
            children: 2,
        })
    );

    let result = builder()
        .parallel_with("none", 0)
        .condition("a", |_, _| true)
        .end()
        .build();
    assert!(matches!(
        result.err(),
        Some(StructuralError::InvalidParallelThreshold { required: 0, .. })
    ));
}

#[test]
fn precondition_needs_a_target() {
    let result = builder().precondition(|_, _| true).build();
    assert_eq!(result.err(), Some(StructuralError::DanglingPrecondition));
}

#[test]
fn empty_builder_has_nothing_to_build() {
    assert_eq!(builder().build().err(), Some(StructuralError::EmptyTree));
}

#[test]
fn first_structural_error_wins() {
    let result = builder()
        .end()
        .repeater("never", Some(0))
        .condition("ok", |_, _| true)
        .build();
    assert_eq!(result.err(), Some(StructuralError::UnbalancedEnd));
}

#[test]
fn root_closes_every_open_scope() {
    let staged = builder()
        .sequence("outer")
        .selector("inner")
        .condition("ok", |_, _| true);
    assert_eq!(staged.depth(), 2);

    let staged = staged.root();
    assert_eq!(staged.depth(), 0);

    let tree = staged.action("patrol", ActionKey("patrol")).build().unwrap();
    assert!(matches!(tree.root().kind(), NodeKind::Root(_)));
    assert_eq!(tree.root().children().len(), 2);
    assert_eq!(tree.root().children()[0].children()[0].name(), "inner");
}

#[test]
fn scope_precondition_gates_the_whole_branch() {
    let probes = Rc::new(Cell::new(0u32));
    let counted = Rc::clone(&probes);
    let open = Rc::new(Cell::new(false));
    let gate = Rc::clone(&open);

    let mut tree = builder()
        .sequence("guarded")
        .precondition(move |_, _| gate.get())
        .condition("probe", move |_, _| {
            counted.set(counted.get() + 1);
            true
        })
        .end()
        .build()
        .unwrap();
    let mut agent = ActionQueue::new();
    let ctx = TickContext::new(1, 0.1);

    assert_eq!(tree.tick(&ctx, &mut agent), BtStatus::Failure);
    assert_eq!(probes.get(), 0);

    open.set(true);
    assert_eq!(tree.tick(&ctx.next(), &mut agent), BtStatus::Success);
    assert_eq!(probes.get(), 1);
}

#[test]
fn tree_dump_lists_every_node_depth_first() {
    let mut tree = builder()
        .sequence("chase")
        .condition("sees", |_, _| true)
        .action("run", ActionKey("run"))
        .end()
        .action("patrol", ActionKey("patrol"))
        .build()
        .unwrap();

    assert_eq!(
        tree.log_tree(),
        concat!(
            "Root \"root\" [Ready, cursor 0]\n",
            "  Sequence \"chase\" [Ready, cursor 0]\n",
            "    Condition \"sees\" [Ready]\n",
            "    Action \"run\" [Ready]\n",
            "  Action \"patrol\" [Ready]\n",
        )
    );

    let mut agent = ActionQueue::new();
    tree.tick(&TickContext::new(0, 0.1), &mut agent);
    let dump = tree.log_tree();
    assert!(dump.contains("Sequence \"chase\" [Busy, cursor 1, last Running]"));
    assert!(dump.contains("Condition \"sees\" [Complete, last Success]"));
}
