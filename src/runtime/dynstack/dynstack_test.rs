use std::rc::Rc;

use crate::runtime::{
    dynstack::{DynStack, FrameHandle, Transition, shared_prefix_len},
    frame::DynFrame,
    value::Value,
};

fn h(i: u32) -> FrameHandle {
    FrameHandle::new_for_test(i)
}

fn prompt(tag: Value) -> DynFrame {
    DynFrame::Prompt {
        tag,
        escape_only: false,
        handler: Value::FALSE,
    }
}

#[test]
fn shared_prefix_stops_at_first_difference() {
    assert_eq!(shared_prefix_len(&[h(0), h(1), h(2)], &[h(0), h(1), h(5)]), 2);
    assert_eq!(shared_prefix_len(&[h(0)], &[h(0), h(1)]), 1);
    assert_eq!(shared_prefix_len(&[], &[h(0)]), 0);
    assert_eq!(shared_prefix_len(&[h(3), h(1)], &[h(0), h(1)]), 0);
}

#[test]
fn transition_unwinds_innermost_first_and_rewinds_outermost_first() {
    let current = [h(0), h(1), h(2), h(3)];
    let target = [h(0), h(1), h(7), h(8)];
    let plan = Transition::plan(&current, &target);
    assert_eq!(plan.unwind, vec![h(3), h(2)]);
    assert_eq!(plan.rewind, vec![h(7), h(8)]);

    assert!(Transition::plan(&current, &current).is_empty());
}

#[test]
fn find_prompt_matches_by_identity_or_wildcard() {
    let mut stack = DynStack::new();
    let tag = Value::string("tag");
    stack.push(prompt(tag.clone()));
    stack.push(DynFrame::DynWind {
        enter: Value::FALSE,
        leave: Value::FALSE,
    });

    assert_eq!(stack.find_prompt(&tag), Some(0));
    // same text, different object
    assert_eq!(stack.find_prompt(&Value::string("tag")), None);

    stack.push(prompt(Value::TRUE));
    assert_eq!(stack.find_prompt(&Value::string("anything")), Some(2));
    assert_eq!(stack.find_prompt(&tag), Some(2));
}

#[test]
fn popped_frames_survive_while_a_snapshot_holds_them() {
    let mut stack = DynStack::new();
    let outer = stack.push(prompt(Value::Integer(1)));
    let inner = stack.push(prompt(Value::Integer(2)));
    let snapshot = stack.capture();
    stack.pop();

    assert_eq!(stack.collect(), 0);
    assert!(stack.frame(inner).is_some());

    drop(snapshot);
    assert_eq!(stack.collect(), 1);
    assert!(stack.frame(inner).is_none());
    assert!(stack.frame(outer).is_some());
}

#[test]
fn install_replaces_the_live_stack() {
    let mut stack = DynStack::new();
    let a = stack.push(prompt(Value::Integer(1)));
    let snapshot = stack.capture();
    stack.push(prompt(Value::Integer(2)));
    assert_eq!(stack.depth(), 2);

    stack.install(&snapshot);
    assert_eq!(stack.handles(), &[a]);
    assert_eq!(Rc::strong_count(&snapshot), 1);
}
