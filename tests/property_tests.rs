use std::rc::Rc;

use proptest::prelude::*;
use skein::runtime::{
    closure::Closure,
    dynstack::{DynStack, FrameHandle, Transition, shared_prefix_len},
    frame::DynFrame,
    symbol::Interner,
    value::Value,
    vm::{Machine, Step},
};

fn wind_frame() -> DynFrame {
    DynFrame::DynWind {
        enter: Value::FALSE,
        leave: Value::FALSE,
    }
}

/// Pushes `count` frames and returns their handles, outermost first.
fn push_frames(stack: &mut DynStack, count: usize) -> Vec<FrameHandle> {
    (0..count).map(|_| stack.push(wind_frame())).collect()
}

fn count_args() -> Value {
    Value::Closure(Rc::new(Closure::host("count", |_, inv| {
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(inv.args.len() as i64)],
        })
    })))
}

proptest! {
    #[test]
    fn interning_is_idempotent(name in "[a-z!?*<>=%-]{0,16}") {
        let mut interner = Interner::new();
        let first = interner.intern(&name);
        let second = interner.intern(&name);
        prop_assert_eq!(first, second);
        prop_assert_eq!(interner.resolve(first), name.as_str());
        prop_assert_eq!(interner.lookup(&name), Some(first));
    }

    #[test]
    fn distinct_names_intern_to_distinct_symbols(
        a in "[a-z]{1,12}",
        b in "[a-z]{1,12}",
    ) {
        let mut interner = Interner::new();
        let sa = interner.intern(&a);
        let sb = interner.intern(&b);
        prop_assert_eq!(sa == sb, a == b);
    }

    #[test]
    fn machine_symbols_are_eq(name in "[a-z-]{1,12}") {
        let mut machine = Machine::new();
        let a = machine.symbol(&name);
        let b = machine.symbol(&name);
        prop_assert!(a.is_eq(&b));
    }

    #[test]
    fn prefixes_of_one_stack_share_the_shorter(
        depth in 0usize..16,
        a in 0usize..16,
        b in 0usize..16,
    ) {
        let mut stack = DynStack::new();
        let handles = push_frames(&mut stack, depth);
        let a = a.min(depth);
        let b = b.min(depth);
        prop_assert_eq!(shared_prefix_len(&handles[..a], &handles[..b]), a.min(b));
    }

    #[test]
    fn divergent_tails_share_only_the_base(
        base in 0usize..8,
        left in 1usize..6,
        right in 1usize..6,
    ) {
        let mut stack = DynStack::new();
        let shared = push_frames(&mut stack, base);
        let left_tail = push_frames(&mut stack, left);
        let right_tail = push_frames(&mut stack, right);

        let current: Vec<_> = shared.iter().chain(&left_tail).copied().collect();
        let target: Vec<_> = shared.iter().chain(&right_tail).copied().collect();
        prop_assert_eq!(shared_prefix_len(&current, &target), base);

        let plan = Transition::plan(&current, &target);
        prop_assert_eq!(plan.unwind.len(), left);
        prop_assert_eq!(plan.rewind.len(), right);
        // unwind runs innermost first, rewind outermost first
        prop_assert_eq!(plan.unwind.first(), left_tail.last());
        prop_assert_eq!(plan.rewind.first(), right_tail.first());
    }

    #[test]
    fn planning_a_stack_onto_itself_is_empty(depth in 0usize..16) {
        let mut stack = DynStack::new();
        let handles = push_frames(&mut stack, depth);
        prop_assert!(Transition::plan(&handles, &handles).is_empty());
    }

    #[test]
    fn apply_passes_leading_and_spread_arguments(
        leading in prop::collection::vec(any::<i64>(), 0..6),
        tail in prop::collection::vec(any::<i64>(), 0..6),
    ) {
        let mut machine = Machine::new();
        let apply = machine.builtin(0).unwrap();
        let mut args = vec![count_args()];
        args.extend(leading.iter().copied().map(Value::Integer));
        args.push(Value::list(tail.iter().copied().map(Value::Integer)));
        let count = machine.call1(apply, args).unwrap();
        prop_assert_eq!(count, Value::Integer((leading.len() + tail.len()) as i64));
    }
}
