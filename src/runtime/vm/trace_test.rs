use crate::runtime::value::Value;

use super::{Invocation, Machine, Step};

#[test]
fn call_lines_name_the_callee_and_arguments() {
    let mut machine = Machine::new();
    let values = machine.builtin(1).unwrap();
    let halt = machine.halt_continuation();
    let step = Step::Call(Invocation::new(
        values,
        halt,
        vec![Value::Integer(1), machine.symbol("a")],
    ));
    insta::assert_snapshot!(machine.format_step(&step), @"CALL   values [1, a] dyn=0");
}

#[test]
fn return_and_halt_lines_show_dynamic_depth() {
    let mut machine = Machine::new();
    let tag = machine.symbol("tag");
    machine.push_prompt(tag, true, Value::FALSE);
    let k = machine.halt_continuation();

    let ret = Step::Return {
        k,
        values: vec![Value::TRUE],
    };
    let halt = Step::Halt(vec![]);
    insta::assert_snapshot!(machine.format_step(&ret), @"RETURN halt [#t] dyn=1");
    insta::assert_snapshot!(machine.format_step(&halt), @"HALT   [] dyn=1");
}

#[test]
fn applicable_structs_get_a_placeholder_name() {
    let mut machine = Machine::new();
    let callee = machine.applicable_struct_vtable();
    let step = Step::Call(Invocation::new(callee, Value::FALSE, vec![]));
    assert!(machine.format_step(&step).starts_with("CALL   <applicable-struct>"));
}

#[test]
fn primop_lines_use_the_primitive_name() {
    let mut machine = Machine::new();
    let x = machine.symbol("x");
    insta::assert_snapshot!(
        machine.format_primop("cons", &[x, Value::Empty]),
        @"PRIM   cons [x, ()] dyn=0"
    );
}
