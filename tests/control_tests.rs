use std::{cell::RefCell, rc::Rc};

use skein::runtime::{
    closure::Closure,
    error::RuntimeError,
    value::Value,
    vm::{Invocation, Machine, Step},
};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn host<F>(name: &'static str, func: F) -> Value
where
    F: Fn(&mut Machine, Invocation) -> Result<Step, RuntimeError> + 'static,
{
    Value::Closure(Rc::new(Closure::host(name, func)))
}

fn global(machine: &mut Machine, name: &str) -> Value {
    let sym = machine.intern(name);
    machine.lookup(sym).unwrap().get()
}

fn note(log: &Log, label: &'static str) -> Value {
    let log = log.clone();
    host(label, move |_, inv| {
        log.borrow_mut().push(label);
        Ok(Step::Return {
            k: inv.k,
            values: vec![],
        })
    })
}

fn constant(value: Value) -> Value {
    host("constant", move |_, inv| {
        Ok(Step::Return {
            k: inv.k,
            values: vec![value.clone()],
        })
    })
}

fn recorder(seen: Rc<RefCell<Vec<Value>>>) -> Value {
    host("recorder", move |_, inv| {
        *seen.borrow_mut() = inv.args.clone();
        Ok(Step::Return {
            k: inv.k,
            values: vec![],
        })
    })
}

#[test]
fn nested_winds_enter_outside_in_and_leave_inside_out() {
    let mut machine = Machine::new();
    let log: Log = Rc::default();
    let wind = global(&mut machine, "dynamic-wind");

    let inner = wind.clone();
    let inner_enter = note(&log, "enter2");
    let inner_leave = note(&log, "leave2");
    let body = host("outer-body", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            inner.clone(),
            inv.k,
            vec![
                inner_enter.clone(),
                constant(Value::Integer(1)),
                inner_leave.clone(),
            ],
        )))
    });

    let result = machine
        .call1(wind, vec![note(&log, "enter1"), body, note(&log, "leave1")])
        .unwrap();
    assert_eq!(result, Value::Integer(1));
    assert_eq!(*log.borrow(), ["enter1", "enter2", "leave2", "leave1"]);
    assert_eq!(machine.dynstack_depth(), 0);
}

#[test]
fn abort_runs_leave_before_the_handler_and_never_reenters() {
    let mut machine = Machine::new();
    let log: Log = Rc::default();
    let wind = global(&mut machine, "dynamic-wind");
    let with_prompt = global(&mut machine, "call-with-prompt");
    let abort = global(&mut machine, "abort-to-prompt");
    let tag = machine.symbol("t");

    let abort_tag = tag.clone();
    let body = host("body", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            abort.clone(),
            inv.k,
            vec![abort_tag.clone()],
        )))
    });
    let enter = note(&log, "enter");
    let leave = note(&log, "leave");
    let thunk = host("thunk", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            wind.clone(),
            inv.k,
            vec![enter.clone(), body.clone(), leave.clone()],
        )))
    });
    let handler_log = log.clone();
    let handler = host("handler", move |_, inv| {
        handler_log.borrow_mut().push("handler");
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(9)],
        })
    });

    let result = machine.call1(with_prompt, vec![tag, thunk, handler]).unwrap();
    assert_eq!(result, Value::Integer(9));
    assert_eq!(*log.borrow(), ["enter", "leave", "handler"]);
    assert_eq!(machine.dynstack_depth(), 0);
}

#[test]
fn reinstating_a_continuation_reenters_its_extent_each_time() {
    let mut machine = Machine::new();
    let log: Log = Rc::default();
    let wind = global(&mut machine, "dynamic-wind");
    let call_cc = global(&mut machine, "call/cc");
    let saved: Rc<RefCell<Option<Value>>> = Rc::default();

    let slot = saved.clone();
    let receiver = host("receiver", move |_, inv| {
        *slot.borrow_mut() = inv.args.first().cloned();
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(0)],
        })
    });
    let body = host("body", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            call_cc.clone(),
            inv.k,
            vec![receiver.clone()],
        )))
    });
    machine
        .call(wind, vec![note(&log, "enter"), body, note(&log, "leave")])
        .unwrap();
    assert_eq!(*log.borrow(), ["enter", "leave"]);

    let k = saved.borrow().clone().unwrap();
    let first = machine.call1(k.clone(), vec![Value::Integer(5)]).unwrap();
    let second = machine.call1(k, vec![Value::Integer(5)]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        *log.borrow(),
        ["enter", "leave", "enter", "leave", "enter", "leave"]
    );
}

#[test]
fn local_bindings_shadow_imports() {
    let mut machine = Machine::new();
    machine.boot_standalone().unwrap();
    let name = machine.symbol("lib");
    let lib = machine.make_module(Value::list(vec![name]), vec![]);
    let name = machine.symbol("app");
    let app = machine.make_module(Value::list(vec![name]), vec![lib.clone()]);

    let y = machine.intern("y");
    machine.module_define(&lib, y, Value::Integer(1)).unwrap();
    machine.module_define(&app, y, Value::Integer(2)).unwrap();
    let var = machine.module_lookup(&app, y).unwrap();
    assert_eq!(var.get(), Value::Integer(2));
}

#[test]
fn two_imports_of_one_name_are_ambiguous() {
    let mut machine = Machine::new();
    machine.boot_standalone().unwrap();
    let name = machine.symbol("one");
    let one = machine.make_module(Value::list(vec![name]), vec![]);
    let name = machine.symbol("two");
    let two = machine.make_module(Value::list(vec![name]), vec![]);
    let name = machine.symbol("app");
    let app = machine.make_module(Value::list(vec![name]), vec![one.clone(), two.clone()]);

    let z = machine.intern("z");
    machine.module_define(&one, z, Value::Integer(1)).unwrap();
    machine.module_define(&two, z, Value::Integer(2)).unwrap();
    assert!(matches!(
        machine.module_lookup(&app, z),
        Err(RuntimeError::AmbiguousBinding { .. })
    ));
}

#[test]
fn a_pre_boot_binding_keeps_its_box_after_boot() {
    let mut machine = Machine::new();
    let before = machine.define("stable", Value::Integer(4)).unwrap();
    machine.boot_standalone().unwrap();
    assert!(machine.module_system_booted());

    let sym = machine.intern("stable");
    let after = machine.lookup(sym).unwrap();
    assert!(Rc::ptr_eq(&before, &after));
    assert_eq!(after.get(), Value::Integer(4));
}

#[test]
fn apply_spreads_its_last_argument() {
    let mut machine = Machine::new();
    let apply = global(&mut machine, "apply");
    let seen: Rc<RefCell<Vec<Value>>> = Rc::default();

    let tail = Value::list(vec![Value::Integer(3), Value::Integer(4)]);
    machine
        .call(
            apply.clone(),
            vec![
                recorder(seen.clone()),
                Value::Integer(1),
                Value::Integer(2),
                tail,
            ],
        )
        .unwrap();
    assert_eq!(
        *seen.borrow(),
        [1, 2, 3, 4].map(Value::Integer).to_vec()
    );

    seen.borrow_mut().push(Value::TRUE);
    machine
        .call(apply, vec![recorder(seen.clone()), Value::Empty])
        .unwrap();
    assert!(seen.borrow().is_empty());
}

#[test]
fn generic_allocation_defaults_unboxed_fields_to_zero() {
    let mut machine = Machine::new();
    let make_vtable = global(&mut machine, "make-vtable");
    let make_struct = global(&mut machine, "make-struct/no-tail");
    let vtable = machine
        .call1(make_vtable, vec![Value::string("pwuw")])
        .unwrap();
    let value = machine.symbol("v");
    let instance = machine
        .call1(make_struct, vec![vtable, value.clone()])
        .unwrap();
    let Value::Struct(instance) = instance else {
        panic!("expected a struct");
    };
    assert_eq!(instance.field(0).unwrap(), value);
    assert_eq!(instance.field(1).unwrap(), Value::Integer(0));
}

#[test]
fn uncaught_errors_reach_the_caller() {
    let mut machine = Machine::new();
    let err = machine.call(Value::Integer(1), vec![]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::NotApplicable {
            type_name: "Integer"
        }
    );
}
