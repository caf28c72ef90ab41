use crate::runtime::{error::RuntimeError, value::Value, vm::Machine};

fn global(machine: &mut Machine, name: &str) -> Value {
    let sym = machine.intern(name);
    machine.lookup(sym).unwrap().get()
}

#[test]
fn define_binds_in_the_flat_obarray_before_boot() {
    let mut machine = Machine::new();
    let define = global(&mut machine, "define!");
    let local = global(&mut machine, "module-local-variable");
    let x = machine.symbol("x");

    let var = machine
        .call1(define, vec![x.clone(), Value::Integer(10)])
        .unwrap();
    let found = machine.call1(local, vec![Value::FALSE, x]).unwrap();
    assert!(var.is_eq(&found));
    let Value::Variable(var) = var else {
        panic!("expected variable");
    };
    assert_eq!(var.get(), Value::Integer(10));
}

#[test]
fn module_variable_is_false_when_absent() {
    let mut machine = Machine::new();
    let module_variable = global(&mut machine, "module-variable");
    let missing = machine.symbol("no-such-binding");
    let result = machine
        .call1(module_variable, vec![Value::FALSE, missing])
        .unwrap();
    assert_eq!(result, Value::FALSE);
}

#[test]
fn pre_modules_obarray_is_shared() {
    let mut machine = Machine::new();
    let get = global(&mut machine, "%get-pre-modules-obarray");
    let first = machine.call1(get.clone(), vec![]).unwrap();
    let second = machine.call1(get, vec![]).unwrap();
    assert!(first.is_eq(&second));
    assert!(first.is_eq(&machine.pre_modules_obarray()));
}

#[test]
fn variables_track_boundness() {
    let mut machine = Machine::new();
    let make = global(&mut machine, "make-variable");
    let make_undefined = global(&mut machine, "make-undefined-variable");
    let is_bound = global(&mut machine, "variable-bound?");
    let variable_ref = global(&mut machine, "variable-ref");
    let variable_set = global(&mut machine, "variable-set!");

    let bound = machine.call1(make, vec![Value::Integer(1)]).unwrap();
    let unbound = machine.call1(make_undefined, vec![]).unwrap();
    assert_eq!(
        machine.call1(is_bound.clone(), vec![bound.clone()]).unwrap(),
        Value::TRUE
    );
    assert_eq!(
        machine.call1(is_bound.clone(), vec![unbound.clone()]).unwrap(),
        Value::FALSE
    );

    let err = machine.call(variable_ref.clone(), vec![unbound.clone()]);
    assert!(matches!(err, Err(RuntimeError::UnboundVariable { .. })));

    machine
        .call(variable_set, vec![unbound.clone(), Value::Integer(2)])
        .unwrap();
    assert_eq!(
        machine.call1(variable_ref, vec![unbound.clone()]).unwrap(),
        Value::Integer(2)
    );
    assert_eq!(machine.call1(is_bound, vec![unbound]).unwrap(), Value::TRUE);
}

#[test]
fn current_module_is_false_before_boot() {
    let mut machine = Machine::new();
    let current = global(&mut machine, "current-module");
    assert_eq!(machine.call1(current, vec![]).unwrap(), Value::FALSE);
    assert!(!machine.module_system_booted());
}

#[test]
fn set_current_module_fails_without_bootstrap_procedures() {
    let mut machine = Machine::new();
    let set_current = global(&mut machine, "set-current-module");
    let module = machine.make_root_module();
    let result = machine.call(set_current, vec![module]);
    assert!(matches!(result, Err(RuntimeError::UnboundVariable { .. })));
    assert!(!machine.module_system_booted());
}

#[test]
fn make_module_and_module_use() {
    let mut machine = Machine::new();
    machine.boot_standalone().unwrap();
    let make_module = global(&mut machine, "make-module");
    let module_use = global(&mut machine, "module-use!");
    let module_variable = global(&mut machine, "module-variable");

    let library = machine.call1(make_module.clone(), vec![]).unwrap();
    let user = machine.call1(make_module, vec![]).unwrap();
    let sym = machine.intern("shared");
    machine
        .module_define(&library, sym, Value::Integer(3))
        .unwrap();
    machine.call(module_use, vec![user.clone(), library]).unwrap();

    let var = machine
        .call1(module_variable, vec![user, Value::Symbol(sym)])
        .unwrap();
    let Value::Variable(var) = var else {
        panic!("expected imported variable");
    };
    assert_eq!(var.get(), Value::Integer(3));
}
