use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    closure::Closure,
    value::Value,
    vm::{Machine, Step},
};

fn global(machine: &mut Machine, name: &str) -> Value {
    let sym = machine.intern(name);
    machine.lookup(sym).unwrap().get()
}

fn logger(log: &Rc<RefCell<Vec<(i64, usize)>>>, id: i64) -> Value {
    let log = log.clone();
    Value::Closure(Rc::new(Closure::host("logger", move |_, inv| {
        log.borrow_mut().push((id, inv.args.len()));
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(id)],
        })
    })))
}

#[test]
fn run_hook_calls_procedures_in_order_with_arguments() {
    let mut machine = Machine::new();
    let make_hook = global(&mut machine, "make-hook");
    let add_hook = global(&mut machine, "add-hook!");
    let run_hook = global(&mut machine, "run-hook");
    let log = Rc::new(RefCell::new(Vec::new()));

    let hook = machine.call1(make_hook, vec![Value::Integer(2)]).unwrap();
    machine
        .call(add_hook.clone(), vec![hook.clone(), logger(&log, 1)])
        .unwrap();
    machine
        .call(add_hook.clone(), vec![hook.clone(), logger(&log, 2), Value::TRUE])
        .unwrap();
    machine
        .call(add_hook, vec![hook.clone(), logger(&log, 0)])
        .unwrap();

    let result = machine
        .call1(run_hook, vec![hook, Value::Integer(10), Value::Integer(20)])
        .unwrap();
    assert_eq!(result, Value::Unspecified);
    assert_eq!(*log.borrow(), vec![(0, 2), (1, 2), (2, 2)]);
}

#[test]
fn make_hook_defaults_to_zero_arity() {
    let mut machine = Machine::new();
    let make_hook = global(&mut machine, "make-hook");
    let is_hook = global(&mut machine, "hook?");
    let hook = machine.call1(make_hook, vec![]).unwrap();
    let Value::Hook(inner) = &hook else {
        panic!("expected hook");
    };
    assert_eq!(inner.arity, 0);
    assert_eq!(machine.call1(is_hook.clone(), vec![hook]).unwrap(), Value::TRUE);
    assert_eq!(
        machine.call1(is_hook, vec![Value::FALSE]).unwrap(),
        Value::FALSE
    );
}

#[test]
fn running_an_empty_hook_returns_unspecified() {
    let mut machine = Machine::new();
    let make_hook = global(&mut machine, "make-hook");
    let run_hook = global(&mut machine, "run-hook");
    let hook = machine.call1(make_hook, vec![]).unwrap();
    assert_eq!(machine.call1(run_hook, vec![hook]).unwrap(), Value::Unspecified);
}

#[test]
fn syntax_objects_expose_their_parts() {
    let mut machine = Machine::new();
    let make_syntax = global(&mut machine, "make-syntax");
    let is_syntax = global(&mut machine, "syntax?");
    let expression = global(&mut machine, "syntax-expression");
    let wrap = global(&mut machine, "syntax-wrap");
    let module = global(&mut machine, "syntax-module");
    let x = machine.symbol("x");

    let syntax = machine
        .call1(make_syntax, vec![x.clone(), Value::Empty, Value::FALSE])
        .unwrap();
    assert_eq!(machine.call1(is_syntax.clone(), vec![syntax.clone()]).unwrap(), Value::TRUE);
    assert_eq!(machine.call1(is_syntax, vec![x.clone()]).unwrap(), Value::FALSE);
    assert_eq!(machine.call1(expression, vec![syntax.clone()]).unwrap(), x);
    assert_eq!(machine.call1(wrap, vec![syntax.clone()]).unwrap(), Value::Empty);
    assert_eq!(machine.call1(module, vec![syntax]).unwrap(), Value::FALSE);
}

#[test]
fn syntax_transformer_records_name_and_kind() {
    let mut machine = Machine::new();
    let make_transformer = global(&mut machine, "make-syntax-transformer");
    let name = machine.symbol("when");
    let kind = machine.symbol("macro");
    let transformer = machine
        .call1(make_transformer, vec![name.clone(), kind.clone(), Value::FALSE])
        .unwrap();
    let Value::Macro(inner) = transformer else {
        panic!("expected macro");
    };
    assert_eq!(inner.name, name);
    assert_eq!(inner.kind, kind);
}

#[test]
fn gensym_counts_up_from_a_prefix() {
    let mut machine = Machine::new();
    let gensym = global(&mut machine, "gensym");
    let to_string = global(&mut machine, "symbol->string");

    let first = machine.call1(gensym.clone(), vec![]).unwrap();
    let second = machine
        .call1(gensym, vec![Value::string("tmp-")])
        .unwrap();
    assert!(!first.is_eq(&second));

    let first_name = machine.call1(to_string.clone(), vec![first]).unwrap();
    let second_name = machine.call1(to_string, vec![second]).unwrap();
    assert!(matches!(first_name, Value::String(ref s) if &**s == "gen 0"));
    assert!(matches!(second_name, Value::String(ref s) if &**s == "tmp-1"));
}

#[test]
fn symbols_round_trip_through_strings() {
    let mut machine = Machine::new();
    let to_symbol = global(&mut machine, "string->symbol");
    let is_symbol = global(&mut machine, "symbol?");
    let is_keyword = global(&mut machine, "keyword?");
    let to_keyword = global(&mut machine, "symbol->keyword");

    let sym = machine.call1(to_symbol, vec![Value::string("car")]).unwrap();
    assert!(sym.is_eq(&machine.symbol("car")));
    assert_eq!(machine.call1(is_symbol, vec![sym.clone()]).unwrap(), Value::TRUE);
    let kw = machine.call1(to_keyword, vec![sym.clone()]).unwrap();
    assert_eq!(machine.call1(is_keyword.clone(), vec![kw]).unwrap(), Value::TRUE);
    assert_eq!(machine.call1(is_keyword, vec![sym]).unwrap(), Value::FALSE);
}
