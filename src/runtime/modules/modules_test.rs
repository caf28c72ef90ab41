use std::rc::Rc;

use crate::runtime::{error::RuntimeError, value::Value, vm::Machine};

use super::{MODULE_INDEX_IMPORT_OBARRAY, MODULE_INDEX_NAME};

fn booted() -> (Machine, Value) {
    let mut machine = Machine::new();
    let root = machine.boot_standalone().unwrap();
    (machine, root)
}

fn module_named(machine: &mut Machine, parts: &[&str]) -> (Value, Value) {
    let name = Value::list(parts.iter().map(|p| machine.symbol(p)).collect::<Vec<_>>());
    let module = machine.make_module(name.clone(), vec![]);
    machine.register_module(&name, module.clone());
    (name, module)
}

#[test]
fn definitions_before_boot_stay_visible_after() {
    let mut machine = Machine::new();
    machine.define("early", Value::Integer(1)).unwrap();
    let early = machine.intern("early");
    let before = machine.lookup(early).unwrap();

    machine.boot_standalone().unwrap();
    assert!(machine.module_system_booted());
    let after = machine.lookup(early).unwrap();
    assert!(Rc::ptr_eq(&before, &after));
    assert_eq!(after.get(), Value::Integer(1));
}

#[test]
fn boot_without_bootstrap_procedures_stays_flat() {
    let mut machine = Machine::new();
    assert!(matches!(
        machine.boot_complete(),
        Err(RuntimeError::UnboundVariable { .. })
    ));
    assert!(!machine.module_system_booted());
    assert_eq!(machine.current_module(), Value::FALSE);
    assert_eq!(machine.the_root_module(), Value::FALSE);
}

#[test]
fn set_current_module_returns_previous() {
    let (mut machine, root) = booted();
    let (_, other) = module_named(&mut machine, &["other"]);
    let previous = machine.set_current_module(other.clone()).unwrap();
    assert!(previous.is_eq(&root));
    assert!(machine.current_module().is_eq(&other));
}

#[test]
fn local_binding_shadows_imports() {
    let (mut machine, _) = booted();
    let (_, library) = module_named(&mut machine, &["library"]);
    let (_, user) = module_named(&mut machine, &["user"]);
    let x = machine.intern("x");
    machine.module_define(&library, x, Value::Integer(1)).unwrap();
    machine.module_use(&user, library).unwrap();
    machine.module_define(&user, x, Value::Integer(2)).unwrap();

    let var = machine.module_lookup(&user, x).unwrap();
    assert_eq!(var.get(), Value::Integer(2));
}

#[test]
fn distinct_imports_of_one_name_are_ambiguous() {
    let (mut machine, _) = booted();
    let (_, first) = module_named(&mut machine, &["first"]);
    let (_, second) = module_named(&mut machine, &["second"]);
    let (_, user) = module_named(&mut machine, &["user"]);
    let x = machine.intern("x");
    machine.module_define(&first, x, Value::Integer(1)).unwrap();
    machine.module_define(&second, x, Value::Integer(2)).unwrap();
    machine.module_use(&user, first).unwrap();
    machine.module_use(&user, second).unwrap();

    assert!(matches!(
        machine.module_variable(&user, x),
        Err(RuntimeError::AmbiguousBinding { name }) if name == "x"
    ));
}

#[test]
fn a_binding_reached_through_two_imports_is_ambiguous() {
    let (mut machine, _) = booted();
    let (_, base) = module_named(&mut machine, &["base"]);
    let (_, wrapper) = module_named(&mut machine, &["wrapper"]);
    let (_, user) = module_named(&mut machine, &["user"]);
    let shared = machine.intern("shared");
    machine.module_define(&base, shared, Value::Integer(1)).unwrap();
    machine.module_use(&wrapper, base.clone()).unwrap();
    machine.module_use(&user, base).unwrap();
    machine.module_use(&user, wrapper).unwrap();

    assert!(matches!(
        machine.module_variable(&user, shared),
        Err(RuntimeError::AmbiguousBinding { name }) if name == "shared"
    ));
}

#[test]
fn resolved_imports_are_memoized() {
    let (mut machine, _) = booted();
    let (_, library) = module_named(&mut machine, &["library"]);
    let (_, user) = module_named(&mut machine, &["user"]);
    let x = machine.intern("x");
    let defined = machine.module_define(&library, x, Value::Integer(1)).unwrap();
    machine.module_use(&user, library).unwrap();
    machine.module_lookup(&user, x).unwrap();

    let Value::Struct(module) = &user else {
        panic!("expected module struct");
    };
    let Value::HashTable(imports) = module.field(MODULE_INDEX_IMPORT_OBARRAY).unwrap() else {
        panic!("expected import obarray");
    };
    let cached = imports.get(&Value::Symbol(x));
    assert!(matches!(cached, Some(Value::Variable(v)) if Rc::ptr_eq(&v, &defined)));
}

#[test]
fn resolve_checks_boundness_on_request() {
    let (mut machine, root) = booted();
    let y = machine.intern("y");
    machine.ensure_local_variable(&root, y).unwrap();

    assert!(machine.resolve(y, false).is_ok());
    assert!(matches!(
        machine.resolve(y, true),
        Err(RuntimeError::UnboundVariable { name }) if name == "y"
    ));
}

#[test]
fn cached_lookup_uses_the_scope_module() {
    let (mut machine, _) = booted();
    let (_, scoped) = module_named(&mut machine, &["scoped"]);
    let z = machine.intern("z");
    machine.module_define(&scoped, z, Value::Integer(5)).unwrap();
    machine.cache_current_module(scoped, 7);

    assert_eq!(machine.cached_lookup(7, z, true).unwrap().get(), Value::Integer(5));
    // unknown scopes fall back to the root module, which lacks `z`
    assert!(matches!(
        machine.cached_lookup(8, z, true),
        Err(RuntimeError::UnboundVariable { .. })
    ));
}

#[test]
fn module_box_before_boot_accepts_core_namespace_only() {
    let mut machine = Machine::new();
    let apply = machine.intern("apply");
    let guile = Value::list(vec![machine.symbol("guile")]);
    let other = Value::list(vec![machine.symbol("ice-9"), machine.symbol("match")]);

    let var = machine.cached_module_box(&guile, apply, true, true).unwrap();
    assert!(var.get().is_procedure());
    assert!(matches!(
        machine.cached_module_box(&other, apply, true, true),
        Err(RuntimeError::Unimplemented { .. })
    ));
}

#[test]
fn module_box_after_boot_resolves_public_and_private() {
    let (mut machine, _) = booted();
    let (name, library) = module_named(&mut machine, &["library"]);
    let (_, interface) = module_named(&mut machine, &["library", "interface"]);
    machine
        .set_module_public_interface(&library, interface.clone())
        .unwrap();
    let exported = machine.intern("exported");
    let hidden = machine.intern("hidden");
    machine.module_define(&interface, exported, Value::Integer(1)).unwrap();
    machine.module_define(&library, hidden, Value::Integer(2)).unwrap();

    let public = machine.cached_module_box(&name, exported, true, true).unwrap();
    assert_eq!(public.get(), Value::Integer(1));
    let private = machine.cached_module_box(&name, hidden, false, true).unwrap();
    assert_eq!(private.get(), Value::Integer(2));
    assert!(matches!(
        machine.cached_module_box(&name, hidden, true, true),
        Err(RuntimeError::UnboundVariable { .. })
    ));
}

#[test]
fn module_box_for_missing_module_fails() {
    let (mut machine, _) = booted();
    let name = Value::list(vec![machine.symbol("nowhere")]);
    let sym = machine.intern("x");
    let result = machine.cached_module_box(&name, sym, false, true);
    // the standalone resolver creates missing modules on demand with
    // #:ensure #t, but qualified references ask with #:ensure #f
    assert!(matches!(result, Err(RuntimeError::NoSuchModule { .. })));
}

#[test]
fn bootstrap_symbol_bypasses_resolution() {
    let (mut machine, _) = booted();
    machine.define("equal?", Value::Integer(0)).unwrap();
    let equal = machine.intern("equal?");
    let name = Value::list(vec![machine.symbol("nowhere")]);
    let var = machine.cached_module_box(&name, equal, true, true).unwrap();
    assert_eq!(var.get(), Value::Integer(0));
}

#[test]
fn modules_carry_their_names() {
    let (mut machine, _) = booted();
    let (name, module) = module_named(&mut machine, &["named"]);
    let Value::Struct(module) = module else {
        panic!("expected module struct");
    };
    assert!(module.field(MODULE_INDEX_NAME).unwrap().is_eq(&name));
}

#[test]
fn long_module_names_are_compared_in_full() {
    let (mut machine, _) = booted();
    let mut parts: Vec<String> = (0..40).map(|i| format!("part{i}")).collect();
    let parts_a: Vec<&str> = parts.iter().map(String::as_str).collect();
    let (name_a, module_a) = module_named(&mut machine, &parts_a);
    parts[39] = "other".to_string();
    let parts_b: Vec<&str> = parts.iter().map(String::as_str).collect();
    let (name_b, module_b) = module_named(&mut machine, &parts_b);

    let resolve = machine.intern("resolve-module");
    let resolve = machine.lookup(resolve).unwrap().get();
    let ensure = machine.keyword("ensure");
    let found_a = machine
        .call1(resolve.clone(), vec![name_a, ensure.clone(), Value::FALSE])
        .unwrap();
    let found_b = machine
        .call1(resolve, vec![name_b, ensure, Value::FALSE])
        .unwrap();
    assert!(found_a.is_eq(&module_a));
    assert!(found_b.is_eq(&module_b));
    assert!(!found_a.is_eq(&found_b));
}
