use std::rc::Rc;

use crate::runtime::{
    error::RuntimeError,
    structs::{Layout, make_struct},
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_struct, check_arity, check_arity_range, check_min_arity, optional, ret, type_error};

fn layout_text(machine: &Machine, value: &Value, name: &'static str) -> Result<String, RuntimeError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Symbol(sym) => Ok(machine.symbol_name(*sym).to_string()),
        other => Err(type_error(name, "String", other)),
    }
}

/// `(make-vtable fields [printer])`
pub(super) fn builtin_make_vtable(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 1, 2, "make-vtable")?;
    let fields = layout_text(machine, &inv.args[0], "make-vtable")?;
    let printer = optional(&inv.args, 1);
    let vtable = machine
        .vtables
        .make_vtable(&fields, printer, &mut machine.interner)?;
    ret(inv, Value::Struct(vtable))
}

/// `(make-struct-layout string)`: validates and interns a layout.
pub(super) fn builtin_make_struct_layout(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "make-struct-layout")?;
    let text = layout_text(machine, &inv.args[0], "make-struct-layout")?;
    Layout::parse(&text)?;
    let layout = machine.symbol(&text);
    ret(inv, layout)
}

/// `(make-struct/no-tail vtable init ...)`
pub(super) fn builtin_make_struct_no_tail(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_min_arity(&inv.args, 1, "make-struct/no-tail")?;
    let vtable = arg_struct(&inv.args, 0, "make-struct/no-tail")?;
    let instance = make_struct(&vtable, &inv.args[1..], &machine.interner)?;
    ret(inv, Value::Struct(instance))
}

/// `(make-struct vtable tail-size init ...)`; tail arrays are not supported.
pub(super) fn builtin_make_struct(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_min_arity(&inv.args, 2, "make-struct")?;
    let vtable = arg_struct(&inv.args, 0, "make-struct")?;
    match &inv.args[1] {
        Value::Integer(0) => {}
        Value::Integer(_) => return Err(RuntimeError::unimplemented("make-struct with a tail array")),
        other => return Err(type_error("make-struct", "Integer", other)),
    }
    let instance = make_struct(&vtable, &inv.args[2..], &machine.interner)?;
    ret(inv, Value::Struct(instance))
}

pub(super) fn builtin_is_struct_vtable(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "struct-vtable?")?;
    let result = matches!(&inv.args[0], Value::Struct(s) if s.is_vtable());
    ret(inv, Value::from_bool(result))
}

/// Accepted for compatibility; vtable names are not tracked.
pub(super) fn builtin_set_struct_vtable_name(
    _machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "set-struct-vtable-name!")?;
    ret(inv, Value::FALSE)
}

pub(super) fn builtin_struct_ref(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "struct-ref")?;
    let s = arg_struct(&inv.args, 0, "struct-ref")?;
    let index = super::helpers::arg_index(&inv.args, 1, "struct-ref")?;
    let value = s.field(index)?;
    ret(inv, value)
}

pub(super) fn builtin_struct_vtable(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "struct-vtable")?;
    let s: Rc<_> = arg_struct(&inv.args, 0, "struct-vtable")?;
    ret(inv, Value::Struct(s.vtable()))
}
