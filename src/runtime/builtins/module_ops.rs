use std::rc::Rc;

use crate::runtime::{
    error::RuntimeError,
    object::Variable,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_symbol, arg_variable, check_arity, check_arity_range, optional, ret};

fn variable_or_false(var: Option<Rc<Variable>>) -> Value {
    var.map(Value::Variable).unwrap_or(Value::FALSE)
}

/// `(define! sym value)`: defines in the current module, returning the
/// variable.
pub(super) fn builtin_define(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "define!")?;
    let sym = arg_symbol(&inv.args, 0, "define!")?;
    let module = machine.current_module();
    let var = machine.module_define(&module, sym, inv.args[1].clone())?;
    ret(inv, Value::Variable(var))
}

/// `(module-local-variable module sym)`: `#f` when not bound locally.
pub(super) fn builtin_module_local_variable(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "module-local-variable")?;
    let sym = arg_symbol(&inv.args, 1, "module-local-variable")?;
    let var = machine.module_local_variable(&inv.args[0], sym)?;
    ret(inv, variable_or_false(var))
}

/// `(module-variable module sym)`: local or imported, `#f` when absent.
pub(super) fn builtin_module_variable(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "module-variable")?;
    let sym = arg_symbol(&inv.args, 1, "module-variable")?;
    let var = machine.module_variable(&inv.args[0], sym)?;
    ret(inv, variable_or_false(var))
}

pub(super) fn builtin_get_pre_modules_obarray(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 0, "%get-pre-modules-obarray")?;
    let obarray = machine.pre_modules_obarray();
    ret(inv, obarray)
}

/// `(current-module)`
pub(super) fn builtin_current_module(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 0, "current-module")?;
    let module = machine.current_module();
    ret(inv, module)
}

/// `(set-current-module module)`: returns the previous module. The first
/// call completes boot.
pub(super) fn builtin_set_current_module(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "set-current-module")?;
    let old = machine.set_current_module(inv.args[0].clone())?;
    ret(inv, old)
}

/// `(make-variable [value])`; without a value the variable is unbound.
pub(super) fn builtin_make_variable(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, "make-variable")?;
    let var = match inv.args.first() {
        Some(value) => Variable::new(value.clone()),
        None => Variable::unbound(),
    };
    ret(inv, Value::Variable(Rc::new(var)))
}

pub(super) fn builtin_make_undefined_variable(
    _machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, "make-undefined-variable")?;
    ret(inv, Value::Variable(Rc::new(Variable::unbound())))
}

pub(super) fn builtin_is_variable_bound(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "variable-bound?")?;
    let var = arg_variable(&inv.args, 0, "variable-bound?")?;
    ret(inv, Value::from_bool(var.is_bound()))
}

/// `(variable-ref var)`: fails on a variable that was never assigned.
pub(super) fn builtin_variable_ref(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "variable-ref")?;
    let var = arg_variable(&inv.args, 0, "variable-ref")?;
    if !var.is_bound() {
        return Err(RuntimeError::UnboundVariable {
            name: "<anonymous variable>".to_string(),
        });
    }
    ret(inv, var.get())
}

pub(super) fn builtin_variable_set(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "variable-set!")?;
    let var = arg_variable(&inv.args, 0, "variable-set!")?;
    var.set(inv.args[1].clone());
    ret(inv, Value::Unspecified)
}

/// `(make-module [name] [uses])`, a module with a fresh obarray.
pub(super) fn builtin_make_module(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 2, "make-module")?;
    let name = optional(&inv.args, 0);
    let uses = match inv.args.get(1) {
        Some(list) => list.list_to_vec()?,
        None => Vec::new(),
    };
    let module = machine.make_module(name, uses);
    ret(inv, module)
}

/// `(module-use! module interface)`
pub(super) fn builtin_module_use(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "module-use!")?;
    machine.module_use(&inv.args[0], inv.args[1].clone())?;
    ret(inv, Value::Unspecified)
}
