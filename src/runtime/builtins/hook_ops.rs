use std::rc::Rc;

use crate::runtime::{
    closure::{Closure, Code},
    error::RuntimeError,
    object::Hook,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_hook, arg_index, check_arity, check_arity_range, check_min_arity, ret, self_closure};

/// `(make-hook [arity])`, arity defaulting to 0.
pub(super) fn builtin_make_hook(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, "make-hook")?;
    let arity = if inv.args.is_empty() {
        0
    } else {
        arg_index(&inv.args, 0, "make-hook")?
    };
    ret(inv, Value::Hook(Rc::new(Hook::new(arity))))
}

/// `(add-hook! hook proc [append?])`
pub(super) fn builtin_add_hook(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 2, 3, "add-hook!")?;
    let hook = arg_hook(&inv.args, 0, "add-hook!")?;
    let append = inv.args.get(2).is_some_and(Value::is_true);
    hook.add(inv.args[1].clone(), append);
    ret(inv, Value::Unspecified)
}

/// `(run-hook hook arg ...)`: applies every procedure in order, then
/// returns the unspecified value.
pub(super) fn builtin_run_hook(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_min_arity(&inv.args, 1, "run-hook")?;
    let hook = arg_hook(&inv.args, 0, "run-hook")?;
    let args = Value::list(inv.args[1..].iter().cloned());
    run_step(inv.k, Value::list(hook.procedures()), args)
}

fn run_step(k: Value, procedures: Value, args: Value) -> Result<Step, RuntimeError> {
    let Value::Pair(cell) = &procedures else {
        return Ok(Step::Return {
            k,
            values: vec![Value::Unspecified],
        });
    };
    let next = Closure::with_free(
        Some("run-hook"),
        Code::Native(run_next),
        vec![k, cell.cdr(), args.clone()],
    );
    Ok(Step::Call(Invocation::new(
        cell.car(),
        Value::Closure(Rc::new(next)),
        args.list_to_vec()?,
    )))
}

fn run_next(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let closure = self_closure(&inv, "run-hook")?;
    run_step(closure.free_ref(0)?, closure.free_ref(1)?, closure.free_ref(2)?)
}

pub(super) fn builtin_is_hook(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "hook?")?;
    let result = matches!(inv.args[0], Value::Hook(_));
    ret(inv, Value::from_bool(result))
}
