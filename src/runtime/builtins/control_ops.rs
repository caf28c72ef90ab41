use std::rc::Rc;

use crate::runtime::{
    NativeFn,
    closure::{Closure, Code},
    error::{FrameFamily, RuntimeError},
    object::Fluid,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{
    arg_fluid, check_arity, check_arity_range, check_min_arity, optional, ret, self_closure,
};

pub(super) fn builtin_apply(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    machine.apply(inv.k, inv.args)
}

pub(super) fn builtin_values(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    machine.values(inv.k, inv.args)
}

pub(super) fn builtin_abort_to_prompt(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_min_arity(&inv.args, 1, "abort-to-prompt")?;
    let mut args = inv.args;
    let tag = args.remove(0);
    machine.abort_to_prompt(inv.k, tag, args)
}

pub(super) fn builtin_call_with_values(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "call-with-values")?;
    let mut args = inv.args.into_iter();
    let producer = args.next().unwrap_or(Value::FALSE);
    let consumer = args.next().unwrap_or(Value::FALSE);
    machine.call_with_values(inv.k, producer, consumer)
}

pub(super) fn builtin_call_cc(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "call/cc")?;
    let receiver = inv.args[0].clone();
    machine.call_with_current_continuation(inv.k, receiver)
}

fn continuation(name: &'static str, body: NativeFn, free: Vec<Value>) -> Value {
    Value::Closure(Rc::new(Closure::with_free(Some(name), Code::Native(body), free)))
}

/// `(dynamic-wind before thunk after)`
pub(super) fn builtin_dynamic_wind(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "dynamic-wind")?;
    let before = inv.args[0].clone();
    let thunk = inv.args[1].clone();
    let after = inv.args[2].clone();
    machine.push_dynwind(before, after)?;
    let exit = continuation("dynamic-wind", leave_extent, vec![inv.k]);
    Ok(Step::Call(Invocation::new(thunk, exit, Vec::new())))
}

fn leave_extent(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let k = self_closure(&inv, "dynamic-wind")?.free_ref(0)?;
    machine.pop_dynamic(FrameFamily::Extent)?;
    Ok(Step::Return { k, values: inv.args })
}

/// `(call-with-prompt tag thunk handler)`: the handler is applied to the
/// resumption procedure and the aborted values, returning to the caller of
/// `call-with-prompt`.
pub(super) fn builtin_call_with_prompt(
    machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "call-with-prompt")?;
    let tag = inv.args[0].clone();
    let thunk = inv.args[1].clone();
    let handler = continuation(
        "prompt-handler",
        enter_handler,
        vec![inv.args[2].clone(), inv.k.clone()],
    );
    machine.push_prompt(tag, false, handler);
    let exit = continuation("call-with-prompt", leave_extent, vec![inv.k]);
    Ok(Step::Call(Invocation::new(thunk, exit, Vec::new())))
}

fn enter_handler(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let closure = self_closure(&inv, "call-with-prompt")?;
    let handler = closure.free_ref(0)?;
    let k = closure.free_ref(1)?;
    Ok(Step::Call(Invocation::new(handler, k, inv.args)))
}

/// `(with-fluid* fluid value thunk)`
pub(super) fn builtin_with_fluid(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "with-fluid*")?;
    let fluid = arg_fluid(&inv.args, 0, "with-fluid*")?;
    let value = inv.args[1].clone();
    let thunk = inv.args[2].clone();
    machine.push_fluid(fluid, value);
    let exit = continuation("with-fluid*", leave_fluid, vec![inv.k]);
    Ok(Step::Call(Invocation::new(thunk, exit, Vec::new())))
}

fn leave_fluid(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let k = self_closure(&inv, "with-fluid*")?.free_ref(0)?;
    machine.pop_fluid()?;
    Ok(Step::Return { k, values: inv.args })
}

/// `(make-fluid [init])`, init defaulting to `#f`.
pub(super) fn builtin_make_fluid(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, "make-fluid")?;
    let init = optional(&inv.args, 0);
    ret(inv, Value::Fluid(Rc::new(Fluid::new(init))))
}

pub(super) fn builtin_fluid_ref(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "fluid-ref")?;
    let fluid = arg_fluid(&inv.args, 0, "fluid-ref")?;
    ret(inv, fluid.get())
}

pub(super) fn builtin_fluid_set(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "fluid-set!")?;
    let fluid = arg_fluid(&inv.args, 0, "fluid-set!")?;
    fluid.set(inv.args[1].clone());
    ret(inv, Value::Unspecified)
}

pub(super) fn builtin_is_procedure(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "procedure?")?;
    let result = inv.args[0].is_procedure();
    ret(inv, Value::from_bool(result))
}
