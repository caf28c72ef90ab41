use std::rc::Rc;

use crate::runtime::{
    closure::Closure,
    error::RuntimeError,
    object::{Fluid, HashTable, Hook, SyntaxObject, Variable},
    structs::Struct,
    symbol::Symbol,
    value::Value,
    vm::{Invocation, Step},
};

pub(crate) fn type_error(name: &'static str, expected: &'static str, got: &Value) -> RuntimeError {
    RuntimeError::WrongType {
        procedure: name,
        expected,
        got: got.type_name(),
    }
}

pub(crate) fn check_arity(args: &[Value], expected: usize, name: &'static str) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::WrongNumberOfArgs {
            procedure: name,
            expected: expected.to_string(),
            got: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_arity_range(
    args: &[Value],
    min: usize,
    max: usize,
    name: &'static str,
) -> Result<(), RuntimeError> {
    if args.len() < min || args.len() > max {
        return Err(RuntimeError::WrongNumberOfArgs {
            procedure: name,
            expected: format!("{}..{}", min, max),
            got: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_min_arity(args: &[Value], min: usize, name: &'static str) -> Result<(), RuntimeError> {
    if args.len() < min {
        return Err(RuntimeError::WrongNumberOfArgs {
            procedure: name,
            expected: format!("at least {}", min),
            got: args.len(),
        });
    }
    Ok(())
}

/// Delivers a single value to the invocation's continuation.
pub(crate) fn ret(inv: Invocation, value: Value) -> Result<Step, RuntimeError> {
    Ok(Step::Return {
        k: inv.k,
        values: vec![value],
    })
}

pub(crate) fn arg_symbol(args: &[Value], index: usize, name: &'static str) -> Result<Symbol, RuntimeError> {
    match &args[index] {
        Value::Symbol(sym) => Ok(*sym),
        other => Err(type_error(name, "Symbol", other)),
    }
}

pub(crate) fn arg_string<'a>(args: &'a [Value], index: usize, name: &'static str) -> Result<&'a str, RuntimeError> {
    match &args[index] {
        Value::String(s) => Ok(s),
        other => Err(type_error(name, "String", other)),
    }
}

pub(crate) fn arg_index(args: &[Value], index: usize, name: &'static str) -> Result<usize, RuntimeError> {
    match &args[index] {
        Value::Integer(v) if *v >= 0 => Ok(*v as usize),
        other => Err(type_error(name, "non-negative Integer", other)),
    }
}

pub(crate) fn arg_struct(args: &[Value], index: usize, name: &'static str) -> Result<Rc<Struct>, RuntimeError> {
    match &args[index] {
        Value::Struct(s) => Ok(s.clone()),
        other => Err(type_error(name, "Struct", other)),
    }
}

pub(crate) fn arg_fluid(args: &[Value], index: usize, name: &'static str) -> Result<Rc<Fluid>, RuntimeError> {
    match &args[index] {
        Value::Fluid(f) => Ok(f.clone()),
        other => Err(type_error(name, "Fluid", other)),
    }
}

pub(crate) fn arg_variable(args: &[Value], index: usize, name: &'static str) -> Result<Rc<Variable>, RuntimeError> {
    match &args[index] {
        Value::Variable(v) => Ok(v.clone()),
        other => Err(type_error(name, "Variable", other)),
    }
}

pub(crate) fn arg_hash_table(args: &[Value], index: usize, name: &'static str) -> Result<Rc<HashTable>, RuntimeError> {
    match &args[index] {
        Value::HashTable(h) => Ok(h.clone()),
        other => Err(type_error(name, "HashTable", other)),
    }
}

pub(crate) fn arg_hook(args: &[Value], index: usize, name: &'static str) -> Result<Rc<Hook>, RuntimeError> {
    match &args[index] {
        Value::Hook(h) => Ok(h.clone()),
        other => Err(type_error(name, "Hook", other)),
    }
}

pub(crate) fn arg_syntax(args: &[Value], index: usize, name: &'static str) -> Result<Rc<SyntaxObject>, RuntimeError> {
    match &args[index] {
        Value::Syntax(s) => Ok(s.clone()),
        other => Err(type_error(name, "Syntax", other)),
    }
}

/// The closure an invocation is running, for reading its free variables.
pub(crate) fn self_closure(inv: &Invocation, name: &'static str) -> Result<Rc<Closure>, RuntimeError> {
    match &inv.callee {
        Value::Closure(c) => Ok(c.clone()),
        other => Err(type_error(name, "Closure", other)),
    }
}

/// `#f` when absent, otherwise the argument itself.
pub(crate) fn optional(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::FALSE)
}
