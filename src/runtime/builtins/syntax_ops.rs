use std::rc::Rc;

use crate::runtime::{
    error::RuntimeError,
    object::{Macro, SyntaxObject},
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_syntax, check_arity, ret};

/// `(make-syntax expression wrap module)`
pub(super) fn builtin_make_syntax(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "make-syntax")?;
    let mut args = inv.args.into_iter();
    let syntax = SyntaxObject {
        expression: args.next().unwrap_or(Value::FALSE),
        wrap: args.next().unwrap_or(Value::FALSE),
        module: args.next().unwrap_or(Value::FALSE),
    };
    Ok(Step::Return {
        k: inv.k,
        values: vec![Value::Syntax(Rc::new(syntax))],
    })
}

pub(super) fn builtin_is_syntax(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "syntax?")?;
    let result = matches!(inv.args[0], Value::Syntax(_));
    ret(inv, Value::from_bool(result))
}

pub(super) fn builtin_syntax_expression(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "syntax-expression")?;
    let expression = arg_syntax(&inv.args, 0, "syntax-expression")?.expression.clone();
    ret(inv, expression)
}

pub(super) fn builtin_syntax_wrap(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "syntax-wrap")?;
    let wrap = arg_syntax(&inv.args, 0, "syntax-wrap")?.wrap.clone();
    ret(inv, wrap)
}

pub(super) fn builtin_syntax_module(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "syntax-module")?;
    let module = arg_syntax(&inv.args, 0, "syntax-module")?.module.clone();
    ret(inv, module)
}

/// `(make-syntax-transformer name type binding)`
pub(super) fn builtin_make_syntax_transformer(
    _machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "make-syntax-transformer")?;
    let mut args = inv.args.into_iter();
    let transformer = Macro {
        name: args.next().unwrap_or(Value::FALSE),
        kind: args.next().unwrap_or(Value::FALSE),
        binding: args.next().unwrap_or(Value::FALSE),
    };
    Ok(Step::Return {
        k: inv.k,
        values: vec![Value::Macro(Rc::new(transformer))],
    })
}
