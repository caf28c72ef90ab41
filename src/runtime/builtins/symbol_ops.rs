use crate::runtime::{
    error::RuntimeError,
    symbol::Symbol,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_string, arg_symbol, check_arity, check_arity_range, ret, type_error};

const GENSYM_PREFIX: &str = "gen ";

pub(super) fn builtin_symbol_to_string(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "symbol->string")?;
    let sym = arg_symbol(&inv.args, 0, "symbol->string")?;
    let name = Value::string(machine.symbol_name(sym));
    ret(inv, name)
}

pub(super) fn builtin_string_to_symbol(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "string->symbol")?;
    let name = arg_string(&inv.args, 0, "string->symbol")?;
    let sym = machine.symbol(name);
    ret(inv, sym)
}

/// `(gensym [prefix])`: a fresh symbol named prefix + counter.
pub(super) fn builtin_gensym(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, "gensym")?;
    let prefix = match inv.args.first() {
        None => GENSYM_PREFIX.to_string(),
        Some(_) => arg_string(&inv.args, 0, "gensym")?.to_string(),
    };
    let name = format!("{}{}", prefix, machine.next_gensym());
    let sym = machine.symbol(&name);
    ret(inv, sym)
}

pub(super) fn builtin_is_symbol(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "symbol?")?;
    let result = matches!(inv.args[0], Value::Symbol(_));
    ret(inv, Value::from_bool(result))
}

pub(super) fn builtin_is_keyword(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "keyword?")?;
    let result = matches!(inv.args[0], Value::Keyword(_));
    ret(inv, Value::from_bool(result))
}

pub(super) fn builtin_symbol_to_keyword(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "symbol->keyword")?;
    let sym = arg_symbol(&inv.args, 0, "symbol->keyword")?;
    ret(inv, Value::Keyword(sym))
}

/// Looks up keyword `kw` among the keyword/value pairs of `args[start..]`.
///
/// Pairs are scanned from the end, so when a keyword is repeated the last
/// occurrence wins. Returns `default` when `kw` is absent.
pub fn keyword_ref(
    kw: Symbol,
    args: &[Value],
    start: usize,
    default: Value,
) -> Result<Value, RuntimeError> {
    let rest = args.get(start..).unwrap_or(&[]);
    if rest.len() % 2 == 1 {
        return Err(RuntimeError::WrongNumberOfArgs {
            procedure: "keyword arguments",
            expected: "keyword/value pairs".to_string(),
            got: rest.len(),
        });
    }
    for pair in rest.chunks_exact(2).rev() {
        match &pair[0] {
            Value::Keyword(name) if *name == kw => return Ok(pair[1].clone()),
            Value::Keyword(_) => {}
            other => return Err(type_error("keyword arguments", "Keyword", other)),
        }
    }
    Ok(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_ref_prefers_the_last_occurrence() {
        let mut machine = Machine::new();
        let ensure = machine.intern("ensure");
        let args = vec![
            Value::Integer(1),
            Value::Keyword(ensure),
            Value::Integer(2),
            Value::Keyword(ensure),
            Value::Integer(3),
        ];
        assert_eq!(keyword_ref(ensure, &args, 1, Value::FALSE), Ok(Value::Integer(3)));
    }

    #[test]
    fn keyword_ref_falls_back_to_default() {
        let mut machine = Machine::new();
        let ensure = machine.intern("ensure");
        let other = machine.intern("other");
        let args = vec![Value::Keyword(other), Value::Integer(2)];
        assert_eq!(keyword_ref(ensure, &args, 0, Value::TRUE), Ok(Value::TRUE));
        assert_eq!(keyword_ref(ensure, &args, 2, Value::TRUE), Ok(Value::TRUE));
    }

    #[test]
    fn keyword_ref_rejects_malformed_lists() {
        let mut machine = Machine::new();
        let ensure = machine.intern("ensure");
        let odd = vec![Value::Keyword(ensure)];
        assert!(matches!(
            keyword_ref(ensure, &odd, 0, Value::FALSE),
            Err(RuntimeError::WrongNumberOfArgs { .. })
        ));
        let not_keyword = vec![Value::Integer(1), Value::Integer(2)];
        assert!(matches!(
            keyword_ref(ensure, &not_keyword, 0, Value::FALSE),
            Err(RuntimeError::WrongType { .. })
        ));
    }
}
