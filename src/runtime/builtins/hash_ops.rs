use std::rc::Rc;

use crate::runtime::{
    closure::{Closure, Code},
    error::RuntimeError,
    object::HashTable,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::helpers::{arg_hash_table, check_arity, check_arity_range, optional, ret, self_closure};

// The size hint is accepted and ignored.
fn make_table(inv: Invocation, weak: bool, name: &'static str) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 0, 1, name)?;
    ret(inv, Value::HashTable(Rc::new(HashTable::new(weak))))
}

pub(super) fn builtin_make_hash_table(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    make_table(inv, false, "make-hash-table")
}

pub(super) fn builtin_make_weak_key_hash_table(
    _machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    make_table(inv, true, "make-weak-key-hash-table")
}

pub(super) fn builtin_make_weak_value_hash_table(
    _machine: &mut Machine,
    inv: Invocation,
) -> Result<Step, RuntimeError> {
    make_table(inv, true, "make-weak-value-hash-table")
}

/// `(hashq-ref table key [default])`
pub(super) fn builtin_hashq_ref(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity_range(&inv.args, 2, 3, "hashq-ref")?;
    let table = arg_hash_table(&inv.args, 0, "hashq-ref")?;
    let value = table.lookup(&inv.args[1], optional(&inv.args, 2));
    ret(inv, value)
}

/// `(hashq-set! table key value)`, returning the value.
pub(super) fn builtin_hashq_set(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 3, "hashq-set!")?;
    let table = arg_hash_table(&inv.args, 0, "hashq-set!")?;
    let value = table.set(inv.args[1].clone(), inv.args[2].clone());
    ret(inv, value)
}

/// `(hashq-remove! table key)`: `#t` when an entry was removed.
pub(super) fn builtin_hashq_remove(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "hashq-remove!")?;
    let table = arg_hash_table(&inv.args, 0, "hashq-remove!")?;
    let removed = table.remove(&inv.args[1]).is_some();
    ret(inv, Value::from_bool(removed))
}

pub(super) fn builtin_hash_clear(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "hash-clear!")?;
    arg_hash_table(&inv.args, 0, "hash-clear!")?.clear();
    ret(inv, Value::Unspecified)
}

/// Pending entries as a list of `(key . value)` pairs.
fn entry_list(table: &HashTable) -> Value {
    Value::list(
        table
            .entries()
            .into_iter()
            .map(|(key, value)| Value::cons(key, value)),
    )
}

fn split_entry(entries: &Value) -> Option<(Value, Value, Value)> {
    let Value::Pair(cell) = entries else {
        return None;
    };
    let Value::Pair(entry) = cell.car() else {
        return None;
    };
    Some((entry.car(), entry.cdr(), cell.cdr()))
}

/// `(hash-for-each proc table)`: calls `proc` with each key and value.
///
/// Each call gets a fresh continuation that resumes the loop, so the
/// iteration never nests native calls.
pub(super) fn builtin_hash_for_each(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "hash-for-each")?;
    let table = arg_hash_table(&inv.args, 1, "hash-for-each")?;
    let proc = inv.args[0].clone();
    for_each_step(proc, inv.k, entry_list(&table))
}

fn for_each_step(proc: Value, k: Value, entries: Value) -> Result<Step, RuntimeError> {
    let Some((key, value, rest)) = split_entry(&entries) else {
        return Ok(Step::Return {
            k,
            values: vec![Value::Unspecified],
        });
    };
    let next = Closure::with_free(
        Some("hash-for-each"),
        Code::Native(for_each_next),
        vec![proc.clone(), k, rest],
    );
    Ok(Step::Call(Invocation::new(
        proc,
        Value::Closure(Rc::new(next)),
        vec![key, value],
    )))
}

fn for_each_next(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let closure = self_closure(&inv, "hash-for-each")?;
    for_each_step(closure.free_ref(0)?, closure.free_ref(1)?, closure.free_ref(2)?)
}

/// `(hash-map->list proc table)`: the results of `proc` per entry,
/// consed in reverse visiting order.
pub(super) fn builtin_hash_map_to_list(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 2, "hash-map->list")?;
    let table = arg_hash_table(&inv.args, 1, "hash-map->list")?;
    let proc = inv.args[0].clone();
    map_step(proc, inv.k, entry_list(&table), Value::Empty)
}

fn map_step(proc: Value, k: Value, entries: Value, acc: Value) -> Result<Step, RuntimeError> {
    let Some((key, value, rest)) = split_entry(&entries) else {
        return Ok(Step::Return { k, values: vec![acc] });
    };
    let next = Closure::with_free(
        Some("hash-map->list"),
        Code::Native(map_next),
        vec![proc.clone(), k, rest, acc],
    );
    Ok(Step::Call(Invocation::new(
        proc,
        Value::Closure(Rc::new(next)),
        vec![key, value],
    )))
}

fn map_next(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let closure = self_closure(&inv, "hash-map->list")?;
    let result = inv.args.into_iter().next().unwrap_or(Value::Unspecified);
    let acc = Value::cons(result, closure.free_ref(3)?);
    map_step(closure.free_ref(0)?, closure.free_ref(1)?, closure.free_ref(2)?, acc)
}
