//! Mutable heap objects referenced from [`Value`].
use std::{cell::RefCell, collections::HashMap, fmt};

use crate::runtime::{hash_key::EqKey, leak_detector, value::Value};

/// A cons cell. The cdr is mutable, so pairs may form cycles.
pub struct Pair {
    car: RefCell<Value>,
    cdr: RefCell<Value>,
}

impl Pair {
    pub fn new(car: Value, cdr: Value) -> Self {
        leak_detector::record_pair();
        Self {
            car: RefCell::new(car),
            cdr: RefCell::new(cdr),
        }
    }

    pub fn car(&self) -> Value {
        self.car.borrow().clone()
    }

    pub fn cdr(&self) -> Value {
        self.cdr.borrow().clone()
    }

    pub fn set_car(&self, value: Value) {
        *self.car.borrow_mut() = value;
    }

    pub fn set_cdr(&self, value: Value) {
        *self.cdr.borrow_mut() = value;
    }
}

impl fmt::Debug for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pair({:p})", self)
    }
}

/// Fixed-length vector with in-place element mutation.
pub struct Vector {
    items: RefCell<Vec<Value>>,
}

impl Vector {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items),
        }
    }

    pub fn filled(len: usize, init: Value) -> Self {
        Self::new(vec![init; len])
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Stores `value` at `index`; returns `false` when the index is past the end.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.items.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl fmt::Debug for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector(len={})", self.len())
    }
}

/// A variable: the mutable cell a module binding resolves to.
///
/// Identity matters; every reference to a binding shares the same cell.
pub struct Variable {
    value: RefCell<Value>,
}

impl Variable {
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    /// Creates a variable that has no value yet.
    pub fn unbound() -> Self {
        Self::new(Value::Undefined)
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    pub fn is_bound(&self) -> bool {
        !matches!(*self.value.borrow(), Value::Undefined)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({:p})", self)
    }
}

/// A dynamically scoped cell.
///
/// Readers always see the current value. Prior values are kept by the
/// fluid-binding frames on the dynamic-extent stack, not by the fluid.
pub struct Fluid {
    value: RefCell<Value>,
}

impl Fluid {
    pub fn new(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    /// Installs `value` and returns the previous one.
    pub fn replace(&self, value: Value) -> Value {
        std::mem::replace(&mut *self.value.borrow_mut(), value)
    }
}

impl fmt::Debug for Fluid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fluid({:p})", self)
    }
}

/// Expression wrapped with its lexical context, as produced by the expander.
#[derive(Debug)]
pub struct SyntaxObject {
    pub expression: Value,
    pub wrap: Value,
    pub module: Value,
}

/// Syntax transformer record created by `make-syntax-transformer`.
#[derive(Debug)]
pub struct Macro {
    pub name: Value,
    pub kind: Value,
    pub binding: Value,
}

/// An ordered list of procedures run together by `run-hook`.
#[derive(Debug)]
pub struct Hook {
    pub arity: usize,
    procedures: RefCell<Vec<Value>>,
}

impl Hook {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            procedures: RefCell::new(Vec::new()),
        }
    }

    pub fn add(&self, procedure: Value, append: bool) {
        let mut procedures = self.procedures.borrow_mut();
        if append {
            procedures.push(procedure);
        } else {
            procedures.insert(0, procedure);
        }
    }

    pub fn procedures(&self) -> Vec<Value> {
        self.procedures.borrow().clone()
    }
}

/// Hash table keyed by `eq?` identity.
///
/// Weak variants are accepted but hold their entries strongly.
pub struct HashTable {
    pub weak: bool,
    table: RefCell<HashMap<EqKey, (Value, Value)>>,
}

impl HashTable {
    pub fn new(weak: bool) -> Self {
        Self {
            weak,
            table: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.table
            .borrow()
            .get(&EqKey::from(key))
            .map(|(_, value)| value.clone())
    }

    pub fn lookup(&self, key: &Value, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn set(&self, key: Value, value: Value) -> Value {
        self.table
            .borrow_mut()
            .insert(EqKey::from(&key), (key, value.clone()));
        value
    }

    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.table
            .borrow_mut()
            .remove(&EqKey::from(key))
            .map(|(_, value)| value)
    }

    pub fn clear(&self) {
        self.table.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Snapshot of all entries, so iteration may call back into the table.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.table.borrow().values().cloned().collect()
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashTable(len={})", self.len())
    }
}
