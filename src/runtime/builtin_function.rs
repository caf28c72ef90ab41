use std::{fmt, rc::Rc};

use crate::runtime::{NativeFn, closure::Closure, value::Value};

/// A named native CPS procedure, as listed in the builtin tables.
#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

impl BuiltinFunction {
    pub const fn new(name: &'static str, func: NativeFn) -> Self {
        Self { name, func }
    }

    /// A fresh closure with no free variables running this builtin.
    pub fn to_closure(&self) -> Value {
        Value::Closure(Rc::new(Closure::native(self.name, self.func)))
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<builtin {}>", self.name)
    }
}

impl PartialEq for BuiltinFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
