use std::rc::Rc;

use crate::runtime::value::Value;

/// Identity key for `eq?`-keyed tables.
///
/// Immediates hash by value; heap objects hash by the address of their
/// shared allocation, so two distinct pairs with equal contents are
/// different keys. A table stores the key `Value` alongside the entry,
/// which keeps the allocation (and therefore the address) alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqKey {
    Bool(bool),
    Empty,
    Unspecified,
    Undefined,
    Integer(i64),
    Float(u64),
    Char(char),
    Symbol(u32),
    Keyword(u32),
    Object(usize),
}

fn addr<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

impl From<&Value> for EqKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => EqKey::Bool(*b),
            Value::Empty => EqKey::Empty,
            Value::Unspecified => EqKey::Unspecified,
            Value::Undefined => EqKey::Undefined,
            Value::Integer(v) => EqKey::Integer(*v),
            Value::Float(v) => EqKey::Float(v.to_bits()),
            Value::Char(c) => EqKey::Char(*c),
            Value::Symbol(s) => EqKey::Symbol(s.as_u32()),
            Value::Keyword(s) => EqKey::Keyword(s.as_u32()),
            Value::String(s) => EqKey::Object(addr(s)),
            Value::Pair(p) => EqKey::Object(addr(p)),
            Value::Vector(v) => EqKey::Object(addr(v)),
            Value::Variable(v) => EqKey::Object(addr(v)),
            Value::Fluid(f) => EqKey::Object(addr(f)),
            Value::Closure(c) => EqKey::Object(addr(c)),
            Value::Struct(s) => EqKey::Object(addr(s)),
            Value::Syntax(s) => EqKey::Object(addr(s)),
            Value::Macro(m) => EqKey::Object(addr(m)),
            Value::HashTable(h) => EqKey::Object(addr(h)),
            Value::Hook(h) => EqKey::Object(addr(h)),
        }
    }
}
