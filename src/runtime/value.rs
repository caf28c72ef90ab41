use std::{fmt, rc::Rc};

use crate::runtime::{
    closure::Closure,
    error::RuntimeError,
    object::{Fluid, HashTable, Hook, Macro, Pair, SyntaxObject, Variable, Vector},
    structs::Struct,
    symbol::{Interner, Symbol},
};

/// Runtime value passed between CPS procedures, stored in fields, variables
/// and dynamic-extent frames.
///
/// ## Memory Management Model
///
/// Immediates (booleans, numbers, chars, symbols, sentinels) are unboxed.
/// Everything with identity lives behind an `Rc`, so cloning a value is
/// O(1) and `eq?` compares allocations.
///
/// ### Cycles
///
/// Unlike a purely functional heap this object model is mutable: pairs have
/// a mutable cdr, struct fields are assignable, and the standard vtable
/// refers to itself. Such cycles are never reclaimed by reference counting.
/// That is accepted; the runtime is meant to live for one process and no
/// collector is provided for values. Only dynamic-extent frames, which are
/// churned by every wind and fluid binding, are collected (see
/// [`crate::runtime::dynstack`]).
#[derive(Clone)]
pub enum Value {
    /// `#t` / `#f`. `#f` doubles as the nil and "not found" sentinel.
    Bool(bool),
    /// The empty list.
    Empty,
    /// Result of procedures with no useful value; default struct field.
    Unspecified,
    /// Contents of a variable that has never been assigned.
    Undefined,
    Integer(i64),
    Float(f64),
    Char(char),
    String(Rc<str>),
    Symbol(Symbol),
    Keyword(Symbol),
    Pair(Rc<Pair>),
    Vector(Rc<Vector>),
    /// A box: the cell a module binding resolves to.
    Variable(Rc<Variable>),
    Fluid(Rc<Fluid>),
    Closure(Rc<Closure>),
    Struct(Rc<Struct>),
    Syntax(Rc<SyntaxObject>),
    Macro(Rc<Macro>),
    HashTable(Rc<HashTable>),
    Hook(Rc<Hook>),
}

impl Value {
    pub const FALSE: Value = Value::Bool(false);
    pub const TRUE: Value = Value::Bool(true);

    /// Returns the runtime type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Empty => "Empty",
            Value::Unspecified => "Unspecified",
            Value::Undefined => "Undefined",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Keyword(_) => "Keyword",
            Value::Pair(_) => "Pair",
            Value::Vector(_) => "Vector",
            Value::Variable(_) => "Variable",
            Value::Fluid(_) => "Fluid",
            Value::Closure(_) => "Closure",
            Value::Struct(_) => "Struct",
            Value::Syntax(_) => "Syntax",
            Value::Macro(_) => "Macro",
            Value::HashTable(_) => "HashTable",
            Value::Hook(_) => "Hook",
        }
    }

    /// Only `#f` is false.
    pub fn is_true(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn from_bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn string(text: &str) -> Self {
        Value::String(Rc::from(text))
    }

    pub fn cons(car: Value, cdr: Value) -> Self {
        Value::Pair(Rc::new(Pair::new(car, cdr)))
    }

    /// Builds a proper list from `items`.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Value::Empty, |tail, item| Value::cons(item, tail))
    }

    /// Collects the elements of a proper list.
    ///
    /// Fails with `ImproperArgumentList` when the chain of pairs ends in
    /// anything but the empty list, or loops back on itself.
    pub fn list_to_vec(&self) -> Result<Vec<Value>, RuntimeError> {
        let mut items = Vec::new();
        let mut cursor = self.clone();
        // advances one pair for every two `cursor` takes
        let mut slow = self.clone();
        loop {
            match cursor {
                Value::Empty => return Ok(items),
                Value::Pair(pair) => {
                    items.push(pair.car());
                    cursor = pair.cdr();
                }
                _ => return Err(RuntimeError::ImproperArgumentList),
            }
            if items.len() % 2 == 0 {
                slow = match &slow {
                    Value::Pair(pair) => pair.cdr(),
                    other => other.clone(),
                };
                if let (Value::Pair(a), Value::Pair(b)) = (&slow, &cursor) {
                    if Rc::ptr_eq(a, b) {
                        return Err(RuntimeError::ImproperArgumentList);
                    }
                }
            }
        }
    }

    /// True when both values are the same object (`eq?`).
    ///
    /// Immediates compare by value. Flonums are boxed in the runtimes this
    /// one mirrors, so `eq?` on them is left to `eqv?`.
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(_), Value::Float(_)) => false,
            _ => self.is_eqv(other),
        }
    }

    /// `eqv?`: `eq?` plus numeric equality on flonums.
    pub fn is_eqv(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Empty, Value::Empty)
            | (Value::Unspecified, Value::Unspecified)
            | (Value::Undefined, Value::Undefined) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            (Value::Pair(a), Value::Pair(b)) => Rc::ptr_eq(a, b),
            (Value::Vector(a), Value::Vector(b)) => Rc::ptr_eq(a, b),
            (Value::Variable(a), Value::Variable(b)) => Rc::ptr_eq(a, b),
            (Value::Fluid(a), Value::Fluid(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
            (Value::Syntax(a), Value::Syntax(b)) => Rc::ptr_eq(a, b),
            (Value::Macro(a), Value::Macro(b)) => Rc::ptr_eq(a, b),
            (Value::HashTable(a), Value::HashTable(b)) => Rc::ptr_eq(a, b),
            (Value::Hook(a), Value::Hook(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Whether the value can be invoked: closures and applicable structs.
    pub fn is_procedure(&self) -> bool {
        match self {
            Value::Closure(_) => true,
            Value::Struct(s) => s.is_applicable(),
            _ => false,
        }
    }

    /// Renders the value for traces and diagnostics, resolving symbol names.
    ///
    /// Lists are printed up to a fixed length so cyclic structure cannot
    /// hang the tracer.
    pub fn render(&self, interner: &Interner) -> String {
        let mut out = String::new();
        self.render_into(interner, &mut out, 0);
        out
    }

    fn render_into(&self, interner: &Interner, out: &mut String, depth: usize) {
        const MAX_DEPTH: usize = 8;
        const MAX_ITEMS: usize = 32;
        use std::fmt::Write;

        match self {
            Value::Bool(true) => out.push_str("#t"),
            Value::Bool(false) => out.push_str("#f"),
            Value::Empty => out.push_str("()"),
            Value::Unspecified => out.push_str("#<unspecified>"),
            Value::Undefined => out.push_str("#<undefined>"),
            Value::Integer(v) => {
                let _ = write!(out, "{}", v);
            }
            Value::Float(v) => {
                let _ = write!(out, "{:?}", v);
            }
            Value::Char(c) => {
                let _ = write!(out, "#\\{}", c);
            }
            Value::String(s) => {
                let _ = write!(out, "{:?}", s);
            }
            Value::Symbol(sym) => match interner.try_resolve(*sym) {
                Some(name) => out.push_str(name),
                None => {
                    let _ = write!(out, "{}", sym);
                }
            },
            Value::Keyword(sym) => {
                out.push_str("#:");
                out.push_str(interner.try_resolve(*sym).unwrap_or("?"));
            }
            Value::Pair(_) if depth >= MAX_DEPTH => out.push_str("(...)"),
            Value::Pair(pair) => {
                out.push('(');
                pair.car().render_into(interner, out, depth + 1);
                let mut tail = pair.cdr();
                let mut count = 1;
                loop {
                    match tail {
                        Value::Empty => break,
                        Value::Pair(next) if count < MAX_ITEMS => {
                            out.push(' ');
                            next.car().render_into(interner, out, depth + 1);
                            tail = next.cdr();
                            count += 1;
                        }
                        Value::Pair(_) => {
                            out.push_str(" ...");
                            break;
                        }
                        other => {
                            out.push_str(" . ");
                            other.render_into(interner, out, depth + 1);
                            break;
                        }
                    }
                }
                out.push(')');
            }
            Value::Vector(v) => {
                out.push_str("#(");
                for (i, item) in v.to_vec().iter().take(MAX_ITEMS).enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    if depth >= MAX_DEPTH {
                        out.push_str("...");
                    } else {
                        item.render_into(interner, out, depth + 1);
                    }
                }
                out.push(')');
            }
            Value::Closure(c) => {
                let _ = write!(out, "#<procedure {}>", c.display_name());
            }
            other => {
                let _ = write!(out, "#<{}>", other.type_name().to_lowercase());
            }
        }
    }
}

/// `PartialEq` is `eqv?`: structural equality is deliberately not offered.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.is_eqv(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Empty => write!(f, "Empty"),
            Value::Unspecified => write!(f, "Unspecified"),
            Value::Undefined => write!(f, "Undefined"),
            Value::Integer(v) => write!(f, "Integer({})", v),
            Value::Float(v) => write!(f, "Float({:?})", v),
            Value::Char(c) => write!(f, "Char({:?})", c),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Symbol(s) => write!(f, "Symbol({})", s.as_u32()),
            Value::Keyword(s) => write!(f, "Keyword({})", s.as_u32()),
            Value::Pair(p) => write!(f, "{:?}", p),
            Value::Vector(v) => write!(f, "{:?}", v),
            Value::Variable(v) => write!(f, "{:?}", v),
            Value::Fluid(v) => write!(f, "{:?}", v),
            Value::Closure(c) => write!(f, "{:?}", c),
            Value::Struct(s) => write!(f, "{:?}", s),
            Value::Syntax(_) => write!(f, "Syntax"),
            Value::Macro(_) => write!(f, "Macro"),
            Value::HashTable(h) => write!(f, "{:?}", h),
            Value::Hook(h) => write!(f, "Hook(arity={})", h.arity),
        }
    }
}
