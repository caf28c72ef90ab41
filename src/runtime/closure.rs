use std::{cell::RefCell, fmt, rc::Rc};

use crate::runtime::{
    HostFn, NativeFn,
    error::RuntimeError,
    leak_detector,
    value::Value,
    vm::{Invocation, Machine, Step},
};

/// Code behind a closure.
#[derive(Clone)]
pub enum Code {
    /// A plain function pointer; used by builtins and compiled code.
    Native(NativeFn),
    /// A host closure, for embedders that need to capture Rust state.
    Host(HostFn),
}

/// A procedure value: code plus a fixed-size free-variable array.
///
/// Every invocation follows the CPS convention `(self, k, args...)`, where
/// `self` is the closure value itself and `k` the continuation to deliver
/// results to. Free-variable slots are filled once when the closure is
/// built and read afterwards.
pub struct Closure {
    pub name: Option<&'static str>,
    pub code: Code,
    free: RefCell<Vec<Value>>,
}

impl Closure {
    /// Allocates a closure with `size` free-variable slots, all unspecified.
    pub fn new(code: Code, size: usize) -> Self {
        Self::with_free(None, code, vec![Value::Unspecified; size])
    }

    pub fn with_free(name: Option<&'static str>, code: Code, free: Vec<Value>) -> Self {
        leak_detector::record_closure();
        Self {
            name,
            code,
            free: RefCell::new(free),
        }
    }

    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Self::with_free(Some(name), Code::Native(func), Vec::new())
    }

    pub fn host<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Machine, Invocation) -> Result<Step, RuntimeError> + 'static,
    {
        Self::with_free(Some(name), Code::Host(Rc::new(func)), Vec::new())
    }

    pub fn free_len(&self) -> usize {
        self.free.borrow().len()
    }

    pub fn free_ref(&self, index: usize) -> Result<Value, RuntimeError> {
        let free = self.free.borrow();
        free.get(index).cloned().ok_or(RuntimeError::OutOfRange {
            procedure: "free-ref",
            index,
            len: free.len(),
        })
    }

    pub fn free_set(&self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let mut free = self.free.borrow_mut();
        let len = free.len();
        match free.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::OutOfRange {
                procedure: "free-set!",
                index,
                len,
            }),
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.name.unwrap_or("<anonymous>")
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure({}, free={})",
            self.display_name(),
            self.free_len()
        )
    }
}
