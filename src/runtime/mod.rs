//! Runtime core: object model, dynamic-extent stack, control engine,
//! structs and module resolution.
//!
//! # Calling convention
//! Every procedure is a [`closure::Closure`] invoked with an
//! [`vm::Invocation`]: the callee itself, the continuation to deliver
//! results to, and the positional arguments. A procedure never returns to
//! its caller; it returns a [`vm::Step`] describing the next transfer, and
//! [`vm::Machine::run`] loops over steps. Continuations are ordinary
//! procedures, so "return" and "jump" are the same operation.
//!
//! # Cycles
//! Values are reference counted and may form cycles (mutable pairs, struct
//! self-references, the self-describing root vtable). Such cycles are not
//! reclaimed. Dynamic-extent frames are the one thing with its own
//! collector, see [`dynstack`].
use std::rc::Rc;

use crate::runtime::{
    error::RuntimeError,
    vm::{Invocation, Machine, Step},
};

pub mod builtin_function;
pub mod builtins;
pub mod closure;
pub mod dynstack;
pub mod error;
pub mod frame;
pub mod hash_key;
pub mod leak_detector;
pub mod modules;
pub mod object;
pub mod structs;
pub mod symbol;
pub mod value;
pub mod vm;

/// Code pointer behind builtins and compiled procedures.
pub type NativeFn = fn(&mut Machine, Invocation) -> Result<Step, RuntimeError>;

/// Procedure body that captures host state (continuations, embedder callbacks).
pub type HostFn = Rc<dyn Fn(&mut Machine, Invocation) -> Result<Step, RuntimeError>>;
