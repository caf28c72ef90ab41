use std::rc::Rc;

use crate::runtime::{
    builtin_function::BuiltinFunction,
    builtins::{self, BUILTINS},
    closure::{Closure, Code},
    dynstack::DynStack,
    error::RuntimeError,
    modules::ModuleSystem,
    structs::{APPLICABLE_STRUCT_INDEX_PROCEDURE, Vtables},
    symbol::{Interner, Symbol},
    value::Value,
};

mod control;
mod function_call;
mod primop;
mod trace;

/// Symbol naming the prompt tag runtime errors are raised to.
pub const DEFAULT_ERROR_TAG: &str = "%runtime-error";

/// One procedure application under the CPS convention.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The procedure being applied; passed so it can read its free variables.
    pub callee: Value,
    /// Where the procedure delivers its results.
    pub k: Value,
    pub args: Vec<Value>,
}

impl Invocation {
    pub fn new(callee: Value, k: Value, args: Vec<Value>) -> Self {
        Self { callee, k, args }
    }
}

/// What the trampoline does next.
#[derive(Debug, Clone)]
pub enum Step {
    /// Apply a procedure.
    Call(Invocation),
    /// Deliver `values` to the continuation `k`.
    Return { k: Value, values: Vec<Value> },
    /// Stop the innermost running trampoline with these results.
    Halt(Vec<Value>),
}

/// The runtime: intern table, dynamic-extent stack, vtables, module state
/// and the trampoline that drives CPS procedures.
pub struct Machine {
    pub(crate) interner: Interner,
    pub(crate) dynstack: DynStack,
    pub(crate) vtables: Vtables,
    pub(crate) modules: ModuleSystem,
    builtins: Vec<Value>,
    error_tag: Value,
    trace: bool,
    depth: usize,
    /// Values bound for an outer run that a nested run reached the halt
    /// continuation of, keyed by that run's depth.
    escape: Option<(usize, Vec<Value>)>,
    steps: u64,
    gensym_counter: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Creates a machine in pre-boot mode with the core procedures defined
    /// in the flat obarray.
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let vtables = Vtables::bootstrap(&mut interner);
        let modules = ModuleSystem::new(&vtables, &mut interner);
        let error_tag = Value::Symbol(interner.intern(DEFAULT_ERROR_TAG));
        let builtins = BUILTINS
            .iter()
            .map(BuiltinFunction::to_closure)
            .collect();

        let mut machine = Self {
            interner,
            dynstack: DynStack::new(),
            vtables,
            modules,
            builtins,
            error_tag,
            trace: false,
            depth: 0,
            escape: None,
            steps: 0,
            gensym_counter: 0,
        };
        builtins::install(&mut machine);
        machine
    }

    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn set_frame_gc_enabled(&mut self, enabled: bool) {
        self.dynstack.arena_mut().set_enabled(enabled);
    }

    pub fn set_frame_gc_threshold(&mut self, threshold: usize) {
        self.dynstack.arena_mut().set_threshold(threshold);
    }

    /// Sets the prompt tag runtime errors are raised to.
    pub fn set_error_tag(&mut self, tag: Value) {
        self.error_tag = tag;
    }

    pub fn error_tag(&self) -> &Value {
        &self.error_tag
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn symbol(&mut self, name: &str) -> Value {
        Value::Symbol(self.interner.intern(name))
    }

    pub fn keyword(&mut self, name: &str) -> Value {
        Value::Keyword(self.interner.intern(name))
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn symbol_name(&self, sym: Symbol) -> &str {
        self.interner.try_resolve(sym).unwrap_or("?")
    }

    /// Renders a value for diagnostics.
    pub fn render(&self, value: &Value) -> String {
        value.render(&self.interner)
    }

    /// The trivial continuation for the next [`Machine::run`]: delivering
    /// values to it halts that run, even from inside a run nested deeper.
    pub fn halt_continuation(&self) -> Value {
        halt_at(self.depth + 1)
    }

    /// Builtin procedure by table index (`apply`, `values`,
    /// `abort-to-prompt`, `call-with-values`, `call/cc`).
    pub fn builtin(&self, index: usize) -> Option<Value> {
        self.builtins.get(index).cloned()
    }

    pub fn standard_vtable(&self) -> Value {
        Value::Struct(self.vtables.standard.clone())
    }

    pub fn applicable_struct_vtable(&self) -> Value {
        Value::Struct(self.vtables.applicable.clone())
    }

    pub fn dynstack_depth(&self) -> usize {
        self.dynstack.depth()
    }

    pub fn live_frames(&self) -> usize {
        self.dynstack.arena().live_count()
    }

    pub fn frame_collections(&self) -> usize {
        self.dynstack.arena().total_collections()
    }

    /// Number of trampoline steps executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn next_gensym(&mut self) -> u64 {
        let n = self.gensym_counter;
        self.gensym_counter += 1;
        n
    }

    /// Applies `callee` to `args` with the trivial continuation and runs it
    /// to completion.
    ///
    /// Calls nest: a procedure may call back into the machine (wind thunks
    /// do) and the inner call returns when its own continuation is reached.
    pub fn call(&mut self, callee: Value, args: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
        let k = self.halt_continuation();
        self.run(Step::Call(Invocation::new(callee, k, args)))
    }

    /// Like [`Machine::call`], returning the first value or unspecified.
    pub fn call1(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        Ok(self
            .call(callee, args)?
            .into_iter()
            .next()
            .unwrap_or(Value::Unspecified))
    }

    /// Runs steps until one halts.
    ///
    /// In the outermost run an error raised by a procedure becomes an abort
    /// to the error tag when a prompt can receive it; nested runs hand the
    /// error to their caller, which raises it in turn.
    pub fn run(&mut self, step: Step) -> Result<Vec<Value>, RuntimeError> {
        self.depth += 1;
        let result = self.run_inner(step);
        self.depth -= 1;
        result
    }

    fn run_inner(&mut self, mut step: Step) -> Result<Vec<Value>, RuntimeError> {
        loop {
            self.steps += 1;
            if self.trace {
                self.trace_step(&step);
            }
            if self.depth == 1 && self.dynstack.should_collect() {
                self.collect_frames();
            }

            let outcome = match step {
                Step::Halt(values) => return Ok(values),
                Step::Call(invocation) => self.invoke(invocation),
                Step::Return { k, values } => {
                    self.invoke(Invocation::new(k, Value::Unspecified, values))
                }
            };

            step = match outcome {
                Ok(next) => next,
                Err(RuntimeError::ContinuationEscape { depth }) if depth == self.depth => {
                    return Ok(self.escape.take().map(|(_, values)| values).unwrap_or_default());
                }
                Err(err @ RuntimeError::ContinuationEscape { .. }) => return Err(err),
                Err(err) if self.depth == 1 => self.raise(err)?,
                Err(err) => return Err(err),
            };
        }
    }

    /// Dispatches one invocation to the callee's code.
    pub fn invoke(&mut self, invocation: Invocation) -> Result<Step, RuntimeError> {
        let code = match &invocation.callee {
            Value::Closure(closure) => closure.code.clone(),
            Value::Struct(s) if s.is_applicable() => {
                let procedure = s.field(APPLICABLE_STRUCT_INDEX_PROCEDURE)?;
                return Ok(Step::Call(Invocation::new(
                    procedure,
                    invocation.k,
                    invocation.args,
                )));
            }
            other => {
                return Err(RuntimeError::NotApplicable {
                    type_name: other.type_name(),
                });
            }
        };
        match code {
            Code::Native(func) => func(self, invocation),
            Code::Host(func) => func(self, invocation),
        }
    }

    /// Turns `err` into an abort to the error tag, or hands it back when
    /// no prompt would receive it.
    fn raise(&mut self, err: RuntimeError) -> Result<Step, RuntimeError> {
        let tag = self.error_tag.clone();
        if self.dynstack.find_prompt(&tag).is_none() {
            return Err(err);
        }
        tracing::debug!(code = err.code().code, error = %err, "raising runtime error to prompt");
        let key = self.symbol(err.key());
        let message = Value::string(&err.to_string());
        let k = halt_at(self.depth);
        self.abort_to_prompt(k, tag, vec![key, message])
    }

    fn collect_frames(&mut self) {
        let freed = self.dynstack.collect();
        tracing::trace!(
            freed,
            live = self.dynstack.arena().live_count(),
            threshold = self.dynstack.arena().threshold(),
            "collected dynamic-extent frames"
        );
    }
}

fn halt_at(depth: usize) -> Value {
    Value::Closure(Rc::new(Closure::with_free(
        Some("halt"),
        Code::Native(halt),
        vec![Value::Integer(depth as i64)],
    )))
}

/// Halts the run the continuation was made for. Reaching the halt of an
/// outer run from a nested one unwinds the nested runs with
/// `ContinuationEscape` until the owning run returns the values.
fn halt(machine: &mut Machine, invocation: Invocation) -> Result<Step, RuntimeError> {
    let target = match &invocation.callee {
        Value::Closure(closure) => match closure.free_ref(0)? {
            Value::Integer(depth) => depth as usize,
            _ => machine.depth,
        },
        _ => machine.depth,
    };
    if target >= machine.depth {
        return Ok(Step::Halt(invocation.args));
    }
    tracing::debug!(from = machine.depth, to = target, "continuation escaped a nested run");
    machine.escape = Some((target, invocation.args));
    Err(RuntimeError::ContinuationEscape { depth: target })
}

#[cfg(test)]
mod trace_test;
