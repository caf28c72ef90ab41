use std::rc::Rc;

use crate::runtime::{
    closure::{Closure, Code},
    error::RuntimeError,
    value::Value,
};

use super::{Invocation, Machine, Step};

impl Machine {
    /// `(apply f arg ... tail)`: spreads the proper list `tail` after the
    /// fixed arguments. Without a tail, `f` is applied to no arguments.
    pub fn apply(&mut self, k: Value, mut args: Vec<Value>) -> Result<Step, RuntimeError> {
        if args.is_empty() {
            return Err(RuntimeError::WrongNumberOfArgs {
                procedure: "apply",
                expected: "at least 1".to_string(),
                got: 0,
            });
        }
        let callee = args.remove(0);
        if let Some(tail) = args.pop() {
            args.extend(tail.list_to_vec()?);
        }
        Ok(Step::Call(Invocation::new(callee, k, args)))
    }

    /// `(values v ...)`: delivers every argument to `k`.
    pub fn values(&mut self, k: Value, args: Vec<Value>) -> Result<Step, RuntimeError> {
        Ok(Step::Return { k, values: args })
    }

    /// `(call-with-values producer consumer)`: runs `producer` with a
    /// continuation that applies `consumer` to exactly the values it gets.
    pub fn call_with_values(
        &mut self,
        k: Value,
        producer: Value,
        consumer: Value,
    ) -> Result<Step, RuntimeError> {
        let receiver = Closure::with_free(
            Some("call-with-values"),
            Code::Native(deliver_to_consumer),
            vec![consumer, k],
        );
        Ok(Step::Call(Invocation::new(
            producer,
            Value::Closure(Rc::new(receiver)),
            Vec::new(),
        )))
    }
}

fn deliver_to_consumer(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    let Value::Closure(receiver) = &inv.callee else {
        return Err(RuntimeError::WrongType {
            procedure: "call-with-values",
            expected: "Closure",
            got: inv.callee.type_name(),
        });
    };
    let consumer = receiver.free_ref(0)?;
    let k = receiver.free_ref(1)?;
    Ok(Step::Call(Invocation::new(consumer, k, inv.args)))
}
