use crate::primop::{PrimOp, execute_primop};
use crate::runtime::{error::RuntimeError, value::Value};

use super::Machine;

impl Machine {
    /// Applies the primitive encoded as `primop_id` to `args`, as compiled
    /// code does for inline operations.
    pub fn apply_primop(&mut self, primop_id: u8, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let op = PrimOp::from_id(primop_id).ok_or(RuntimeError::InvalidPrimOp { id: primop_id })?;
        if self.trace {
            println!("{}", self.format_primop(op.display_name(), &args));
        }
        execute_primop(self, op, args)
    }
}
