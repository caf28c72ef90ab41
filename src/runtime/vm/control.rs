//! Dynamic-extent operations: prompts, dynamic-wind, fluid bindings,
//! aborts and reentrant continuations.
use std::rc::Rc;

use crate::runtime::{
    closure::Closure,
    dynstack::{FrameHandle, Transition},
    error::{FrameFamily, RuntimeError},
    frame::DynFrame,
    object::Fluid,
    value::Value,
};

use super::{Invocation, Machine, Step};

impl Machine {
    pub fn push_prompt(&mut self, tag: Value, escape_only: bool, handler: Value) {
        self.dynstack.push(DynFrame::Prompt {
            tag,
            escape_only,
            handler,
        });
    }

    /// Pushes a dynamic-wind frame and runs `enter` before returning.
    pub fn push_dynwind(&mut self, enter: Value, leave: Value) -> Result<(), RuntimeError> {
        self.dynstack.push(DynFrame::DynWind {
            enter: enter.clone(),
            leave,
        });
        self.call(enter, Vec::new())?;
        Ok(())
    }

    /// Pops the innermost frame, which must belong to `expected`.
    ///
    /// Leaving a dynamic-wind frame runs its `leave` thunk; leaving a fluid
    /// binding restores the outer value.
    pub fn pop_dynamic(&mut self, expected: FrameFamily) -> Result<(), RuntimeError> {
        let (handle, family, kind) = match self.dynstack.top() {
            Some((handle, frame)) => (handle, frame.family(), frame.kind_name()),
            None => {
                return Err(RuntimeError::FrameKindMismatch {
                    expected,
                    found: "empty stack",
                });
            }
        };
        if family != expected {
            return Err(RuntimeError::FrameKindMismatch {
                expected,
                found: kind,
            });
        }
        self.dynstack.pop();
        self.leave_frame(handle)
    }

    /// Binds `fluid` to `value` for a new dynamic extent.
    pub fn push_fluid(&mut self, fluid: Rc<Fluid>, value: Value) {
        let saved = fluid.replace(value);
        self.dynstack.push(DynFrame::FluidBinding { fluid, saved });
    }

    /// Ends the innermost fluid binding.
    pub fn pop_fluid(&mut self) -> Result<(), RuntimeError> {
        match self.dynstack.top() {
            Some((_, DynFrame::FluidBinding { .. })) => {}
            Some((_, frame)) => {
                return Err(RuntimeError::NotAFrame {
                    found: frame.kind_name(),
                });
            }
            None => {
                return Err(RuntimeError::NotAFrame {
                    found: "empty stack",
                });
            }
        }
        self.pop_dynamic(FrameFamily::Fluid)
    }

    /// Transfers to the innermost prompt matching `tag`.
    ///
    /// Frames above the prompt are left innermost first, then the prompt
    /// itself is dropped and its handler receives a resumption procedure
    /// (unless the prompt is escape-only) followed by `values`. Resuming
    /// re-enters the prompt and every frame that was above it, on top of
    /// the stack live at the time of the resume.
    pub fn abort_to_prompt(
        &mut self,
        k: Value,
        tag: Value,
        values: Vec<Value>,
    ) -> Result<Step, RuntimeError> {
        let index = self
            .dynstack
            .find_prompt(&tag)
            .ok_or_else(|| RuntimeError::NoMatchingPrompt {
                tag: self.render(&tag),
            })?;
        let prompt = self.dynstack.handles()[index];
        let (escape_only, handler) = match self.dynstack.frame(prompt) {
            Some(DynFrame::Prompt {
                escape_only,
                handler,
                ..
            }) => (*escape_only, handler.clone()),
            _ => return Err(collected_frame()),
        };

        tracing::debug!(
            tag = %self.render(&tag),
            unwound = self.dynstack.depth() - index - 1,
            "abort to prompt"
        );

        let segment = (!escape_only).then(|| self.dynstack.capture_from(index));

        while self.dynstack.depth() > index + 1 {
            if let Some(handle) = self.dynstack.pop() {
                self.leave_frame(handle)?;
            }
        }
        self.dynstack.truncate(index);

        let mut args = Vec::with_capacity(values.len() + 1);
        if let Some(segment) = segment {
            let resume = Closure::host("resume", move |machine: &mut Machine, inv| {
                let mut target = machine.dynstack.handles().to_vec();
                target.extend_from_slice(&segment);
                machine.reinstate(&target, k.clone(), inv.args)
            });
            args.push(Value::Closure(Rc::new(resume)));
        }
        args.extend(values);
        Ok(Step::Return {
            k: handler,
            values: args,
        })
    }

    /// Captures the current continuation and applies `receiver` to it.
    pub fn call_with_current_continuation(
        &mut self,
        k: Value,
        receiver: Value,
    ) -> Result<Step, RuntimeError> {
        let snapshot = self.dynstack.capture();
        let captured_k = k.clone();
        let continuation = Closure::host("continuation", move |machine: &mut Machine, inv| {
            machine.reinstate(&snapshot, captured_k.clone(), inv.args)
        });
        Ok(Step::Call(Invocation::new(
            receiver,
            k,
            vec![Value::Closure(Rc::new(continuation))],
        )))
    }

    /// Makes `snapshot` the live stack and delivers `values` to `k`.
    ///
    /// Frames past the shared prefix are left innermost first. Fluid
    /// bindings of the target are then re-established outermost first, and
    /// the `enter` thunks of its dynamic-wind frames run innermost first.
    pub(crate) fn reinstate(
        &mut self,
        snapshot: &[FrameHandle],
        k: Value,
        values: Vec<Value>,
    ) -> Result<Step, RuntimeError> {
        let plan = Transition::plan(self.dynstack.handles(), snapshot);
        tracing::debug!(
            unwind = plan.unwind.len(),
            rewind = plan.rewind.len(),
            "reinstating continuation"
        );

        for _ in 0..plan.unwind.len() {
            if let Some(handle) = self.dynstack.pop() {
                self.leave_frame(handle)?;
            }
        }

        for handle in &plan.rewind {
            if let Some(frame) = self.dynstack.frame_mut(*handle) {
                frame.swap_fluid();
            }
        }
        for handle in plan.rewind.iter().rev() {
            if let Some(DynFrame::DynWind { enter, .. }) = self.dynstack.frame(*handle) {
                let enter = enter.clone();
                self.call(enter, Vec::new())?;
            }
        }

        self.dynstack.install(snapshot);
        Ok(Step::Return { k, values })
    }

    /// Runs the exit side of a frame that has just been popped.
    fn leave_frame(&mut self, handle: FrameHandle) -> Result<(), RuntimeError> {
        let frame = self.dynstack.frame_mut(handle).ok_or_else(collected_frame)?;
        match frame {
            DynFrame::FluidBinding { .. } => {
                frame.swap_fluid();
                Ok(())
            }
            DynFrame::DynWind { leave, .. } => {
                let leave = leave.clone();
                self.call(leave, Vec::new())?;
                Ok(())
            }
            DynFrame::Prompt { .. } => Ok(()),
        }
    }
}

fn collected_frame() -> RuntimeError {
    RuntimeError::NotAFrame {
        found: "collected frame",
    }
}
