use std::rc::Rc;

use crate::runtime::{error::FrameFamily, object::Fluid, value::Value};

/// One entry of the dynamic-extent stack.
#[derive(Debug, Clone)]
pub enum DynFrame {
    /// Delimiter that `abort-to-prompt` transfers to.
    Prompt {
        tag: Value,
        escape_only: bool,
        handler: Value,
    },
    /// A fluid binding.
    ///
    /// `saved` holds whichever value is *not* currently installed on the
    /// fluid: the outer value while the extent is active, the inner value
    /// once the extent has been unwound by a control transfer. Swapping it
    /// with the fluid's value both unwinds and rewinds the binding.
    FluidBinding { fluid: Rc<Fluid>, saved: Value },
    /// A dynamic-wind extent with its entry and exit thunks.
    DynWind { enter: Value, leave: Value },
}

impl DynFrame {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DynFrame::Prompt { .. } => "prompt",
            DynFrame::FluidBinding { .. } => "fluid binding",
            DynFrame::DynWind { .. } => "dynamic-wind",
        }
    }

    pub fn family(&self) -> FrameFamily {
        match self {
            DynFrame::FluidBinding { .. } => FrameFamily::Fluid,
            DynFrame::Prompt { .. } | DynFrame::DynWind { .. } => FrameFamily::Extent,
        }
    }

    /// Exchanges the fluid's current value with the saved one. No-op for
    /// other frame kinds.
    pub fn swap_fluid(&mut self) {
        if let DynFrame::FluidBinding { fluid, saved } = self {
            let current = fluid.replace(saved.clone());
            *saved = current;
        }
    }
}
