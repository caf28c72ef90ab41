use std::fmt;

/// Stable identifier and title for a class of runtime failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: &'static str,
    pub title: &'static str,
}

pub const UNBOUND_VARIABLE: ErrorCode = ErrorCode {
    code: "E2000",
    title: "UNBOUND VARIABLE",
};
pub const AMBIGUOUS_BINDING: ErrorCode = ErrorCode {
    code: "E2001",
    title: "AMBIGUOUS BINDING",
};
pub const NO_MATCHING_PROMPT: ErrorCode = ErrorCode {
    code: "E2002",
    title: "NO MATCHING PROMPT",
};
pub const FRAME_KIND_MISMATCH: ErrorCode = ErrorCode {
    code: "E2003",
    title: "FRAME KIND MISMATCH",
};
pub const NOT_A_FRAME: ErrorCode = ErrorCode {
    code: "E2004",
    title: "NOT A FLUID FRAME",
};
pub const NOT_APPLICABLE: ErrorCode = ErrorCode {
    code: "E2005",
    title: "NOT APPLICABLE",
};
pub const IMPROPER_ARGUMENT_LIST: ErrorCode = ErrorCode {
    code: "E2006",
    title: "IMPROPER ARGUMENT LIST",
};
pub const UNIMPLEMENTED: ErrorCode = ErrorCode {
    code: "E2007",
    title: "UNIMPLEMENTED",
};
pub const WRONG_TYPE: ErrorCode = ErrorCode {
    code: "E2008",
    title: "WRONG TYPE",
};
pub const WRONG_NUMBER_OF_ARGUMENTS: ErrorCode = ErrorCode {
    code: "E2009",
    title: "WRONG NUMBER OF ARGUMENTS",
};
pub const OUT_OF_RANGE: ErrorCode = ErrorCode {
    code: "E2010",
    title: "OUT OF RANGE",
};
pub const NO_SUCH_MODULE: ErrorCode = ErrorCode {
    code: "E2011",
    title: "NO SUCH MODULE",
};
pub const INVALID_PRIMOP: ErrorCode = ErrorCode {
    code: "E2012",
    title: "INVALID PRIMOP",
};
pub const CONTINUATION_ESCAPE: ErrorCode = ErrorCode {
    code: "E2013",
    title: "CONTINUATION ESCAPE",
};

/// Which family of dynamic-extent frame an operation expected on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFamily {
    /// A dynamic-wind or prompt frame.
    Extent,
    /// A fluid-binding frame.
    Fluid,
}

impl fmt::Display for FrameFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameFamily::Extent => write!(f, "dynamic-wind or prompt"),
            FrameFamily::Fluid => write!(f, "fluid binding"),
        }
    }
}

/// Every failure the runtime core can report.
///
/// None of these are retried internally. While a computation is running
/// inside [`crate::runtime::vm::Machine::call`], an error is turned into an
/// abort to the machine's error tag if a matching prompt is installed, so
/// collaborators catch errors by establishing a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    UnboundVariable { name: String },
    AmbiguousBinding { name: String },
    NoMatchingPrompt { tag: String },
    FrameKindMismatch {
        expected: FrameFamily,
        found: &'static str,
    },
    NotAFrame { found: &'static str },
    NotApplicable { type_name: &'static str },
    ImproperArgumentList,
    Unimplemented { feature: String },
    WrongType {
        procedure: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    WrongNumberOfArgs {
        procedure: &'static str,
        expected: String,
        got: usize,
    },
    OutOfRange {
        procedure: &'static str,
        index: usize,
        len: usize,
    },
    NoSuchModule { name: String },
    InvalidPrimOp { id: u8 },
    /// Control reached the halt continuation of an enclosing run. Nested
    /// runs return this until the run at `depth` picks up the values.
    ContinuationEscape { depth: usize },
}

impl RuntimeError {
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            RuntimeError::UnboundVariable { .. } => &UNBOUND_VARIABLE,
            RuntimeError::AmbiguousBinding { .. } => &AMBIGUOUS_BINDING,
            RuntimeError::NoMatchingPrompt { .. } => &NO_MATCHING_PROMPT,
            RuntimeError::FrameKindMismatch { .. } => &FRAME_KIND_MISMATCH,
            RuntimeError::NotAFrame { .. } => &NOT_A_FRAME,
            RuntimeError::NotApplicable { .. } => &NOT_APPLICABLE,
            RuntimeError::ImproperArgumentList => &IMPROPER_ARGUMENT_LIST,
            RuntimeError::Unimplemented { .. } => &UNIMPLEMENTED,
            RuntimeError::WrongType { .. } => &WRONG_TYPE,
            RuntimeError::WrongNumberOfArgs { .. } => &WRONG_NUMBER_OF_ARGUMENTS,
            RuntimeError::OutOfRange { .. } => &OUT_OF_RANGE,
            RuntimeError::NoSuchModule { .. } => &NO_SUCH_MODULE,
            RuntimeError::InvalidPrimOp { .. } => &INVALID_PRIMOP,
            RuntimeError::ContinuationEscape { .. } => &CONTINUATION_ESCAPE,
        }
    }

    /// Symbol name used as the error key when the error is raised to a
    /// prompt.
    pub fn key(&self) -> &'static str {
        match self {
            RuntimeError::UnboundVariable { .. } => "unbound-variable",
            RuntimeError::AmbiguousBinding { .. } => "ambiguous-binding",
            RuntimeError::NoMatchingPrompt { .. } => "no-matching-prompt",
            RuntimeError::FrameKindMismatch { .. } => "frame-kind-mismatch",
            RuntimeError::NotAFrame { .. } => "not-a-frame",
            RuntimeError::NotApplicable { .. } => "not-applicable",
            RuntimeError::ImproperArgumentList => "improper-argument-list",
            RuntimeError::Unimplemented { .. } => "unimplemented",
            RuntimeError::WrongType { .. } => "wrong-type-arg",
            RuntimeError::WrongNumberOfArgs { .. } => "wrong-number-of-args",
            RuntimeError::OutOfRange { .. } => "out-of-range",
            RuntimeError::NoSuchModule { .. } => "no-such-module",
            RuntimeError::InvalidPrimOp { .. } => "invalid-primop",
            RuntimeError::ContinuationEscape { .. } => "continuation-escape",
        }
    }

    pub fn unimplemented(feature: impl Into<String>) -> Self {
        RuntimeError::Unimplemented {
            feature: feature.into(),
        }
    }

    fn detail(&self) -> String {
        match self {
            RuntimeError::UnboundVariable { name } => format!("`{}` is not bound", name),
            RuntimeError::AmbiguousBinding { name } => {
                format!("`{}` is imported from more than one interface", name)
            }
            RuntimeError::NoMatchingPrompt { tag } => {
                format!("no prompt installed for tag {}", tag)
            }
            RuntimeError::FrameKindMismatch { expected, found } => {
                format!("expected a {} frame, found {}", expected, found)
            }
            RuntimeError::NotAFrame { found } => {
                format!("expected a fluid binding frame, found {}", found)
            }
            RuntimeError::NotApplicable { type_name } => {
                format!("cannot apply a value of type {}", type_name)
            }
            RuntimeError::ImproperArgumentList => {
                "apply: last argument is not a proper list".to_string()
            }
            RuntimeError::Unimplemented { feature } => format!("{} is not implemented", feature),
            RuntimeError::WrongType {
                procedure,
                expected,
                got,
            } => format!("{} expected {}, got {}", procedure, expected, got),
            RuntimeError::WrongNumberOfArgs {
                procedure,
                expected,
                got,
            } => format!("{} expects {} arguments, got {}", procedure, expected, got),
            RuntimeError::OutOfRange {
                procedure,
                index,
                len,
            } => format!("{}: index {} out of range for length {}", procedure, index, len),
            RuntimeError::NoSuchModule { name } => format!("module {} does not exist", name),
            RuntimeError::InvalidPrimOp { id } => format!("invalid primop id {}", id),
            RuntimeError::ContinuationEscape { depth } => {
                format!("control left a nested run for run level {}", depth)
            }
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        write!(f, "error[{}]: {}: {}", code.code, code.title, self.detail())
    }
}

impl std::error::Error for RuntimeError {}
