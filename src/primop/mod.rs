use std::rc::Rc;

use crate::runtime::{
    builtins::{
        BUILTINS,
        helpers::{
            arg_fluid, arg_index, arg_string, arg_struct, arg_symbol, arg_variable, type_error,
        },
    },
    closure::Closure,
    error::{FrameFamily, RuntimeError},
    object::{Pair, Variable, Vector},
    structs::Struct,
    value::Value,
    vm::Machine,
};

/// Primitive operations compiled code applies directly, without going
/// through the CPS calling convention.
///
/// IDs are baked into compiled code, so existing discriminants must remain
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PrimOp {
    Cons = 0,
    Car = 1,
    Cdr = 2,
    SetCar = 3,
    SetCdr = 4,
    IsPair = 5,
    IsNull = 6,
    /// `box x -> Variable`.
    Box = 7,
    BoxRef = 8,
    BoxSet = 9,
    MakeVector = 10,
    VectorRef = 11,
    VectorSet = 12,
    VectorLength = 13,
    IsVector = 14,
    IsSymbol = 15,
    IsKeyword = 16,
    IsChar = 17,
    IsString = 18,
    StringLength = 19,
    StringRef = 20,
    FreeRef = 21,
    FreeSet = 22,
    /// Builtin procedure by table index.
    BuiltinRef = 23,
    AllocateStruct = 24,
    StructVtable = 25,
    StructRef = 26,
    StructSet = 27,
    IsStruct = 28,
    IsEq = 29,
    IsEqv = 30,
    FluidRef = 31,
    PushFluid = 32,
    PopFluid = 33,
    /// `wind enter leave`: pushes a dynamic-wind frame and runs `enter`.
    Wind = 34,
    /// Pops a dynamic-wind or prompt frame.
    Unwind = 35,
    /// `prompt escape-only? tag handler`.
    Prompt = 36,
    /// `define! sym`: the local variable for `sym` in the current module.
    Define = 37,
    CacheCurrentModule = 38,
    CachedToplevelBox = 39,
    CachedModuleBox = 40,
    CurrentModule = 41,
    Resolve = 42,
    IsVariable = 43,
    HandleInterrupts = 44,
}

/// Side-effect classification for primitive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimEffect {
    /// Deterministic and side-effect free.
    Pure,
    /// Allocates a fresh object.
    Alloc,
    /// Writes into an existing object.
    Mutation,
    /// Pushes or pops dynamic-extent frames.
    Control,
    /// Reads or extends module state.
    Resolution,
}

impl PrimOp {
    /// Number of defined operations; ids are `0..COUNT`.
    pub const COUNT: usize = 45;

    /// Returns the stable ID for this primitive op.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Decodes an ID into a [`PrimOp`].
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Cons,
            1 => Self::Car,
            2 => Self::Cdr,
            3 => Self::SetCar,
            4 => Self::SetCdr,
            5 => Self::IsPair,
            6 => Self::IsNull,
            7 => Self::Box,
            8 => Self::BoxRef,
            9 => Self::BoxSet,
            10 => Self::MakeVector,
            11 => Self::VectorRef,
            12 => Self::VectorSet,
            13 => Self::VectorLength,
            14 => Self::IsVector,
            15 => Self::IsSymbol,
            16 => Self::IsKeyword,
            17 => Self::IsChar,
            18 => Self::IsString,
            19 => Self::StringLength,
            20 => Self::StringRef,
            21 => Self::FreeRef,
            22 => Self::FreeSet,
            23 => Self::BuiltinRef,
            24 => Self::AllocateStruct,
            25 => Self::StructVtable,
            26 => Self::StructRef,
            27 => Self::StructSet,
            28 => Self::IsStruct,
            29 => Self::IsEq,
            30 => Self::IsEqv,
            31 => Self::FluidRef,
            32 => Self::PushFluid,
            33 => Self::PopFluid,
            34 => Self::Wind,
            35 => Self::Unwind,
            36 => Self::Prompt,
            37 => Self::Define,
            38 => Self::CacheCurrentModule,
            39 => Self::CachedToplevelBox,
            40 => Self::CachedModuleBox,
            41 => Self::CurrentModule,
            42 => Self::Resolve,
            43 => Self::IsVariable,
            44 => Self::HandleInterrupts,
            _ => return None,
        })
    }

    /// Looks an operation up by the name compiled code refers to it by.
    pub fn from_name(name: &str) -> Option<Self> {
        (0..Self::COUNT as u8)
            .filter_map(Self::from_id)
            .find(|op| op.display_name() == name)
    }

    /// Returns the fixed argument count for this operation.
    pub fn arity(self) -> usize {
        match self {
            Self::PopFluid | Self::Unwind | Self::CurrentModule | Self::HandleInterrupts => 0,
            Self::Car
            | Self::Cdr
            | Self::IsPair
            | Self::IsNull
            | Self::Box
            | Self::BoxRef
            | Self::VectorLength
            | Self::IsVector
            | Self::IsSymbol
            | Self::IsKeyword
            | Self::IsChar
            | Self::IsString
            | Self::StringLength
            | Self::BuiltinRef
            | Self::StructVtable
            | Self::IsStruct
            | Self::FluidRef
            | Self::Define
            | Self::IsVariable => 1,
            Self::Cons
            | Self::SetCar
            | Self::SetCdr
            | Self::BoxSet
            | Self::MakeVector
            | Self::VectorRef
            | Self::StringRef
            | Self::FreeRef
            | Self::AllocateStruct
            | Self::StructRef
            | Self::IsEq
            | Self::IsEqv
            | Self::PushFluid
            | Self::Wind
            | Self::CacheCurrentModule
            | Self::Resolve => 2,
            Self::VectorSet
            | Self::FreeSet
            | Self::StructSet
            | Self::Prompt
            | Self::CachedToplevelBox => 3,
            Self::CachedModuleBox => 4,
        }
    }

    /// Human-readable name used in diagnostics and traces.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cons => "cons",
            Self::Car => "car",
            Self::Cdr => "cdr",
            Self::SetCar => "set-car!",
            Self::SetCdr => "set-cdr!",
            Self::IsPair => "pair?",
            Self::IsNull => "null?",
            Self::Box => "box",
            Self::BoxRef => "box-ref",
            Self::BoxSet => "box-set!",
            Self::MakeVector => "make-vector",
            Self::VectorRef => "vector-ref",
            Self::VectorSet => "vector-set!",
            Self::VectorLength => "vector-length",
            Self::IsVector => "vector?",
            Self::IsSymbol => "symbol?",
            Self::IsKeyword => "keyword?",
            Self::IsChar => "char?",
            Self::IsString => "string?",
            Self::StringLength => "string-length",
            Self::StringRef => "string-ref",
            Self::FreeRef => "free-ref",
            Self::FreeSet => "free-set!",
            Self::BuiltinRef => "builtin-ref",
            Self::AllocateStruct => "allocate-struct",
            Self::StructVtable => "struct-vtable",
            Self::StructRef => "struct-ref",
            Self::StructSet => "struct-set!",
            Self::IsStruct => "struct?",
            Self::IsEq => "eq?",
            Self::IsEqv => "eqv?",
            Self::FluidRef => "fluid-ref",
            Self::PushFluid => "push-fluid",
            Self::PopFluid => "pop-fluid",
            Self::Wind => "wind",
            Self::Unwind => "unwind",
            Self::Prompt => "prompt",
            Self::Define => "define!",
            Self::CacheCurrentModule => "cache-current-module!",
            Self::CachedToplevelBox => "cached-toplevel-box",
            Self::CachedModuleBox => "cached-module-box",
            Self::CurrentModule => "current-module",
            Self::Resolve => "resolve",
            Self::IsVariable => "variable?",
            Self::HandleInterrupts => "handle-interrupts",
        }
    }

    pub fn effect(self) -> PrimEffect {
        match self {
            Self::Cons | Self::Box | Self::MakeVector | Self::AllocateStruct => PrimEffect::Alloc,
            Self::SetCar
            | Self::SetCdr
            | Self::BoxSet
            | Self::VectorSet
            | Self::FreeSet
            | Self::StructSet => PrimEffect::Mutation,
            Self::PushFluid
            | Self::PopFluid
            | Self::Wind
            | Self::Unwind
            | Self::Prompt
            | Self::HandleInterrupts => PrimEffect::Control,
            Self::Define
            | Self::CacheCurrentModule
            | Self::CachedToplevelBox
            | Self::CachedModuleBox
            | Self::CurrentModule
            | Self::Resolve => PrimEffect::Resolution,
            // reads of fluids and boxes count as pure
            _ => PrimEffect::Pure,
        }
    }
}

/// Executes a primitive operation on `machine`.
///
/// Arity is validated here so that every direct-call path fails the same
/// way on malformed code.
pub fn execute_primop(
    machine: &mut Machine,
    op: PrimOp,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    if args.len() != op.arity() {
        return Err(RuntimeError::WrongNumberOfArgs {
            procedure: op.display_name(),
            expected: op.arity().to_string(),
            got: args.len(),
        });
    }
    let name = op.display_name();

    match op {
        PrimOp::Cons => {
            let mut args = args.into_iter();
            let car = args.next().unwrap_or(Value::Unspecified);
            let cdr = args.next().unwrap_or(Value::Unspecified);
            Ok(Value::cons(car, cdr))
        }
        PrimOp::Car => Ok(expect_pair(&args[0], name)?.car()),
        PrimOp::Cdr => Ok(expect_pair(&args[0], name)?.cdr()),
        PrimOp::SetCar => {
            expect_pair(&args[0], name)?.set_car(args[1].clone());
            Ok(Value::Unspecified)
        }
        PrimOp::SetCdr => {
            expect_pair(&args[0], name)?.set_cdr(args[1].clone());
            Ok(Value::Unspecified)
        }
        PrimOp::IsPair => Ok(Value::from_bool(matches!(args[0], Value::Pair(_)))),
        PrimOp::IsNull => Ok(Value::from_bool(matches!(args[0], Value::Empty))),

        PrimOp::Box => Ok(Value::Variable(Rc::new(Variable::new(args[0].clone())))),
        PrimOp::BoxRef => {
            let var = arg_variable(&args, 0, name)?;
            if !var.is_bound() {
                return Err(RuntimeError::UnboundVariable {
                    name: "<anonymous variable>".to_string(),
                });
            }
            Ok(var.get())
        }
        PrimOp::BoxSet => {
            arg_variable(&args, 0, name)?.set(args[1].clone());
            Ok(Value::Unspecified)
        }

        PrimOp::MakeVector => {
            let len = arg_index(&args, 0, name)?;
            Ok(Value::Vector(Rc::new(Vector::filled(len, args[1].clone()))))
        }
        PrimOp::VectorRef => {
            let vector = expect_vector(&args[0], name)?;
            let index = arg_index(&args, 1, name)?;
            vector
                .get(index)
                .ok_or_else(|| out_of_range(name, index, vector.len()))
        }
        PrimOp::VectorSet => {
            let vector = expect_vector(&args[0], name)?;
            let index = arg_index(&args, 1, name)?;
            if !vector.set(index, args[2].clone()) {
                return Err(out_of_range(name, index, vector.len()));
            }
            Ok(Value::Unspecified)
        }
        PrimOp::VectorLength => Ok(Value::Integer(expect_vector(&args[0], name)?.len() as i64)),
        PrimOp::IsVector => Ok(Value::from_bool(matches!(args[0], Value::Vector(_)))),

        PrimOp::IsSymbol => Ok(Value::from_bool(matches!(args[0], Value::Symbol(_)))),
        PrimOp::IsKeyword => Ok(Value::from_bool(matches!(args[0], Value::Keyword(_)))),
        PrimOp::IsChar => Ok(Value::from_bool(matches!(args[0], Value::Char(_)))),
        PrimOp::IsString => Ok(Value::from_bool(matches!(args[0], Value::String(_)))),
        PrimOp::StringLength => {
            Ok(Value::Integer(arg_string(&args, 0, name)?.chars().count() as i64))
        }
        PrimOp::StringRef => {
            let text = arg_string(&args, 0, name)?;
            let index = arg_index(&args, 1, name)?;
            text.chars()
                .nth(index)
                .map(Value::Char)
                .ok_or_else(|| out_of_range(name, index, text.chars().count()))
        }

        PrimOp::FreeRef => {
            let closure = expect_closure(&args[0], name)?;
            closure.free_ref(arg_index(&args, 1, name)?)
        }
        PrimOp::FreeSet => {
            let closure = expect_closure(&args[0], name)?;
            closure.free_set(arg_index(&args, 1, name)?, args[2].clone())?;
            Ok(Value::Unspecified)
        }
        PrimOp::BuiltinRef => {
            let index = arg_index(&args, 0, name)?;
            machine
                .builtin(index)
                .ok_or_else(|| out_of_range(name, index, BUILTINS.len()))
        }

        PrimOp::AllocateStruct => {
            let vtable = arg_struct(&args, 0, name)?;
            let field_count = arg_index(&args, 1, name)?;
            Ok(Value::Struct(Struct::allocate(&vtable, field_count)))
        }
        PrimOp::StructVtable => Ok(Value::Struct(arg_struct(&args, 0, name)?.vtable())),
        PrimOp::StructRef => {
            let target = arg_struct(&args, 0, name)?;
            target.field(arg_index(&args, 1, name)?)
        }
        PrimOp::StructSet => {
            let target = arg_struct(&args, 0, name)?;
            target.set_field(arg_index(&args, 1, name)?, args[2].clone())?;
            Ok(Value::Unspecified)
        }
        PrimOp::IsStruct => Ok(Value::from_bool(matches!(args[0], Value::Struct(_)))),

        PrimOp::IsEq => Ok(Value::from_bool(args[0].is_eq(&args[1]))),
        PrimOp::IsEqv => Ok(Value::from_bool(args[0].is_eqv(&args[1]))),

        PrimOp::FluidRef => Ok(arg_fluid(&args, 0, name)?.get()),
        PrimOp::PushFluid => {
            let fluid = arg_fluid(&args, 0, name)?;
            machine.push_fluid(fluid, args[1].clone());
            Ok(Value::Unspecified)
        }
        PrimOp::PopFluid => {
            machine.pop_fluid()?;
            Ok(Value::Unspecified)
        }
        PrimOp::Wind => {
            let mut args = args.into_iter();
            let enter = args.next().unwrap_or(Value::Unspecified);
            let leave = args.next().unwrap_or(Value::Unspecified);
            machine.push_dynwind(enter, leave)?;
            Ok(Value::Unspecified)
        }
        PrimOp::Unwind => {
            machine.pop_dynamic(FrameFamily::Extent)?;
            Ok(Value::Unspecified)
        }
        PrimOp::Prompt => {
            let mut args = args.into_iter();
            let escape_only = args.next().is_some_and(|v| v.is_true());
            let tag = args.next().unwrap_or(Value::TRUE);
            let handler = args.next().unwrap_or(Value::Unspecified);
            machine.push_prompt(tag, escape_only, handler);
            Ok(Value::Unspecified)
        }

        PrimOp::Define => {
            let sym = arg_symbol(&args, 0, name)?;
            let module = machine.current_module();
            Ok(Value::Variable(machine.ensure_local_variable(&module, sym)?))
        }
        PrimOp::CacheCurrentModule => {
            let scope = expect_int(&args[1], name)?;
            machine.cache_current_module(args[0].clone(), scope);
            Ok(Value::Unspecified)
        }
        PrimOp::CachedToplevelBox => {
            let scope = expect_int(&args[0], name)?;
            let sym = arg_symbol(&args, 1, name)?;
            let var = machine.cached_lookup(scope, sym, args[2].is_true())?;
            Ok(Value::Variable(var))
        }
        PrimOp::CachedModuleBox => {
            let sym = arg_symbol(&args, 1, name)?;
            let var =
                machine.cached_module_box(&args[0], sym, args[2].is_true(), args[3].is_true())?;
            Ok(Value::Variable(var))
        }
        PrimOp::CurrentModule => Ok(machine.current_module()),
        PrimOp::Resolve => {
            let sym = arg_symbol(&args, 0, name)?;
            Ok(Value::Variable(machine.resolve(sym, args[1].is_true())?))
        }
        PrimOp::IsVariable => Ok(Value::from_bool(matches!(args[0], Value::Variable(_)))),
        PrimOp::HandleInterrupts => Ok(Value::Unspecified),
    }
}

/// Decodes `id` and executes it.
pub fn execute_primop_id(
    machine: &mut Machine,
    id: u8,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    let op = PrimOp::from_id(id).ok_or(RuntimeError::InvalidPrimOp { id })?;
    execute_primop(machine, op, args)
}

fn expect_pair<'a>(value: &'a Value, name: &'static str) -> Result<&'a Pair, RuntimeError> {
    match value {
        Value::Pair(pair) => Ok(pair),
        other => Err(type_error(name, "Pair", other)),
    }
}

fn expect_vector<'a>(value: &'a Value, name: &'static str) -> Result<&'a Vector, RuntimeError> {
    match value {
        Value::Vector(vector) => Ok(vector),
        other => Err(type_error(name, "Vector", other)),
    }
}

fn expect_closure<'a>(value: &'a Value, name: &'static str) -> Result<&'a Closure, RuntimeError> {
    match value {
        Value::Closure(closure) => Ok(closure),
        other => Err(type_error(name, "Closure", other)),
    }
}

/// Extracts an integer operand or produces a typed primop error.
fn expect_int(value: &Value, name: &'static str) -> Result<i64, RuntimeError> {
    match value {
        Value::Integer(v) => Ok(*v),
        other => Err(type_error(name, "Integer", other)),
    }
}

fn out_of_range(name: &'static str, index: usize, len: usize) -> RuntimeError {
    RuntimeError::OutOfRange {
        procedure: name,
        index,
        len,
    }
}
