//! Generic records described by vtables.
//!
//! A vtable is itself a struct; its layout field spells out, two codes per
//! field, what kind of value each field of its instances holds. The root
//! `<standard-vtable>` is its own vtable.
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::runtime::{error::RuntimeError, leak_detector, symbol::Interner, value::Value};

/// Layout of `<standard-vtable>` and every vtable derived from it.
pub const VTABLE_BASE_LAYOUT: &str = "pruhsruhpwphuhuh";

pub const VTABLE_INDEX_LAYOUT: usize = 0;
pub const VTABLE_INDEX_FLAGS: usize = 1;
pub const VTABLE_INDEX_SELF: usize = 2;
pub const VTABLE_INDEX_INSTANCE_FINALIZE: usize = 3;
pub const VTABLE_INDEX_INSTANCE_PRINTER: usize = 4;
pub const VTABLE_INDEX_NAME: usize = 5;
pub const VTABLE_INDEX_SIZE: usize = 6;
pub const VTABLE_INDEX_RESERVED_7: usize = 7;
pub const VTABLE_OFFSET_USER: usize = 8;

/// The struct is a vtable.
pub const FLAG_VTABLE: u32 = 1 << 0;
/// Vtables allocated from this vtable describe applicable structs.
pub const FLAG_APPLICABLE_VTABLE: u32 = 1 << 1;
/// Instances of this vtable are applicable.
pub const FLAG_APPLICABLE: u32 = 1 << 2;

/// Field index an applicable struct delegates calls to.
pub const APPLICABLE_STRUCT_INDEX_PROCEDURE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `p`: holds any value.
    Pointer,
    /// `u`: holds a raw number.
    Unboxed,
    /// `s`: holds the struct itself.
    SelfRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    ReadOnly,
    Writable,
    Hidden,
    Opaque,
}

impl FieldAccess {
    /// Hidden and opaque fields are left alone by generic initialisation.
    pub fn is_skipped(self) -> bool {
        matches!(self, FieldAccess::Hidden | FieldAccess::Opaque)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub access: FieldAccess,
}

/// A parsed layout string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    fields: Vec<FieldSpec>,
}

impl Layout {
    pub fn parse(codes: &str) -> Result<Self, RuntimeError> {
        let malformed = RuntimeError::WrongType {
            procedure: "make-struct-layout",
            expected: "pairs of [pus][rwho] codes",
            got: "malformed layout",
        };
        let bytes = codes.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(malformed);
        }
        let mut fields = Vec::with_capacity(bytes.len() / 2);
        for pair in bytes.chunks(2) {
            let kind = match pair[0] {
                b'p' => FieldKind::Pointer,
                b'u' => FieldKind::Unboxed,
                b's' => FieldKind::SelfRef,
                _ => return Err(malformed),
            };
            let access = match pair[1] {
                b'r' => FieldAccess::ReadOnly,
                b'w' => FieldAccess::Writable,
                b'h' => FieldAccess::Hidden,
                b'o' => FieldAccess::Opaque,
                _ => return Err(malformed),
            };
            fields.push(FieldSpec { kind, access });
        }
        Ok(Self { fields })
    }

    /// Layout of every vtable, as spelled by [`VTABLE_BASE_LAYOUT`].
    pub fn vtable_base() -> Self {
        use FieldAccess::*;
        use FieldKind::*;
        let spec = |kind, access| FieldSpec { kind, access };
        Self {
            fields: vec![
                spec(Pointer, ReadOnly),
                spec(Unboxed, Hidden),
                spec(SelfRef, ReadOnly),
                spec(Unboxed, Hidden),
                spec(Pointer, Writable),
                spec(Pointer, Hidden),
                spec(Unboxed, Hidden),
                spec(Unboxed, Hidden),
            ],
        }
    }

    /// `count` fields that all share one kind and access code.
    pub fn uniform(count: usize, kind: FieldKind, access: FieldAccess) -> Self {
        Self {
            fields: vec![FieldSpec { kind, access }; count],
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

/// A struct instance: a vtable reference plus an ordered field array.
///
/// The field count is fixed at allocation. `applicable` is decided at
/// allocation from the vtable; the capability flags describe what the
/// struct itself does when used as a vtable.
pub struct Struct {
    vtable: RefCell<Option<Rc<Struct>>>,
    flags: Cell<u32>,
    applicable: bool,
    fields: RefCell<Vec<Value>>,
}

impl Struct {
    /// Allocates a struct of `field_count` unspecified fields described by
    /// `vtable`.
    pub fn allocate(vtable: &Rc<Struct>, field_count: usize) -> Rc<Struct> {
        let mut flags = 0;
        if vtable.has_flag(FLAG_APPLICABLE_VTABLE) {
            flags |= FLAG_VTABLE | FLAG_APPLICABLE;
        }
        let applicable = vtable.has_flag(FLAG_APPLICABLE);
        Self::raw(Some(vtable.clone()), flags, applicable, field_count)
    }

    fn raw(
        vtable: Option<Rc<Struct>>,
        flags: u32,
        applicable: bool,
        field_count: usize,
    ) -> Rc<Struct> {
        leak_detector::record_struct();
        Rc::new(Self {
            vtable: RefCell::new(vtable),
            flags: Cell::new(flags),
            applicable,
            fields: RefCell::new(vec![Value::Unspecified; field_count]),
        })
    }

    /// Returns the vtable.
    ///
    /// Only the root vtable is ever observed mid-construction, and it is
    /// patched to describe itself before it escapes, so a missing vtable
    /// is reported as the struct itself.
    pub fn vtable(self: &Rc<Self>) -> Rc<Struct> {
        self.vtable.borrow().clone().unwrap_or_else(|| self.clone())
    }

    pub fn field_count(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn field(&self, index: usize) -> Result<Value, RuntimeError> {
        let fields = self.fields.borrow();
        fields.get(index).cloned().ok_or(RuntimeError::OutOfRange {
            procedure: "struct-ref",
            index,
            len: fields.len(),
        })
    }

    pub fn set_field(&self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let mut fields = self.fields.borrow_mut();
        let len = fields.len();
        match fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::OutOfRange {
                procedure: "struct-set!",
                index,
                len,
            }),
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags.get() & flag != 0
    }

    pub fn set_flag(&self, flag: u32) {
        self.flags.set(self.flags.get() | flag);
    }

    pub fn is_vtable(&self) -> bool {
        self.has_flag(FLAG_VTABLE)
    }

    pub fn is_applicable(&self) -> bool {
        self.applicable
    }
}

impl fmt::Debug for Struct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Struct(fields={}, flags={:#b}, applicable={})",
            self.field_count(),
            self.flags.get(),
            self.applicable
        )
    }
}

/// Fills the non-hidden fields of `target` from `args` according to
/// `layout`.
///
/// Pointer fields default to `#f` and unboxed fields to `0` once `args`
/// runs out; self fields receive the struct itself.
pub fn init_from_layout(target: &Rc<Struct>, layout: &Layout, args: &[Value]) {
    let mut args = args.iter();
    let mut fields = target.fields.borrow_mut();
    for (slot, spec) in fields.iter_mut().zip(layout.fields()) {
        if spec.access.is_skipped() {
            continue;
        }
        *slot = match spec.kind {
            FieldKind::Pointer => args.next().cloned().unwrap_or(Value::FALSE),
            FieldKind::Unboxed => args.next().cloned().unwrap_or(Value::Integer(0)),
            FieldKind::SelfRef => Value::Struct(target.clone()),
        };
    }
}

/// Reads and parses the layout stored in a vtable's layout field.
pub fn vtable_layout(vtable: &Struct, interner: &Interner) -> Result<Layout, RuntimeError> {
    match vtable.field(VTABLE_INDEX_LAYOUT)? {
        Value::Symbol(sym) => Layout::parse(interner.resolve(sym)),
        other => Err(RuntimeError::WrongType {
            procedure: "struct-layout",
            expected: "Symbol",
            got: other.type_name(),
        }),
    }
}

/// Allocates and initialises an instance of `vtable` from positional
/// arguments.
pub fn make_struct(
    vtable: &Rc<Struct>,
    args: &[Value],
    interner: &Interner,
) -> Result<Rc<Struct>, RuntimeError> {
    let layout = vtable_layout(vtable, interner)?;
    let instance = Struct::allocate(vtable, layout.len());
    init_from_layout(&instance, &layout, args);
    Ok(instance)
}

/// The two vtables every machine starts with.
#[derive(Debug, Clone)]
pub struct Vtables {
    /// `<standard-vtable>`: the self-describing root.
    pub standard: Rc<Struct>,
    /// `<applicable-struct-vtable>`: its child vtables describe applicable
    /// structs.
    pub applicable: Rc<Struct>,
}

impl Vtables {
    pub fn bootstrap(interner: &mut Interner) -> Self {
        let base = Layout::vtable_base();
        let layout_sym = Value::Symbol(interner.intern(VTABLE_BASE_LAYOUT));

        // The root is allocated before any vtable exists, then made to
        // describe itself.
        let standard = Struct::raw(None, FLAG_VTABLE, false, base.len());
        *standard.vtable.borrow_mut() = Some(standard.clone());
        init_from_layout(&standard, &base, std::slice::from_ref(&layout_sym));

        let applicable = Struct::allocate(&standard, base.len());
        init_from_layout(&applicable, &base, &[layout_sym]);
        applicable.set_flag(FLAG_VTABLE | FLAG_APPLICABLE_VTABLE);

        Self {
            standard,
            applicable,
        }
    }

    /// Builds a vtable whose instances have the layout `fields`.
    pub fn make_vtable(
        &self,
        fields: &str,
        printer: Value,
        interner: &mut Interner,
    ) -> Result<Rc<Struct>, RuntimeError> {
        Layout::parse(fields)?;
        Ok(self.derive(fields, printer, interner))
    }

    /// Like [`Vtables::make_vtable`] for a layout already known to be valid.
    pub(crate) fn derive(&self, fields: &str, printer: Value, interner: &mut Interner) -> Rc<Struct> {
        let layout = Value::Symbol(interner.intern(fields));
        let vtable = Struct::allocate(&self.standard, VTABLE_OFFSET_USER);
        init_from_layout(&vtable, &Layout::vtable_base(), &[layout, printer]);
        vtable.set_flag(FLAG_VTABLE);
        vtable
    }
}
