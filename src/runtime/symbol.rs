use std::{
    collections::HashMap,
    fmt,
    hash::{BuildHasher, Hash, Hasher, RandomState},
};

/// An interned symbol name.
///
/// Symbols are created by the [`Interner`] and compared by index, so two
/// symbols with the same name are always the same `Symbol`. They are never
/// destroyed: the intern table only grows for the life of the machine.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this symbol.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<symbol {}>", self.0)
    }
}

/// Byte range of an interned name inside the storage buffer.
#[derive(Debug, Clone, Copy)]
struct Entry {
    start: usize,
    end: usize,
}

/// Process-wide symbol table.
///
/// All names live in one contiguous buffer; lookup goes through a hash
/// bucket of candidate symbols so colliding names are told apart by content.
///
/// ```
/// use skein::runtime::symbol::Interner;
///
/// let mut interner = Interner::new();
/// let a = interner.intern("car");
/// let b = interner.intern("car");
/// assert_eq!(a, b);
/// assert_eq!(interner.resolve(a), "car");
/// ```
#[derive(Debug, Clone)]
pub struct Interner {
    hasher: RandomState,
    buckets: HashMap<u64, Vec<Symbol>>,
    entries: Vec<Entry>,
    storage: String,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        Self {
            hasher: RandomState::new(),
            buckets: HashMap::default(),
            entries: Vec::new(),
            storage: String::new(),
        }
    }

    /// Creates an interner with room for `symbol_capacity` names totalling
    /// `storage_bytes` bytes.
    pub fn with_capacity(symbol_capacity: usize, storage_bytes: usize) -> Self {
        Self {
            hasher: RandomState::new(),
            buckets: HashMap::with_capacity(symbol_capacity),
            entries: Vec::with_capacity(symbol_capacity),
            storage: String::with_capacity(storage_bytes),
        }
    }

    /// Interns `s`, returning the existing symbol when the name is known.
    ///
    /// # Panics
    ///
    /// Panics if the number of unique symbols exceeds `u32::MAX`.
    pub fn intern(&mut self, s: &str) -> Symbol {
        let hash = self.hash_str(s);
        if let Some(sym) = self.find(hash, s) {
            return sym;
        }

        let index = self.entries.len();
        assert!(
            index <= u32::MAX as usize,
            "symbol table overflow: cannot intern more than {} unique names",
            u32::MAX
        );
        let sym = Symbol::new(index as u32);

        let start = self.storage.len();
        self.storage.push_str(s);
        let end = self.storage.len();

        self.entries.push(Entry { start, end });
        self.buckets.entry(hash).or_default().push(sym);
        sym
    }

    /// Returns the symbol for `s` without creating one.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.find(self.hash_str(s), s)
    }

    /// Resolves a symbol to its name.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not created by this interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.try_resolve(sym)
            .unwrap_or_else(|| panic!("invalid symbol: {:?}", sym))
    }

    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        let entry = self.entries.get(sym.as_u32() as usize)?;
        self.storage.get(entry.start..entry.end)
    }

    /// Number of distinct names interned so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, hash: u64, s: &str) -> Option<Symbol> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|candidate| self.try_resolve(*candidate) == Some(s))
    }

    fn hash_str(&self, s: &str) -> u64 {
        let mut h = self.hasher.build_hasher();
        s.hash(&mut h);
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_reuses_symbol_for_same_name() {
        let mut interner = Interner::new();
        let a = interner.intern("define!");
        let b = interner.intern("define!");
        let c = interner.intern("set!");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "define!");
        assert_eq!(interner.resolve(c), "set!");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn lookup_does_not_intern() {
        let mut interner = Interner::new();
        assert_eq!(interner.lookup("car"), None);
        let car = interner.intern("car");
        assert_eq!(interner.lookup("car"), Some(car));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn try_resolve_returns_none_for_foreign_symbol() {
        let interner = Interner::new();
        assert_eq!(interner.try_resolve(Symbol::new(999)), None);
    }

    #[test]
    #[should_panic(expected = "invalid symbol")]
    fn resolve_panics_on_foreign_symbol() {
        let interner = Interner::new();
        let _ = interner.resolve(Symbol::new(999));
    }

    #[test]
    fn handles_empty_and_unicode_names() {
        let mut interner = Interner::new();
        let empty = interner.intern("");
        let lambda = interner.intern("λ");
        assert_eq!(interner.intern(""), empty);
        assert_eq!(interner.intern("λ"), lambda);
        assert_eq!(interner.resolve(lambda), "λ");
        assert_eq!(interner.resolve(empty), "");
    }

    #[test]
    fn many_names_stay_distinct() {
        let mut interner = Interner::with_capacity(128, 1024);
        let names: Vec<String> = (0..100).map(|i| format!("var-{}", i)).collect();
        let symbols: Vec<Symbol> = names.iter().map(|n| interner.intern(n)).collect();

        for (i, sym) in symbols.iter().enumerate() {
            assert_eq!(interner.resolve(*sym), names[i]);
            assert_eq!(interner.intern(&names[i]), *sym);
        }
        let mut sorted = symbols.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), 100);
    }
}
