//! Module and variable resolution.
//!
//! Before boot every global lives in one flat obarray. Boot completion
//! (the first `set-current-module`) switches, once and for good, to
//! module-aware resolution where a module is a struct holding its own
//! obarray, a uses list of interfaces and a cache of resolved imports.
use std::{collections::HashMap, rc::Rc};

use crate::runtime::{
    error::RuntimeError,
    hash_key::EqKey,
    object::{Fluid, HashTable, Variable},
    structs::{FieldAccess, FieldKind, Layout, Struct, Vtables, init_from_layout},
    symbol::{Interner, Symbol},
    value::Value,
    vm::Machine,
};

mod boot;

pub const MODULE_INDEX_OBARRAY: usize = 0;
pub const MODULE_INDEX_USES: usize = 1;
pub const MODULE_INDEX_NAME: usize = 5;
pub const MODULE_INDEX_IMPORT_OBARRAY: usize = 8;
pub const MODULE_INDEX_PUBLIC_INTERFACE: usize = 14;
const MODULE_FIELD_COUNT: usize = 15;

/// Qualified references to this symbol skip module resolution after boot;
/// the boot-time `resolve-module` depends on it.
const BOOTSTRAP_BYPASS_SYMBOL: &str = "equal?";

/// Resolution state owned by the [`Machine`].
pub struct ModuleSystem {
    pre_modules_obarray: Rc<HashTable>,
    booted: bool,
    current_module: Rc<Fluid>,
    scope_cache: HashMap<i64, Value>,
    module_vtable: Rc<Struct>,
    root_module_var: Option<Rc<Variable>>,
    resolve_module_var: Option<Rc<Variable>>,
    public_interface_var: Option<Rc<Variable>>,
    registry: HashMap<Vec<EqKey>, Value>,
}

impl ModuleSystem {
    pub fn new(vtables: &Vtables, interner: &mut Interner) -> Self {
        let layout = "pw".repeat(MODULE_FIELD_COUNT);
        Self {
            pre_modules_obarray: Rc::new(HashTable::new(false)),
            booted: false,
            current_module: Rc::new(Fluid::new(Value::FALSE)),
            scope_cache: HashMap::new(),
            module_vtable: vtables.derive(&layout, Value::FALSE, interner),
            root_module_var: None,
            resolve_module_var: None,
            public_interface_var: None,
            registry: HashMap::new(),
        }
    }

    pub fn is_booted(&self) -> bool {
        self.booted
    }

    pub fn pre_modules_obarray(&self) -> Rc<HashTable> {
        self.pre_modules_obarray.clone()
    }

    pub fn current_module_fluid(&self) -> Rc<Fluid> {
        self.current_module.clone()
    }
}

fn variable_in(table: &HashTable, key: &Value) -> Option<Rc<Variable>> {
    match table.get(key) {
        Some(Value::Variable(var)) => Some(var),
        _ => None,
    }
}

fn as_module<'a>(module: &'a Value, procedure: &'static str) -> Result<&'a Rc<Struct>, RuntimeError> {
    match module {
        Value::Struct(s) => Ok(s),
        other => Err(RuntimeError::WrongType {
            procedure,
            expected: "module",
            got: other.type_name(),
        }),
    }
}

fn table_field(
    module: &Struct,
    index: usize,
    procedure: &'static str,
) -> Result<Rc<HashTable>, RuntimeError> {
    match module.field(index)? {
        Value::HashTable(table) => Ok(table),
        other => Err(RuntimeError::WrongType {
            procedure,
            expected: "HashTable",
            got: other.type_name(),
        }),
    }
}

fn is_core_namespace(name: &Value, interner: &Interner) -> bool {
    let Value::Pair(pair) = name else {
        return false;
    };
    let is_guile = matches!(pair.car(), Value::Symbol(sym) if interner.try_resolve(sym) == Some("guile"));
    is_guile && matches!(pair.cdr(), Value::Empty)
}

impl Machine {
    fn unbound(&self, sym: Symbol) -> RuntimeError {
        RuntimeError::UnboundVariable {
            name: self.symbol_name(sym).to_string(),
        }
    }

    fn check_bound(
        &self,
        var: Rc<Variable>,
        sym: Symbol,
        must_be_bound: bool,
    ) -> Result<Rc<Variable>, RuntimeError> {
        if must_be_bound && !var.is_bound() {
            return Err(self.unbound(sym));
        }
        Ok(var)
    }

    pub fn module_system_booted(&self) -> bool {
        self.modules.booted
    }

    /// The flat obarray used before boot.
    pub fn pre_modules_obarray(&self) -> Value {
        Value::HashTable(self.modules.pre_modules_obarray())
    }

    /// Reads `current-module`; always `#f` before boot.
    pub fn current_module(&self) -> Value {
        if self.modules.booted {
            self.modules.current_module.get()
        } else {
            Value::FALSE
        }
    }

    /// Installs `module` as current and returns the previous one. The first
    /// call completes boot.
    pub fn set_current_module(&mut self, module: Value) -> Result<Value, RuntimeError> {
        if !self.modules.booted {
            self.boot_complete()?;
        }
        let old = self.current_module();
        self.modules.current_module.set(module);
        Ok(old)
    }

    /// Switches to module-aware resolution.
    ///
    /// The bootstrap procedures are looked up in the flat obarray first, so
    /// a missing one leaves the machine in pre-boot mode.
    pub fn boot_complete(&mut self) -> Result<(), RuntimeError> {
        if self.modules.booted {
            return Ok(());
        }
        let root = self.intern("the-root-module");
        let resolve = self.intern("resolve-module");
        let interface = self.intern("module-public-interface");

        let root_var = self.module_lookup(&Value::FALSE, root)?;
        let resolve_var = self.module_lookup(&Value::FALSE, resolve)?;
        let interface_var = self.module_lookup(&Value::FALSE, interface)?;

        self.modules.root_module_var = Some(root_var);
        self.modules.resolve_module_var = Some(resolve_var);
        self.modules.public_interface_var = Some(interface_var);
        self.modules.booted = true;
        tracing::info!("module system booted");
        Ok(())
    }

    /// The root module after boot, `#f` before.
    pub fn the_root_module(&self) -> Value {
        match (&self.modules.root_module_var, self.modules.booted) {
            (Some(var), true) => var.get(),
            _ => Value::FALSE,
        }
    }

    /// Builds a module named `name` importing from `uses`.
    pub fn make_module(&mut self, name: Value, uses: Vec<Value>) -> Value {
        self.module_with_obarray(name, Rc::new(HashTable::new(false)), uses)
    }

    /// Builds the root module. It shares the flat obarray, so everything
    /// defined before boot stays visible through it.
    pub fn make_root_module(&mut self) -> Value {
        let name = Value::list(vec![self.symbol("guile")]);
        let obarray = self.modules.pre_modules_obarray();
        self.module_with_obarray(name, obarray, Vec::new())
    }

    fn module_with_obarray(&mut self, name: Value, obarray: Rc<HashTable>, uses: Vec<Value>) -> Value {
        let module = Struct::allocate(&self.modules.module_vtable, MODULE_FIELD_COUNT);
        let layout = Layout::uniform(MODULE_FIELD_COUNT, FieldKind::Pointer, FieldAccess::Writable);
        init_from_layout(&module, &layout, &[]);

        let fields = [
            (MODULE_INDEX_OBARRAY, Value::HashTable(obarray)),
            (MODULE_INDEX_USES, Value::list(uses)),
            (MODULE_INDEX_NAME, name),
            (
                MODULE_INDEX_IMPORT_OBARRAY,
                Value::HashTable(Rc::new(HashTable::new(false))),
            ),
        ];
        for (index, value) in fields {
            // indices are all below MODULE_FIELD_COUNT
            let _ = module.set_field(index, value);
        }
        Value::Struct(module)
    }

    /// Appends `interface` to the uses list of `module`.
    pub fn module_use(&mut self, module: &Value, interface: Value) -> Result<(), RuntimeError> {
        let m = as_module(module, "module-use!")?;
        let mut uses = m.field(MODULE_INDEX_USES)?.list_to_vec()?;
        uses.push(interface);
        m.set_field(MODULE_INDEX_USES, Value::list(uses))
    }

    pub fn set_module_public_interface(
        &mut self,
        module: &Value,
        interface: Value,
    ) -> Result<(), RuntimeError> {
        as_module(module, "set-module-public-interface!")?
            .set_field(MODULE_INDEX_PUBLIC_INTERFACE, interface)
    }

    /// Resolves `sym` in `module`: own obarray, then the import cache, then
    /// the uses list. `#f` as the module means the flat obarray.
    pub fn module_variable(
        &mut self,
        module: &Value,
        sym: Symbol,
    ) -> Result<Option<Rc<Variable>>, RuntimeError> {
        let key = Value::Symbol(sym);
        if module.is_false() {
            return Ok(variable_in(&self.modules.pre_modules_obarray, &key));
        }
        let m = as_module(module, "module-variable")?.clone();
        let obarray = table_field(&m, MODULE_INDEX_OBARRAY, "module-variable")?;
        if let Some(var) = variable_in(&obarray, &key) {
            return Ok(Some(var));
        }
        self.module_imported_variable(&m, sym)
    }

    fn module_imported_variable(
        &mut self,
        module: &Struct,
        sym: Symbol,
    ) -> Result<Option<Rc<Variable>>, RuntimeError> {
        let key = Value::Symbol(sym);
        let imports = table_field(module, MODULE_INDEX_IMPORT_OBARRAY, "module-variable")?;
        if let Some(var) = variable_in(&imports, &key) {
            return Ok(Some(var));
        }

        let uses = module.field(MODULE_INDEX_USES)?.list_to_vec()?;
        let mut found: Option<Rc<Variable>> = None;
        for interface in &uses {
            let Some(var) = self.module_variable(interface, sym)? else {
                continue;
            };
            if found.is_some() {
                return Err(RuntimeError::AmbiguousBinding {
                    name: self.symbol_name(sym).to_string(),
                });
            }
            found = Some(var);
        }

        if let Some(var) = &found {
            imports.set(key, Value::Variable(var.clone()));
        }
        Ok(found)
    }

    /// Local binding of `sym` in `module` without consulting imports.
    pub fn module_local_variable(
        &self,
        module: &Value,
        sym: Symbol,
    ) -> Result<Option<Rc<Variable>>, RuntimeError> {
        let key = Value::Symbol(sym);
        if module.is_false() {
            return Ok(variable_in(&self.modules.pre_modules_obarray, &key));
        }
        let m = as_module(module, "module-local-variable")?;
        let obarray = table_field(m, MODULE_INDEX_OBARRAY, "module-local-variable")?;
        Ok(variable_in(&obarray, &key))
    }

    /// Finds or creates the local variable for `sym`. Before boot the module
    /// is ignored and the flat obarray is used.
    pub fn ensure_local_variable(
        &mut self,
        module: &Value,
        sym: Symbol,
    ) -> Result<Rc<Variable>, RuntimeError> {
        let obarray = if !self.modules.booted || module.is_false() {
            self.modules.pre_modules_obarray()
        } else {
            let m = as_module(module, "module-ensure-local-variable!")?;
            table_field(m, MODULE_INDEX_OBARRAY, "module-ensure-local-variable!")?
        };
        let key = Value::Symbol(sym);
        if let Some(var) = variable_in(&obarray, &key) {
            return Ok(var);
        }
        let var = Rc::new(Variable::unbound());
        obarray.set(key, Value::Variable(var.clone()));
        Ok(var)
    }

    pub fn module_lookup(&mut self, module: &Value, sym: Symbol) -> Result<Rc<Variable>, RuntimeError> {
        self.module_variable(module, sym)?
            .ok_or_else(|| self.unbound(sym))
    }

    pub fn module_define(
        &mut self,
        module: &Value,
        sym: Symbol,
        value: Value,
    ) -> Result<Rc<Variable>, RuntimeError> {
        let var = self.ensure_local_variable(module, sym)?;
        var.set(value);
        Ok(var)
    }

    /// Defines `name` in the current module.
    pub fn define(&mut self, name: &str, value: Value) -> Result<Rc<Variable>, RuntimeError> {
        let sym = self.intern(name);
        let module = self.current_module();
        self.module_define(&module, sym, value)
    }

    /// Unqualified lookup in the current module.
    pub fn lookup(&mut self, sym: Symbol) -> Result<Rc<Variable>, RuntimeError> {
        let module = self.current_module();
        self.module_lookup(&module, sym)
    }

    pub fn resolve(&mut self, sym: Symbol, must_be_bound: bool) -> Result<Rc<Variable>, RuntimeError> {
        let var = self.lookup(sym)?;
        self.check_bound(var, sym, must_be_bound)
    }

    /// Remembers which module was current for a compiled toplevel scope.
    pub fn cache_current_module(&mut self, module: Value, scope: i64) {
        self.modules.scope_cache.insert(scope, module);
    }

    /// Toplevel reference from compiled code in `scope`. An unknown scope or
    /// a scope cached as `#f` resolves in the root module.
    pub fn cached_lookup(
        &mut self,
        scope: i64,
        sym: Symbol,
        must_be_bound: bool,
    ) -> Result<Rc<Variable>, RuntimeError> {
        let module = match self.modules.scope_cache.get(&scope) {
            Some(module) if module.is_true() => module.clone(),
            _ => self.the_root_module(),
        };
        let var = self.module_lookup(&module, sym)?;
        self.check_bound(var, sym, must_be_bound)
    }

    /// Module-qualified reference `(@ module-name sym)` or `(@@ ...)`.
    pub fn cached_module_box(
        &mut self,
        module_name: &Value,
        sym: Symbol,
        public: bool,
        must_be_bound: bool,
    ) -> Result<Rc<Variable>, RuntimeError> {
        let var = if !self.modules.booted {
            if !is_core_namespace(module_name, &self.interner) {
                return Err(RuntimeError::unimplemented(format!(
                    "module-qualified reference to {} before boot",
                    self.render(module_name)
                )));
            }
            self.lookup(sym)?
        } else if self.symbol_name(sym) == BOOTSTRAP_BYPASS_SYMBOL {
            self.module_variable(&Value::FALSE, sym)?
                .ok_or_else(|| self.unbound(sym))?
        } else {
            let module = self.resolve_module(module_name)?;
            let scope = if public {
                self.module_public_interface(&module)?
            } else {
                module
            };
            if scope.is_false() {
                return Err(RuntimeError::NoSuchModule {
                    name: format!("{} (no public interface)", self.render(module_name)),
                });
            }
            self.module_variable(&scope, sym)?
                .ok_or_else(|| self.unbound(sym))?
        };
        self.check_bound(var, sym, must_be_bound)
    }

    /// Calls the booted `resolve-module` with `#:ensure #f`.
    fn resolve_module(&mut self, module_name: &Value) -> Result<Value, RuntimeError> {
        let resolver = match &self.modules.resolve_module_var {
            Some(var) => var.get(),
            None => return Err(RuntimeError::unimplemented("resolve-module before boot")),
        };
        let ensure = self.keyword("ensure");
        let module = self.call1(resolver, vec![module_name.clone(), ensure, Value::FALSE])?;
        if module.is_false() {
            return Err(RuntimeError::NoSuchModule {
                name: self.render(module_name),
            });
        }
        Ok(module)
    }

    /// Calls the booted `module-public-interface`.
    pub fn module_public_interface(&mut self, module: &Value) -> Result<Value, RuntimeError> {
        let procedure = match &self.modules.public_interface_var {
            Some(var) => var.get(),
            None => {
                return Err(RuntimeError::unimplemented(
                    "module-public-interface before boot",
                ));
            }
        };
        self.call1(procedure, vec![module.clone()])
    }
}

#[cfg(test)]
mod modules_test;
