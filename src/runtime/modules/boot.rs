//! A host-side boot layer for embedders that run without the Scheme module
//! system: a name registry behind `resolve-module`, field access behind
//! `module-public-interface`, and a root module for `(guile)`.
use std::rc::Rc;

use crate::runtime::{
    builtins::{
        helpers::{check_arity, check_min_arity, ret},
        keyword_ref,
    },
    closure::Closure,
    error::RuntimeError,
    hash_key::EqKey,
    value::Value,
    vm::{Invocation, Machine, Step},
};

use super::{MODULE_INDEX_PUBLIC_INTERFACE, as_module};

impl Machine {
    /// Makes `module` reachable from `resolve-module` under `name`.
    pub fn register_module(&mut self, name: &Value, module: Value) {
        self.modules.registry.insert(registry_key(name), module);
    }

    /// Binds the bootstrap procedures, installs a root module named
    /// `(guile)` that is its own public interface, and completes boot.
    ///
    /// Modules requested with `#:ensure #t` that were never registered are
    /// created on demand and import the root module.
    pub fn boot_standalone(&mut self) -> Result<Value, RuntimeError> {
        let root = self.make_root_module();
        self.set_module_public_interface(&root, root.clone())?;
        let name = Value::list(vec![self.symbol("guile")]);
        self.register_module(&name, root.clone());

        let bindings = [
            ("the-root-module", root.clone()),
            (
                "resolve-module",
                Value::Closure(Rc::new(Closure::native("resolve-module", resolve_registered))),
            ),
            (
                "module-public-interface",
                Value::Closure(Rc::new(Closure::native(
                    "module-public-interface",
                    public_interface_field,
                ))),
            ),
        ];
        for (binding, value) in bindings {
            let sym = self.intern(binding);
            self.module_define(&Value::FALSE, sym, value)?;
        }

        self.set_current_module(root.clone())?;
        Ok(root)
    }
}

/// `(resolve-module name #:ensure ensure?)`, `ensure?` defaulting to `#t`.
fn resolve_registered(machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_min_arity(&inv.args, 1, "resolve-module")?;
    let ensure_kw = machine.intern("ensure");
    let ensure = keyword_ref(ensure_kw, &inv.args, 1, Value::TRUE)?;
    let name = inv.args[0].clone();
    let key = registry_key(&name);

    let module = match machine.modules.registry.get(&key).cloned() {
        Some(module) => module,
        None if ensure.is_true() => {
            let root = machine.the_root_module();
            let module = machine.make_module(name, vec![root]);
            machine.modules.registry.insert(key, module.clone());
            module
        }
        None => Value::FALSE,
    };
    ret(inv, module)
}

/// Module names are lists compared element by element with `eq?`. Any
/// other value is keyed as a one-element name.
fn registry_key(name: &Value) -> Vec<EqKey> {
    match name.list_to_vec() {
        Ok(parts) => parts.iter().map(EqKey::from).collect(),
        Err(_) => vec![EqKey::from(name)],
    }
}

fn public_interface_field(_machine: &mut Machine, inv: Invocation) -> Result<Step, RuntimeError> {
    check_arity(&inv.args, 1, "module-public-interface")?;
    let interface = as_module(&inv.args[0], "module-public-interface")?.field(MODULE_INDEX_PUBLIC_INTERFACE)?;
    ret(inv, interface)
}
