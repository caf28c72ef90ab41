//! The CPS procedure library installed into every machine.
use crate::runtime::{
    builtin_function::BuiltinFunction,
    structs::{VTABLE_BASE_LAYOUT, VTABLE_INDEX_LAYOUT, VTABLE_INDEX_INSTANCE_PRINTER, VTABLE_OFFSET_USER},
    value::Value,
    vm::Machine,
};

mod control_ops;
mod hash_ops;
pub(crate) mod helpers;
mod hook_ops;
mod module_ops;
mod struct_ops;
mod symbol_ops;
mod syntax_ops;

use control_ops::{
    builtin_abort_to_prompt, builtin_apply, builtin_call_cc, builtin_call_with_prompt,
    builtin_call_with_values, builtin_dynamic_wind, builtin_fluid_ref, builtin_fluid_set,
    builtin_is_procedure, builtin_make_fluid, builtin_values, builtin_with_fluid,
};
use hash_ops::{
    builtin_hash_clear, builtin_hash_for_each, builtin_hash_map_to_list, builtin_hashq_ref,
    builtin_hashq_remove, builtin_hashq_set, builtin_make_hash_table,
    builtin_make_weak_key_hash_table, builtin_make_weak_value_hash_table,
};
use hook_ops::{builtin_add_hook, builtin_is_hook, builtin_make_hook, builtin_run_hook};
use module_ops::{
    builtin_current_module, builtin_define, builtin_get_pre_modules_obarray,
    builtin_is_variable_bound, builtin_make_module, builtin_make_undefined_variable,
    builtin_make_variable, builtin_module_local_variable, builtin_module_use,
    builtin_module_variable, builtin_set_current_module, builtin_variable_ref,
    builtin_variable_set,
};
use struct_ops::{
    builtin_is_struct_vtable, builtin_make_struct, builtin_make_struct_layout,
    builtin_make_struct_no_tail, builtin_make_vtable, builtin_set_struct_vtable_name,
    builtin_struct_ref, builtin_struct_vtable,
};
pub use symbol_ops::keyword_ref;
use symbol_ops::{
    builtin_gensym, builtin_is_keyword, builtin_is_symbol, builtin_string_to_symbol,
    builtin_symbol_to_keyword, builtin_symbol_to_string,
};
use syntax_ops::{
    builtin_is_syntax, builtin_make_syntax, builtin_make_syntax_transformer,
    builtin_syntax_expression, builtin_syntax_module, builtin_syntax_wrap,
};

pub const BUILTIN_APPLY: usize = 0;
pub const BUILTIN_VALUES: usize = 1;
pub const BUILTIN_ABORT_TO_PROMPT: usize = 2;
pub const BUILTIN_CALL_WITH_VALUES: usize = 3;
pub const BUILTIN_CALL_CC: usize = 4;

/// Builtins addressed by index from compiled code (index matters for
/// `builtin-ref`).
pub static BUILTINS: &[BuiltinFunction] = &[
    BuiltinFunction::new("apply", builtin_apply),
    BuiltinFunction::new("values", builtin_values),
    BuiltinFunction::new("abort-to-prompt", builtin_abort_to_prompt),
    BuiltinFunction::new("call-with-values", builtin_call_with_values),
    BuiltinFunction::new("call/cc", builtin_call_cc),
];

/// Procedures bound by name in the pre-boot obarray.
pub static CORE_PROCEDURES: &[BuiltinFunction] = &[
    // control
    BuiltinFunction::new("call-with-current-continuation", builtin_call_cc),
    BuiltinFunction::new("dynamic-wind", builtin_dynamic_wind),
    BuiltinFunction::new("call-with-prompt", builtin_call_with_prompt),
    BuiltinFunction::new("with-fluid*", builtin_with_fluid),
    BuiltinFunction::new("make-fluid", builtin_make_fluid),
    BuiltinFunction::new("fluid-ref", builtin_fluid_ref),
    BuiltinFunction::new("fluid-set!", builtin_fluid_set),
    BuiltinFunction::new("procedure?", builtin_is_procedure),
    // structs
    BuiltinFunction::new("make-vtable", builtin_make_vtable),
    BuiltinFunction::new("make-struct-layout", builtin_make_struct_layout),
    BuiltinFunction::new("make-struct/no-tail", builtin_make_struct_no_tail),
    BuiltinFunction::new("make-struct", builtin_make_struct),
    BuiltinFunction::new("struct-vtable?", builtin_is_struct_vtable),
    BuiltinFunction::new("set-struct-vtable-name!", builtin_set_struct_vtable_name),
    BuiltinFunction::new("struct-ref", builtin_struct_ref),
    BuiltinFunction::new("struct-vtable", builtin_struct_vtable),
    // modules and variables
    BuiltinFunction::new("define!", builtin_define),
    BuiltinFunction::new("module-local-variable", builtin_module_local_variable),
    BuiltinFunction::new("module-variable", builtin_module_variable),
    BuiltinFunction::new("%get-pre-modules-obarray", builtin_get_pre_modules_obarray),
    BuiltinFunction::new("current-module", builtin_current_module),
    BuiltinFunction::new("set-current-module", builtin_set_current_module),
    BuiltinFunction::new("make-module", builtin_make_module),
    BuiltinFunction::new("module-use!", builtin_module_use),
    BuiltinFunction::new("make-variable", builtin_make_variable),
    BuiltinFunction::new("make-undefined-variable", builtin_make_undefined_variable),
    BuiltinFunction::new("variable-bound?", builtin_is_variable_bound),
    BuiltinFunction::new("variable-ref", builtin_variable_ref),
    BuiltinFunction::new("variable-set!", builtin_variable_set),
    // hash tables
    BuiltinFunction::new("make-hash-table", builtin_make_hash_table),
    BuiltinFunction::new("make-weak-key-hash-table", builtin_make_weak_key_hash_table),
    BuiltinFunction::new("make-weak-value-hash-table", builtin_make_weak_value_hash_table),
    BuiltinFunction::new("hashq-ref", builtin_hashq_ref),
    BuiltinFunction::new("hashq-set!", builtin_hashq_set),
    BuiltinFunction::new("hashq-remove!", builtin_hashq_remove),
    BuiltinFunction::new("hash-clear!", builtin_hash_clear),
    BuiltinFunction::new("hash-for-each", builtin_hash_for_each),
    BuiltinFunction::new("hash-map->list", builtin_hash_map_to_list),
    // hooks
    BuiltinFunction::new("make-hook", builtin_make_hook),
    BuiltinFunction::new("add-hook!", builtin_add_hook),
    BuiltinFunction::new("run-hook", builtin_run_hook),
    BuiltinFunction::new("hook?", builtin_is_hook),
    // syntax
    BuiltinFunction::new("make-syntax", builtin_make_syntax),
    BuiltinFunction::new("syntax?", builtin_is_syntax),
    BuiltinFunction::new("syntax-expression", builtin_syntax_expression),
    BuiltinFunction::new("syntax-wrap", builtin_syntax_wrap),
    BuiltinFunction::new("syntax-module", builtin_syntax_module),
    BuiltinFunction::new("make-syntax-transformer", builtin_make_syntax_transformer),
    // symbols
    BuiltinFunction::new("symbol->string", builtin_symbol_to_string),
    BuiltinFunction::new("string->symbol", builtin_string_to_symbol),
    BuiltinFunction::new("gensym", builtin_gensym),
    BuiltinFunction::new("symbol?", builtin_is_symbol),
    BuiltinFunction::new("keyword?", builtin_is_keyword),
    BuiltinFunction::new("symbol->keyword", builtin_symbol_to_keyword),
];

pub fn get_builtin(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTINS
        .iter()
        .chain(CORE_PROCEDURES)
        .find(|b| b.name == name)
}

pub fn get_builtin_by_index(index: usize) -> Option<&'static BuiltinFunction> {
    BUILTINS.get(index)
}

/// Binds the indexed builtins, the named procedures and the struct
/// constants in the flat obarray. Runs before boot, so every binding ends
/// up visible through the root module.
pub fn install(machine: &mut Machine) {
    for (index, builtin) in BUILTINS.iter().enumerate() {
        let value = machine.builtin(index).unwrap_or_else(|| builtin.to_closure());
        bind(machine, builtin.name, value);
    }
    for builtin in CORE_PROCEDURES {
        bind(machine, builtin.name, builtin.to_closure());
    }

    let standard = machine.standard_vtable();
    let applicable = machine.applicable_struct_vtable();
    let values = [
        ("<standard-vtable>", standard.clone()),
        ("<applicable-struct-vtable>", applicable),
        ("record-type-vtable", standard),
        ("standard-vtable-fields", Value::string(VTABLE_BASE_LAYOUT)),
        ("vtable-index-layout", Value::Integer(VTABLE_INDEX_LAYOUT as i64)),
        ("vtable-index-printer", Value::Integer(VTABLE_INDEX_INSTANCE_PRINTER as i64)),
        ("vtable-offset-user", Value::Integer(VTABLE_OFFSET_USER as i64)),
    ];
    for (name, value) in values {
        bind(machine, name, value);
    }
}

fn bind(machine: &mut Machine, name: &str, value: Value) {
    let sym = machine.intern(name);
    // the flat obarray always accepts definitions
    let _ = machine.module_define(&Value::FALSE, sym, value);
}

#[cfg(test)]
mod hook_ops_test;
#[cfg(test)]
mod module_ops_test;
