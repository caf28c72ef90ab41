//! Canned CPS programs that drive the control engine end to end.
//!
//! Each scenario builds its procedures as host closures, runs them on a
//! caller-supplied [`Machine`] and returns a transcript: one line per
//! observable event, in the order the events happened. The CLI prints
//! transcripts, the integration tests snapshot them and the benches time
//! them.
use std::{cell::RefCell, rc::Rc};

use crate::runtime::{
    closure::Closure,
    error::RuntimeError,
    value::Value,
    vm::{DEFAULT_ERROR_TAG, Invocation, Machine, Step},
};

mod report;

pub use report::{ScenarioOutcome, ScenarioResult, print_scenario_report, run_scenarios};

type ScenarioFn = fn(&mut Machine) -> Result<Vec<String>, RuntimeError>;

pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    body: ScenarioFn,
}

impl Scenario {
    pub fn run(&self, machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
        (self.body)(machine)
    }
}

pub static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "dynamic-wind",
        summary: "nested winds enter outermost first and leave innermost first",
        body: nested_winds,
    },
    Scenario {
        name: "abort",
        summary: "aborting to a prompt runs leave thunks before the handler",
        body: abort_through_wind,
    },
    Scenario {
        name: "reentry",
        summary: "a captured continuation re-enters its dynamic-wind extent",
        body: continuation_reentry,
    },
    Scenario {
        name: "fluids",
        summary: "fluid bindings nest and are restored on exit",
        body: fluid_bindings,
    },
    Scenario {
        name: "errors",
        summary: "runtime errors are raised to the error prompt",
        body: error_to_prompt,
    },
    Scenario {
        name: "modules",
        summary: "boot, import, shadowing and ambiguous imports",
        body: module_resolution,
    },
    Scenario {
        name: "structs",
        summary: "vtables, layout defaults and applicable structs",
        body: struct_layouts,
    },
];

pub fn find_scenario(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

/// Shared event log written by the procedures of one scenario.
#[derive(Clone, Default)]
struct Transcript(Rc<RefCell<Vec<String>>>);

impl Transcript {
    fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    /// A thunk that records `label` and returns nothing.
    fn note(&self, label: &'static str) -> Value {
        let transcript = self.clone();
        host(label, move |_, inv| {
            transcript.push(label);
            Ok(Step::Return {
                k: inv.k,
                values: vec![],
            })
        })
    }

    fn finish(self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

fn host<F>(name: &'static str, func: F) -> Value
where
    F: Fn(&mut Machine, Invocation) -> Result<Step, RuntimeError> + 'static,
{
    Value::Closure(Rc::new(Closure::host(name, func)))
}

fn global(machine: &mut Machine, name: &str) -> Result<Value, RuntimeError> {
    let sym = machine.intern(name);
    Ok(machine.lookup(sym)?.get())
}

fn render_all(machine: &Machine, values: &[Value]) -> String {
    values
        .iter()
        .map(|value| machine.render(value))
        .collect::<Vec<_>>()
        .join(" ")
}

fn nested_winds(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let wind = global(machine, "dynamic-wind")?;

    let inner_wind = wind.clone();
    let inner_log = log.clone();
    let outer_body = host("outer-body", move |_, inv| {
        let body_log = inner_log.clone();
        let inner_body = host("inner-body", move |_, inv| {
            body_log.push("body");
            Ok(Step::Return {
                k: inv.k,
                values: vec![Value::Integer(42)],
            })
        });
        Ok(Step::Call(Invocation::new(
            inner_wind.clone(),
            inv.k,
            vec![
                inner_log.note("enter inner"),
                inner_body,
                inner_log.note("leave inner"),
            ],
        )))
    });

    let result = machine.call(
        wind,
        vec![log.note("enter outer"), outer_body, log.note("leave outer")],
    )?;
    log.push(format!("result {}", render_all(machine, &result)));
    Ok(log.finish())
}

fn abort_through_wind(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let wind = global(machine, "dynamic-wind")?;
    let with_prompt = global(machine, "call-with-prompt")?;
    let abort = global(machine, "abort-to-prompt")?;
    let tag = machine.symbol("escape");

    let abort_tag = tag.clone();
    let body_log = log.clone();
    let body = host("body", move |_, inv| {
        body_log.push("aborting");
        Ok(Step::Call(Invocation::new(
            abort.clone(),
            inv.k,
            vec![abort_tag.clone(), Value::Integer(7)],
        )))
    });
    let wind_log = log.clone();
    let thunk = host("thunk", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            wind.clone(),
            inv.k,
            vec![
                wind_log.note("enter"),
                body.clone(),
                wind_log.note("leave"),
            ],
        )))
    });
    let handler_log = log.clone();
    let handler = host("handler", move |machine, inv| {
        let resumable = inv.args.first().is_some_and(Value::is_procedure);
        handler_log.push(format!(
            "handler {} resumable={}",
            render_all(machine, inv.args.get(1..).unwrap_or(&[])),
            resumable
        ));
        Ok(Step::Return {
            k: inv.k,
            values: inv.args.get(1..).unwrap_or(&[]).to_vec(),
        })
    });

    let result = machine.call(with_prompt, vec![tag, thunk, handler])?;
    log.push(format!("result {}", render_all(machine, &result)));
    log.push(format!("depth {}", machine.dynstack_depth()));
    Ok(log.finish())
}

fn continuation_reentry(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let saved: Rc<RefCell<Option<Value>>> = Rc::default();
    let wind = global(machine, "dynamic-wind")?;
    let call_cc = global(machine, "call/cc")?;

    let slot = saved.clone();
    let receiver = host("receiver", move |_, inv| {
        *slot.borrow_mut() = inv.args.first().cloned();
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(1)],
        })
    });
    let body = host("body", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            call_cc.clone(),
            inv.k,
            vec![receiver.clone()],
        )))
    });

    let first = machine.call(wind, vec![log.note("enter"), body, log.note("leave")])?;
    log.push(format!("returned {}", render_all(machine, &first)));

    let Some(k) = saved.borrow().clone() else {
        return Err(RuntimeError::unimplemented("continuation was not captured"));
    };
    for n in 2..=3 {
        let again = machine.call(k.clone(), vec![Value::Integer(n)])?;
        log.push(format!("returned {}", render_all(machine, &again)));
    }
    Ok(log.finish())
}

fn fluid_bindings(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let make_fluid = global(machine, "make-fluid")?;
    let with_fluid = global(machine, "with-fluid*")?;
    let fluid = machine.call1(make_fluid, vec![Value::Integer(1)])?;
    let Value::Fluid(cell) = fluid.clone() else {
        return Err(RuntimeError::WrongType {
            procedure: "make-fluid",
            expected: "Fluid",
            got: fluid.type_name(),
        });
    };
    log.push(format!("outside {}", machine.render(&cell.get())));

    let inner_cell = cell.clone();
    let inner_log = log.clone();
    let inner = host("inner", move |machine, inv| {
        inner_log.push(format!("nested {}", machine.render(&inner_cell.get())));
        Ok(Step::Return {
            k: inv.k,
            values: vec![],
        })
    });
    let outer_cell = cell.clone();
    let outer_log = log.clone();
    let outer_fluid = fluid.clone();
    let nested_with_fluid = with_fluid.clone();
    let outer = host("outer", move |machine, inv| {
        outer_log.push(format!("bound {}", machine.render(&outer_cell.get())));
        Ok(Step::Call(Invocation::new(
            nested_with_fluid.clone(),
            inv.k,
            vec![outer_fluid.clone(), Value::Integer(3), inner.clone()],
        )))
    });

    machine.call(with_fluid, vec![fluid, Value::Integer(2), outer])?;
    log.push(format!("restored {}", machine.render(&cell.get())));
    Ok(log.finish())
}

fn error_to_prompt(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let with_prompt = global(machine, "call-with-prompt")?;
    let wind = global(machine, "dynamic-wind")?;
    let tag = machine.symbol(DEFAULT_ERROR_TAG);

    let body = host("body", |_, inv| {
        Ok(Step::Call(Invocation::new(Value::Integer(42), inv.k, vec![])))
    });
    let wind_log = log.clone();
    let thunk = host("thunk", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            wind.clone(),
            inv.k,
            vec![
                wind_log.note("enter"),
                body.clone(),
                wind_log.note("leave"),
            ],
        )))
    });
    let handler_log = log.clone();
    let handler = host("handler", move |machine, inv| {
        let caught = render_all(machine, inv.args.get(1..).unwrap_or(&[]));
        handler_log.push(format!("caught {}", caught));
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::FALSE],
        })
    });

    let result = machine.call(with_prompt, vec![tag, thunk, handler])?;
    log.push(format!("result {}", render_all(machine, &result)));
    Ok(log.finish())
}

fn module_resolution(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    machine.define("early", Value::Integer(0))?;
    machine.boot_standalone()?;
    log.push(format!("booted {}", machine.module_system_booted()));

    let left = named_module(machine, "left");
    let right = named_module(machine, "right");
    let user = named_module(machine, "user");

    let x = machine.intern("x");
    machine.module_define(&left, x, Value::Integer(1))?;
    machine.module_define(&right, x, Value::Integer(2))?;
    machine.module_use(&user, left)?;
    machine.module_use(&user, right)?;
    match machine.module_lookup(&user, x) {
        Ok(var) => log.push(format!("x -> {}", machine.render(&var.get()))),
        Err(err) => log.push(format!("x -> {}", err)),
    }

    machine.module_define(&user, x, Value::Integer(3))?;
    let var = machine.module_lookup(&user, x)?;
    log.push(format!("x -> {} after local define", machine.render(&var.get())));

    let early = machine.intern("early");
    let var = machine.lookup(early)?;
    log.push(format!("early -> {}", machine.render(&var.get())));
    Ok(log.finish())
}

fn named_module(machine: &mut Machine, name: &str) -> Value {
    let name = Value::list(vec![machine.symbol(name)]);
    let module = machine.make_module(name.clone(), vec![]);
    machine.register_module(&name, module.clone());
    module
}

fn struct_layouts(machine: &mut Machine) -> Result<Vec<String>, RuntimeError> {
    let log = Transcript::default();
    let make_vtable = global(machine, "make-vtable")?;
    let make_struct = global(machine, "make-struct/no-tail")?;
    let struct_ref = global(machine, "struct-ref")?;

    let vtable = machine.call1(make_vtable, vec![Value::string("pwuw")])?;
    let a = machine.symbol("a");
    let point = machine.call1(make_struct.clone(), vec![vtable, a])?;
    for index in 0..2 {
        let field = machine.call1(struct_ref.clone(), vec![point.clone(), Value::Integer(index)])?;
        log.push(format!("field {} = {}", index, machine.render(&field)));
    }

    let adder = host("adder", |_, inv| {
        let sum = inv
            .args
            .iter()
            .map(|arg| match arg {
                Value::Integer(n) => *n,
                _ => 0,
            })
            .sum();
        Ok(Step::Return {
            k: inv.k,
            values: vec![Value::Integer(sum)],
        })
    });
    let layout = machine.symbol("pw");
    let applicable = machine.applicable_struct_vtable();
    let child = machine.call1(make_struct.clone(), vec![applicable, layout])?;
    let instance = machine.call1(make_struct, vec![child, adder])?;
    log.push(format!("applicable {}", instance.is_procedure()));
    let sum = machine.call1(instance, vec![Value::Integer(2), Value::Integer(5)])?;
    log.push(format!("applied {}", machine.render(&sum)));
    Ok(log.finish())
}
