use std::{cell::RefCell, rc::Rc};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use skein::runtime::{
    closure::Closure,
    error::RuntimeError,
    value::Value,
    vm::{Invocation, Machine, Step},
};

fn host<F>(name: &'static str, func: F) -> Value
where
    F: Fn(&mut Machine, Invocation) -> Result<Step, RuntimeError> + 'static,
{
    Value::Closure(Rc::new(Closure::host(name, func)))
}

fn global(machine: &mut Machine, name: &str) -> Value {
    let sym = machine.intern(name);
    machine.lookup(sym).unwrap().get()
}

fn noop() -> Value {
    host("noop", |_, inv| {
        Ok(Step::Return {
            k: inv.k,
            values: vec![],
        })
    })
}

/// Wraps `innermost` in `depth` nested dynamic-wind extents.
fn nest_winds(wind: &Value, depth: usize, innermost: Value) -> Value {
    (0..depth).fold(innermost, |body, _| {
        let wind = wind.clone();
        host("wind-layer", move |_, inv| {
            Ok(Step::Call(Invocation::new(
                wind.clone(),
                inv.k,
                vec![noop(), body.clone(), noop()],
            )))
        })
    })
}

/// Captures a continuation `depth` winds deep and returns it.
fn capture_at_depth(machine: &mut Machine, depth: usize) -> Value {
    let wind = global(machine, "dynamic-wind");
    let call_cc = global(machine, "call/cc");
    let saved: Rc<RefCell<Option<Value>>> = Rc::default();

    let slot = saved.clone();
    let receiver = host("receiver", move |_, inv| {
        *slot.borrow_mut() = inv.args.first().cloned();
        Ok(Step::Return {
            k: inv.k,
            values: vec![],
        })
    });
    let capture = host("capture", move |_, inv| {
        Ok(Step::Call(Invocation::new(
            call_cc.clone(),
            inv.k,
            vec![receiver.clone()],
        )))
    });

    let body = nest_winds(&wind, depth, capture);
    machine.call(body, vec![]).unwrap();
    let k = saved.borrow().clone().unwrap();
    k
}

fn bench_reinstate(c: &mut Criterion) {
    let mut group = c.benchmark_group("continuation/reinstate");

    for depth in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut machine = Machine::new();
            let k = capture_at_depth(&mut machine, depth);
            b.iter(|| {
                black_box(machine.call(k.clone(), vec![Value::Integer(1)]).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_abort(c: &mut Criterion) {
    let mut group = c.benchmark_group("continuation/abort");

    for depth in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut machine = Machine::new();
            let wind = global(&mut machine, "dynamic-wind");
            let with_prompt = global(&mut machine, "call-with-prompt");
            let abort = global(&mut machine, "abort-to-prompt");
            let tag = machine.symbol("bench");

            let abort_tag = tag.clone();
            let escape = host("escape", move |_, inv| {
                Ok(Step::Call(Invocation::new(
                    abort.clone(),
                    inv.k,
                    vec![abort_tag.clone(), Value::Integer(0)],
                )))
            });
            let thunk = nest_winds(&wind, depth, escape);
            let handler = host("handler", |_, inv| {
                Ok(Step::Return {
                    k: inv.k,
                    values: inv.args.get(1..).unwrap_or(&[]).to_vec(),
                })
            });

            b.iter(|| {
                let result = machine
                    .call(
                        with_prompt.clone(),
                        vec![tag.clone(), thunk.clone(), handler.clone()],
                    )
                    .unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reinstate, bench_abort);
criterion_main!(benches);
