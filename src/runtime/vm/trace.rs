use crate::runtime::value::Value;

use super::{Machine, Step};

impl Machine {
    pub(super) fn trace_step(&self, step: &Step) {
        println!("{}", self.format_step(step));
    }

    /// One-line description of a trampoline step, as printed by `--trace`.
    pub(super) fn format_step(&self, step: &Step) -> String {
        let depth = self.dynstack.depth();
        match step {
            Step::Call(invocation) => format!(
                "CALL   {} {} dyn={}",
                self.callee_name(&invocation.callee),
                self.format_values(&invocation.args),
                depth
            ),
            Step::Return { k, values } => format!(
                "RETURN {} {} dyn={}",
                self.callee_name(k),
                self.format_values(values),
                depth
            ),
            Step::Halt(values) => format!("HALT   {} dyn={}", self.format_values(values), depth),
        }
    }

    /// Line printed by `--trace` for a direct primitive application.
    pub(super) fn format_primop(&self, name: &str, args: &[Value]) -> String {
        format!(
            "PRIM   {} {} dyn={}",
            name,
            self.format_values(args),
            self.dynstack.depth()
        )
    }

    fn callee_name(&self, callee: &Value) -> String {
        match callee {
            Value::Closure(closure) => closure.display_name().to_string(),
            Value::Struct(_) => "<applicable-struct>".to_string(),
            other => self.render(other),
        }
    }

    fn format_values(&self, values: &[Value]) -> String {
        let items: Vec<String> = values.iter().map(|v| self.render(v)).collect();
        format!("[{}]", items.join(", "))
    }
}
