use std::{env, time::Instant};

use crate::runtime::vm::Machine;

use super::Scenario;

pub enum ScenarioOutcome {
    Pass(Vec<String>),
    Fail(String),
}

pub struct ScenarioResult {
    pub name: &'static str,
    pub elapsed_ms: f64,
    pub outcome: ScenarioOutcome,
}

/// Runs each scenario on a fresh machine from `make_machine`, so runtime
/// knobs set by the caller apply to every run.
pub fn run_scenarios<F>(scenarios: &[Scenario], make_machine: F) -> Vec<ScenarioResult>
where
    F: Fn() -> Machine,
{
    let mut results = Vec::new();

    for scenario in scenarios {
        let mut machine = make_machine();
        let start = Instant::now();
        let outcome = match scenario.run(&mut machine) {
            Ok(transcript) => ScenarioOutcome::Pass(transcript),
            Err(err) => ScenarioOutcome::Fail(err.to_string()),
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(scenario = scenario.name, elapsed_ms, "scenario finished");
        results.push(ScenarioResult {
            name: scenario.name,
            elapsed_ms,
            outcome,
        });
    }

    results
}

/// Prints the scenario report and returns `true` if every scenario ran to
/// completion. Transcripts are printed under each passing scenario when
/// `show_transcripts` is set.
pub fn print_scenario_report(results: &[ScenarioResult], show_transcripts: bool) -> bool {
    let use_color = colors_enabled();
    let mut passed = 0usize;
    let mut failed = 0usize;

    for result in results {
        match &result.outcome {
            ScenarioOutcome::Pass(transcript) => {
                let pass = if use_color {
                    green("PASS")
                } else {
                    "PASS".to_string()
                };
                let timing = if use_color {
                    cyan_dim(&format!("({:.2}ms)", result.elapsed_ms))
                } else {
                    format!("({:.2}ms)", result.elapsed_ms)
                };
                println!("  {}  {:<34} {}", pass, result.name, timing);
                if show_transcripts {
                    for line in transcript {
                        println!("          {}", line);
                    }
                }
                passed += 1;
            }
            ScenarioOutcome::Fail(msg) => {
                let fail = if use_color {
                    red("FAIL")
                } else {
                    "FAIL".to_string()
                };
                println!("  {}  {}", fail, result.name);
                for line in msg.lines() {
                    println!("          {}", line);
                }
                failed += 1;
            }
        }
    }

    let total = passed + failed;
    println!("\n{} scenarios: {} passed, {} failed", total, passed, failed);
    failed == 0
}

fn colors_enabled() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(env::var("TERM").ok().as_deref(), Some("dumb"))
}

fn green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}

fn red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

fn cyan_dim(s: &str) -> String {
    format!("\x1b[36;2m{}\x1b[0m", s)
}
