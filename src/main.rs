use std::env;

use skein::{
    runtime::{leak_detector, vm::Machine},
    scenarios::{SCENARIOS, find_scenario, print_scenario_report, run_scenarios},
};
use tracing_subscriber::EnvFilter;

fn main() {
    let mut args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|arg| arg == "--verbose");
    let leak_detector = args.iter().any(|arg| arg == "--leak-detector");
    let trace = args.iter().any(|arg| arg == "--trace");
    let no_frame_gc = args.iter().any(|arg| arg == "--no-frame-gc");
    if verbose {
        args.retain(|arg| arg != "--verbose");
    }
    if leak_detector {
        args.retain(|arg| arg != "--leak-detector");
    }
    if trace {
        args.retain(|arg| arg != "--trace");
    }
    if no_frame_gc {
        args.retain(|arg| arg != "--no-frame-gc");
    }
    let frame_gc_threshold = match extract_frame_gc_threshold(&mut args) {
        Some(value) => value,
        None => return,
    };

    if verbose {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skein=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let options = MachineOptions {
        trace,
        no_frame_gc,
        frame_gc_threshold,
    };

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => {
            print_help();
        }
        "demo" => {
            if args.len() < 3 {
                eprintln!("Usage: skein demo <name>");
                return;
            }
            run_demo(&args[2], &options);
            if leak_detector {
                print_leak_stats();
            }
        }
        "demos" => {
            let results = run_scenarios(SCENARIOS, || options.machine());
            let ok = print_scenario_report(&results, false);
            if leak_detector {
                print_leak_stats();
            }
            if !ok {
                std::process::exit(1);
            }
        }
        "list" => {
            for scenario in SCENARIOS {
                println!("  {:<14} {}", scenario.name, scenario.summary);
            }
        }
        other => {
            eprintln!("Error: unknown command `{}`", other);
            print_help();
        }
    }
}

struct MachineOptions {
    trace: bool,
    no_frame_gc: bool,
    frame_gc_threshold: Option<usize>,
}

impl MachineOptions {
    fn machine(&self) -> Machine {
        let mut machine = Machine::new();
        machine.set_trace(self.trace);
        machine.set_frame_gc_enabled(!self.no_frame_gc);
        if let Some(threshold) = self.frame_gc_threshold {
            machine.set_frame_gc_threshold(threshold);
        }
        machine
    }
}

fn print_help() {
    println!(
        "\
Skein CLI

Usage:
  skein demo <name>     Run one scenario and print its transcript
  skein demos           Run every scenario and report pass/fail
  skein list            List the available scenarios
  skein help

Flags:
  --verbose                  Log control transfers to stderr (RUST_LOG overrides)
  --trace                    Print every trampoline step
  --leak-detector            Print allocation counts as JSON after the run
  --no-frame-gc              Never collect dynamic-extent frames
  --frame-gc-threshold <n>   Live frames that trigger a collection
  -h, --help                 Show this help message
"
    );
}

fn run_demo(name: &str, options: &MachineOptions) {
    let Some(scenario) = find_scenario(name) else {
        eprintln!("Error: no scenario named `{}`. Try `skein list`.", name);
        std::process::exit(1);
    };
    let mut machine = options.machine();
    match scenario.run(&mut machine) {
        Ok(transcript) => {
            for line in transcript {
                println!("{}", line);
            }
            if options.trace {
                println!(
                    "\n{} steps, {} live frames, {} frame collections",
                    machine.steps(),
                    machine.live_frames(),
                    machine.frame_collections()
                );
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

fn print_leak_stats() {
    let stats = leak_detector::snapshot();
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("\nLeak stats (approx):\n{}", json),
        Err(err) => eprintln!("Error: could not encode leak stats: {}", err),
    }
}

fn extract_frame_gc_threshold(args: &mut Vec<String>) -> Option<Option<usize>> {
    let mut threshold = None;
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--frame-gc-threshold" {
            if i + 1 >= args.len() {
                eprintln!("Usage: skein demo <name> --frame-gc-threshold <n>");
                return None;
            }
            let value = args.remove(i + 1);
            args.remove(i);
            match value.parse::<usize>() {
                Ok(parsed) => {
                    threshold = Some(parsed);
                }
                Err(_) => {
                    eprintln!("Error: --frame-gc-threshold expects a non-negative integer.");
                    return None;
                }
            }
            continue;
        }
        i += 1;
    }
    Some(threshold)
}
