use skein::runtime::vm::Machine;
use skein::scenarios::{SCENARIOS, ScenarioOutcome, find_scenario, run_scenarios};

fn transcript(name: &str) -> String {
    let scenario = find_scenario(name).unwrap_or_else(|| panic!("no scenario named {name}"));
    let mut machine = Machine::new();
    scenario
        .run(&mut machine)
        .unwrap_or_else(|err| panic!("{name}: {err}"))
        .join("\n")
}

#[test]
fn dynamic_wind_transcript() {
    insta::assert_snapshot!(transcript("dynamic-wind"), @r"
    enter outer
    enter inner
    body
    leave inner
    leave outer
    result 42
    ");
}

#[test]
fn abort_transcript() {
    insta::assert_snapshot!(transcript("abort"), @r"
    enter
    aborting
    leave
    handler 7 resumable=true
    result 7
    depth 0
    ");
}

#[test]
fn reentry_transcript() {
    insta::assert_snapshot!(transcript("reentry"), @r"
    enter
    leave
    returned 1
    enter
    leave
    returned 2
    enter
    leave
    returned 3
    ");
}

#[test]
fn fluids_transcript() {
    insta::assert_snapshot!(transcript("fluids"), @r"
    outside 1
    bound 2
    nested 3
    restored 1
    ");
}

#[test]
fn errors_transcript() {
    insta::assert_snapshot!(transcript("errors"), @r#"
    enter
    leave
    caught not-applicable "error[E2005]: NOT APPLICABLE: cannot apply a value of type Integer"
    result #f
    "#);
}

#[test]
fn modules_transcript() {
    insta::assert_snapshot!(transcript("modules"), @r"
    booted true
    x -> error[E2001]: AMBIGUOUS BINDING: `x` is imported from more than one interface
    x -> 3 after local define
    early -> 0
    ");
}

#[test]
fn structs_transcript() {
    insta::assert_snapshot!(transcript("structs"), @r"
    field 0 = a
    field 1 = 0
    applicable true
    applied 7
    ");
}

#[test]
fn every_scenario_passes_on_a_fresh_machine() {
    let results = run_scenarios(SCENARIOS, Machine::new);
    assert_eq!(results.len(), SCENARIOS.len());
    for result in &results {
        assert!(
            matches!(result.outcome, ScenarioOutcome::Pass(_)),
            "{} failed",
            result.name
        );
    }
}

#[test]
fn scenarios_leave_the_dynamic_stack_empty() {
    for scenario in SCENARIOS {
        let mut machine = Machine::new();
        scenario.run(&mut machine).unwrap();
        assert_eq!(machine.dynstack_depth(), 0, "{}", scenario.name);
    }
}

#[test]
fn scenarios_run_without_frame_collection() {
    for scenario in SCENARIOS {
        let mut machine = Machine::new();
        machine.set_frame_gc_enabled(false);
        assert!(scenario.run(&mut machine).is_ok(), "{}", scenario.name);
        assert_eq!(machine.frame_collections(), 0);
    }
}
