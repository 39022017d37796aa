use super::*;
use crate::error::EngineError;
use pretty_assertions::assert_eq;

fn selected<'a>(specs: &TestSpecs, names: &[&'a str]) -> Vec<&'a str> {
    names.iter().copied().filter(|n| specs.matches(n)).collect()
}

#[test]
fn test_empty_specs_match_everything() {
    let specs = TestSpecs::all();
    assert!(specs.is_empty());
    assert!(specs.matches("anything at all"));
    assert!(specs.matches(""));
}

#[test]
fn test_any_spec_selects() {
    let specs = TestSpecs::parse(["foo*", "bar"]).unwrap();
    assert_eq!(
        selected(&specs, &["foo1", "foobar", "bar", "baz"]),
        vec!["foo1", "foobar", "bar"]
    );
}

#[test]
fn test_spec_matches_whole_name() {
    let specs = TestSpecs::parse(["bar"]).unwrap();
    assert!(!specs.matches("barn"));
    assert!(!specs.matches("crowbar"));
}

#[test]
fn test_grouped_names() {
    let specs = TestSpecs::parse(["succeeding/*", "failing/?xceptions"]).unwrap();
    assert_eq!(
        selected(
            &specs,
            &["succeeding/one", "failing/exceptions", "failing/other", "misc"]
        ),
        vec!["succeeding/one", "failing/exceptions"]
    );
}

#[test]
fn test_patterns_round_trip_source() {
    let specs = TestSpecs::parse(vec!["a*".to_string(), "b".to_string()]).unwrap();
    assert_eq!(specs.patterns().collect::<Vec<_>>(), vec!["a*", "b"]);
}

#[test]
fn test_malformed_spec_is_rejected() {
    let err = TestSpecs::parse(["ok", "[unclosed"]).unwrap_err();
    match err {
        EngineError::InvalidTestSpec { pattern, .. } => assert_eq!(pattern, "[unclosed"),
        other => panic!("unexpected error: {other}"),
    }
}
