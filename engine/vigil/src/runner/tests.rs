use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::config::{ConfigData, Cutoff, ListSpec};
use crate::error::EngineError;
use crate::output::{OutputTarget, SharedBuffer};
use crate::registry::RegistryBuilder;
use crate::reporter::LogFilter;
use pretty_assertions::assert_eq;
use vigil_ir::Counts;

fn config(data: ConfigData) -> Config {
    Config::new(data).unwrap()
}

fn run_logged(data: ConfigData, registry: &TestRegistry) -> (EngineResult<RunReport>, EventLog) {
    let log = EventLog::new();
    let result = Runner::new(config(data), Box::new(log.clone())).run(registry);
    (result, log)
}

fn unit_starts(log: &EventLog) -> Vec<String> {
    log.events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::UnitStarted(info) => Some(info.name),
            _ => None,
        })
        .collect()
}

fn nested() -> TestRegistry {
    let mut builder = RegistryBuilder::new();
    builder.register("nested", "", |ctx| {
        ctx.section("A", "", |ctx| {
            ctx.section("A1", "", |ctx| {
                ctx.check(true, "a1");
                Ok(())
            })?;
            ctx.section("A2", "", |ctx| {
                ctx.check(false, "a2");
                Ok(())
            })
        })
    });
    builder.build().unwrap()
}

#[test]
fn test_nested_sections_run_once_per_leaf() {
    let (result, log) = run_logged(ConfigData::default(), &nested());
    let report = result.unwrap();

    assert_eq!(
        log.render(LogFilter::default()),
        "\\run\n \\group all tests\n  \\tc nested\n   \\section A\n    \\section A1\n    \
         /section A1\n   /section A\n   \\section A\n    \\section A2\n     ExpressionFailed a2\n    \
         /section A2\n   /section A\n  /tc nested\n /group all tests\n/run\n"
    );

    let unit = report.unit("nested").unwrap();
    assert_eq!(unit.executions, 2);
    assert_eq!(unit.leaves, 2);
    assert_eq!(unit.state, UnitState::Exhausted);
    assert_eq!(report.totals.assertions, Counts::new(1, 1));
    assert_eq!(report.totals.test_cases, Counts::new(0, 1));
    assert!(!report.aborted);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_single_failing_assertion() {
    let mut builder = RegistryBuilder::new();
    builder.register("fails", "", |ctx| {
        crate::check_eq!(ctx, 1 + 1, 3);
        Ok(())
    });
    let (result, log) = run_logged(ConfigData::default(), &builder.build().unwrap());
    let report = result.unwrap();

    assert_eq!(report.totals.assertions, Counts::new(0, 1));
    let failed: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::Assertion(record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind(), vigil_ir::ResultKind::ExpressionFailed);
    assert_eq!(failed[0].expanded(), Some("2 == 3"));
}

#[test]
fn test_cutoff_skips_remaining_units() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("first", "", |ctx| {
            ctx.check(false, "first fails");
            ctx.check(false, "not recorded");
            Ok(())
        })
        .register("second", "", |ctx| {
            ctx.check(true, "never runs");
            Ok(())
        });
    let data = ConfigData {
        cutoff: Cutoff::AfterFailures(1),
        ..ConfigData::default()
    };
    let (result, log) = run_logged(data, &builder.build().unwrap());
    let report = result.unwrap();

    assert!(report.aborted);
    assert_eq!(unit_starts(&log), vec!["first"]);
    assert_eq!(report.unit("first").unwrap().state, UnitState::Aborted);
    assert_eq!(report.unit("second").unwrap().state, UnitState::Pending);
    assert_eq!(report.started().count(), 1);
    assert_eq!(report.totals.assertions, Counts::new(0, 1));
    assert!(matches!(log.events().last(), Some(ReportEvent::RunEnded(_, true))));
}

#[test]
fn test_filters_select_units_in_order() {
    let mut builder = RegistryBuilder::new();
    for name in ["foo1", "baz", "foobar", "bar"] {
        builder.register(name, "", |ctx| {
            ctx.succeed("ran");
            Ok(())
        });
    }
    let data = ConfigData {
        test_specs: vec!["foo*".into(), "bar".into()],
        ..ConfigData::default()
    };
    let (result, log) = run_logged(data, &builder.build().unwrap());
    let report = result.unwrap();

    assert_eq!(unit_starts(&log), vec!["foo1", "foobar", "bar"]);
    assert_eq!(report.totals.test_cases, Counts::new(3, 0));
    assert!(report.all_passed());
}

#[test]
fn test_run_matching_reports_a_group() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("foo/pass", "", |ctx| {
            ctx.check(true, "ok");
            Ok(())
        })
        .register("foo/fail", "", |ctx| {
            ctx.check(false, "no");
            Ok(())
        })
        .register("other", "", |_ctx| Ok(()));
    let registry = builder.build().unwrap();

    let log = EventLog::new();
    let mut runner = Runner::new(Config::default(), Box::new(log.clone()));
    assert_eq!(runner.run_matching(&registry, "foo/*").unwrap(), 2);
    assert_eq!(runner.run_matching(&registry, "missing").unwrap(), 0);
    let report = runner.finish();

    let group_totals: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::GroupEnded(name, totals) => Some((name, totals)),
            _ => None,
        })
        .collect();
    assert_eq!(
        group_totals,
        vec![
            (
                "foo/*".to_string(),
                Totals {
                    assertions: Counts::new(1, 1),
                    test_cases: Counts::new(1, 1),
                }
            ),
            ("missing".to_string(), Totals::ZERO),
        ]
    );
    assert_eq!(report.totals.test_cases, Counts::new(1, 1));
    assert!(matches!(log.events().first(), Some(ReportEvent::RunStarted)));
}

#[test]
fn test_output_is_captured_per_unit() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("talks", "", |ctx| {
            ctx.section("one", "", |ctx| {
                let _ = writeln!(ctx.out(), "from one");
                Ok(())
            })?;
            ctx.section("two", "", |_ctx| {
                crate::capture_print!("from two");
                Ok(())
            })
        })
        .register("quiet", "", |_ctx| Ok(()));
    let (result, log) = run_logged(ConfigData::default(), &builder.build().unwrap());
    result.unwrap();

    let outputs: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::UnitEnded(summary) => Some((summary.info.name, summary.output)),
            _ => None,
        })
        .collect();
    assert_eq!(
        outputs,
        vec![
            ("talks".to_string(), "from one\nfrom two\n".to_string()),
            ("quiet".to_string(), String::new()),
        ]
    );
}

#[test]
fn test_uncaught_condition_ends_the_session() {
    let mut builder = RegistryBuilder::new();
    builder.register("explodes", "", |ctx| {
        ctx.section("inner", "", |_ctx| panic!("boom"))
    });
    let data = ConfigData {
        allow_throws: false,
        ..ConfigData::default()
    };
    let (result, log) = run_logged(data, &builder.build().unwrap());

    match result {
        Err(EngineError::UncaughtCondition { unit, message }) => {
            assert_eq!(unit, "explodes");
            assert_eq!(message, "boom");
        }
        other => panic!("expected an uncaught condition, got {other:?}"),
    }
    let events = log.events();
    assert!(events.iter().any(|e| matches!(e, ReportEvent::UnitEnded(_))));
    assert!(matches!(events.last(), Some(ReportEvent::RunEnded(..))));
}

#[test]
fn test_allowed_condition_is_a_failed_assertion() {
    let mut builder = RegistryBuilder::new();
    builder.register("explodes", "", |ctx| {
        ctx.section("inner", "", |_ctx| panic!("boom"))?;
        ctx.section("sibling", "", |ctx| {
            ctx.check(true, "still runs");
            Ok(())
        })
    });
    let (result, _log) = run_logged(ConfigData::default(), &builder.build().unwrap());
    let report = result.unwrap();

    assert_eq!(report.totals.assertions, Counts::new(1, 1));
    assert_eq!(report.unit("explodes").unwrap().executions, 2);
}

#[test]
fn test_shifting_checkpoints_are_rejected() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let mut builder = RegistryBuilder::new();
    builder.register("shifting", "", move |ctx| {
        let run = counter.fetch_add(1, Ordering::SeqCst);
        ctx.section("A", "", |_ctx| Ok(()))?;
        ctx.section("B", "", |_ctx| Ok(()))?;
        if run > 0 {
            ctx.section("C", "", |_ctx| Ok(()))?;
        }
        Ok(())
    });
    let (result, _log) = run_logged(ConfigData::default(), &builder.build().unwrap());

    match result {
        Err(EngineError::UnstableCheckpoints { unit, path }) => {
            assert_eq!(unit, "shifting");
            assert_eq!(path, "C");
        }
        other => panic!("expected unstable checkpoints, got {other:?}"),
    }
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_parallel_run_reports_like_sequential() {
    let mut builder = RegistryBuilder::new();
    for unit in 0..6_i32 {
        builder.register(format!("unit{unit}"), "", move |ctx| {
            ctx.section("even", "", |ctx| {
                crate::check_eq!(ctx, unit % 2, 0);
                Ok(())
            })?;
            ctx.section("small", "", |ctx| {
                crate::check!(ctx, unit < 3);
                Ok(())
            })
        });
    }
    let registry = builder.build().unwrap();

    let (sequential, sequential_log) = run_logged(ConfigData::default(), &registry);
    let parallel_data = ConfigData {
        parallel: true,
        ..ConfigData::default()
    };
    let (parallel, parallel_log) = run_logged(parallel_data, &registry);

    assert_eq!(sequential_log.events(), parallel_log.events());
    let (sequential, parallel) = (sequential.unwrap(), parallel.unwrap());
    assert_eq!(sequential.totals, parallel.totals);
    assert_eq!(parallel.totals.test_cases, Counts::new(2, 4));
}

#[test]
fn test_parallel_fatal_error_reports_like_sequential() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("first", "", |ctx| {
            ctx.check(true, "runs");
            Ok(())
        })
        .register("boom", "", |ctx| {
            ctx.check(true, "before");
            panic!("boom")
        })
        .register("third", "", |ctx| {
            ctx.check(true, "never reported");
            Ok(())
        });
    let registry = builder.build().unwrap();

    let mut logs = Vec::new();
    for parallel in [false, true] {
        let data = ConfigData {
            allow_throws: false,
            parallel,
            ..ConfigData::default()
        };
        let (result, log) = run_logged(data, &registry);
        assert!(matches!(
            result,
            Err(EngineError::UncaughtCondition { ref unit, .. }) if unit == "boom"
        ));
        assert_eq!(unit_starts(&log), vec!["first", "boom"]);
        logs.push(log);
    }
    assert_eq!(logs[0].events(), logs[1].events());
    assert!(logs[1]
        .events()
        .iter()
        .any(|e| matches!(e, ReportEvent::UnitEnded(summary) if summary.info.name == "boom")));
}

#[test]
fn test_run_reports_the_configured_name_as_a_group() {
    let data = ConfigData {
        name: "self test".into(),
        ..ConfigData::default()
    };
    let (result, log) = run_logged(data, &nested());
    let report = result.unwrap();

    let events = log.events();
    assert!(matches!(events.first(), Some(ReportEvent::RunStarted)));
    assert_eq!(events[1], ReportEvent::GroupStarted("self test".to_string()));
    let group_totals: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ReportEvent::GroupEnded(name, totals) => Some((name.as_str(), *totals)),
            _ => None,
        })
        .collect();
    assert_eq!(group_totals, vec![("self test", report.totals)]);
}

#[test]
fn test_vanishing_checkpoint_is_non_terminating() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let mut builder = RegistryBuilder::new();
    builder.register("vanishing", "", move |ctx| {
        let run = counter.fetch_add(1, Ordering::SeqCst);
        ctx.section("A", "", |_ctx| Ok(()))?;
        if run == 0 {
            ctx.section("B", "", |_ctx| Ok(()))?;
        }
        Ok(())
    });
    let (result, log) = run_logged(ConfigData::default(), &builder.build().unwrap());

    match result {
        Err(EngineError::NonTerminating {
            unit,
            executions,
            checkpoints,
        }) => {
            assert_eq!(unit, "vanishing");
            assert_eq!(executions, 4);
            assert_eq!(checkpoints, 3);
        }
        other => panic!("expected a non-terminating unit, got {other:?}"),
    }
    assert_eq!(runs.load(Ordering::SeqCst), 4);
    let events = log.events();
    assert!(events.iter().any(|e| matches!(e, ReportEvent::UnitEnded(_))));
    assert!(matches!(events.last(), Some(ReportEvent::RunEnded(..))));
}

#[test]
fn test_fatal_unit_stays_running_in_the_report() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("explodes", "", |_ctx| panic!("boom"))
        .register("after", "", |_ctx| Ok(()));
    let data = ConfigData {
        allow_throws: false,
        ..ConfigData::default()
    };
    let mut runner = Runner::new(config(data), Box::new(EventLog::new()));
    assert!(runner.run_matching(&builder.build().unwrap(), "*").is_err());
    let report = runner.finish();

    assert_eq!(report.units.len(), 1);
    let unit = report.unit("explodes").unwrap();
    assert_eq!(unit.state, UnitState::Running);
    assert!(!unit.state.is_finished());
    assert_eq!(unit.executions, 1);
    assert_eq!(unit.leaves, 0);
}

#[test]
fn test_from_registry_rejects_unknown_reporter() {
    let data = ConfigData {
        reporter: "junit".into(),
        ..ConfigData::default()
    };
    let result = Runner::from_registry(config(data), &ReporterRegistry::with_builtins());
    assert!(matches!(
        result,
        Err(EngineError::UnknownReporter { ref name, .. }) if name == "junit"
    ));
}

#[test]
fn test_run_session_writes_to_configured_output() {
    let buffer = SharedBuffer::new();
    let data = ConfigData {
        reporter: "log".into(),
        output: OutputTarget::Buffer(buffer.clone()),
        ..ConfigData::default()
    };
    let report = run_session(config(data), &nested(), &ReporterRegistry::with_builtins()).unwrap();

    assert_eq!(report.totals.assertions, Counts::new(1, 1));
    let text = buffer.contents();
    assert!(text.starts_with("\\run\n \\group all tests\n  \\tc nested\n"));
    assert!(text.ends_with("  /tc nested\n /group all tests\n/run\n"));
}

#[test]
fn test_run_session_lists_instead_of_running() {
    let buffer = SharedBuffer::new();
    let data = ConfigData {
        list: ListSpec::TESTS,
        output: OutputTarget::Buffer(buffer.clone()),
        ..ConfigData::default()
    };
    let report = run_session(config(data), &nested(), &ReporterRegistry::with_builtins()).unwrap();

    assert!(report.units.is_empty());
    assert_eq!(
        buffer.contents(),
        "Matching test cases:\n  nested\n1 matching test case\n"
    );
}
