//! Run orchestration.
//!
//! The runner selects test cases by name, then drives each one through
//! repeated executions until its checkpoint tree is exhausted:
//!
//! ```text
//! Pending -> Running -> Running -> ... -> Exhausted
//!                   \-> Aborted   (failure cutoff tripped)
//! ```
//!
//! Each execution gets a fresh `TestContext` and its own output capture
//! scope. The checkpoint tracker persists across the executions of one
//! unit and is discarded afterwards.
//!
//! Units run in registration order. Once the cutoff trips, the current
//! execution finishes and no further unit starts. With parallel execution
//! enabled (and no cutoff), units run on a scoped thread pool, each into its
//! own event log; the logs are replayed in registration order so the
//! reporter sees the same sequence as a sequential run.

mod report;

pub use report::{RunReport, UnitReport, UnitState};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use vigil_ir::Totals;

use crate::capture::ResultCapture;
use crate::checkpoint::CheckpointTracker;
use crate::config::Config;
use crate::context::TestContext;
use crate::error::{
    non_terminating, uncaught_condition, unstable_checkpoints, EngineError, EngineResult, Failure,
    Outcome,
};
use crate::filter::TestSpecs;
use crate::listing::write_listing;
use crate::output::OutputScope;
use crate::registry::{global, TestCase, TestRegistry};
use crate::reporter::{EventLog, ReportEvent, Reporter, ReporterRegistry};

/// Drives test cases through the engine and into a reporter.
pub struct Runner {
    config: Config,
    capture: ResultCapture,
    units: Vec<UnitReport>,
    started: Instant,
}

impl Runner {
    /// Runner reporting to an explicit reporter.
    pub fn new(config: Config, reporter: Box<dyn Reporter>) -> Self {
        let capture = ResultCapture::new(reporter, &config);
        Runner {
            config,
            capture,
            units: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Runner using the configured reporter, writing to the configured
    /// output.
    pub fn from_registry(config: Config, reporters: &ReporterRegistry) -> EngineResult<Self> {
        let sink = config.output().open()?;
        let reporter = reporters.create(config.reporter_name(), sink)?;
        Ok(Runner::new(config, reporter))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Totals accumulated so far.
    pub fn totals(&self) -> Totals {
        self.capture.totals()
    }

    /// Run every test case selected by the configured specs inside a group
    /// named after the run, and finish.
    pub fn run(mut self, registry: &TestRegistry) -> EngineResult<RunReport> {
        let specs = self.config.test_specs().clone();
        let name = self.config.name().to_string();
        tracing::debug!(
            name,
            specs = ?specs.patterns().collect::<Vec<_>>(),
            "run started"
        );
        if let Err(e) = self.run_group(registry, &name, &specs) {
            self.capture.run_ended();
            return Err(e);
        }
        Ok(self.finish())
    }

    /// Run the test cases matching one ad-hoc spec inside a reporter
    /// group. Returns how many test cases matched. May be called several
    /// times before `finish`.
    pub fn run_matching(&mut self, registry: &TestRegistry, pattern: &str) -> EngineResult<usize> {
        let specs = TestSpecs::parse([pattern])?;
        self.run_group(registry, pattern, &specs)
    }

    /// Run the selected test cases between `group_started` and
    /// `group_ended`. The group is closed even when a unit fails fatally.
    fn run_group(
        &mut self,
        registry: &TestRegistry,
        name: &str,
        specs: &TestSpecs,
    ) -> EngineResult<usize> {
        let before = self.capture.totals();
        self.capture.group_started(name);
        let matched = self.run_selected(registry, specs);
        let contributed = self.capture.totals() - before;
        self.capture.group_ended(name, &contributed);
        matched
    }

    /// Report the end of the run and return the report.
    pub fn finish(mut self) -> RunReport {
        self.capture.run_ended();
        let report = RunReport {
            totals: self.capture.totals(),
            units: self.units,
            aborted: self.capture.is_aborting(),
            duration: self.started.elapsed(),
        };
        tracing::debug!(
            passed = report.totals.assertions.passed,
            failed = report.totals.assertions.failed,
            aborted = report.aborted,
            "run finished"
        );
        report
    }

    fn run_selected(&mut self, registry: &TestRegistry, specs: &TestSpecs) -> EngineResult<usize> {
        let selected: Vec<&TestCase> = registry.matching(specs).collect();
        self.capture.run_started();
        if selected.is_empty() {
            tracing::debug!("no test cases matched");
            return Ok(0);
        }
        if self.config.runs_in_parallel() && selected.len() > 1 {
            self.run_parallel(&selected)?;
        } else {
            self.run_sequential(&selected)?;
        }
        Ok(selected.len())
    }

    fn run_sequential(&mut self, selected: &[&TestCase]) -> EngineResult<()> {
        for (index, test) in selected.iter().enumerate() {
            if self.capture.is_aborting() {
                tracing::debug!(
                    remaining = selected.len() - index,
                    "cutoff reached; skipping remaining test cases"
                );
                self.units
                    .extend(selected[index..].iter().map(|t| UnitReport::pending(t.name())));
                break;
            }
            let (report, result) = run_unit(&mut self.capture, test, self.config.allow_throws());
            self.units.push(report);
            result?;
        }
        Ok(())
    }

    /// Run units on a scoped thread pool, then replay them in order.
    ///
    /// Each unit records into its own `EventLog` through a detached
    /// capture, so worker threads share nothing but the configuration.
    /// After a fatal error, units later in registration order are not
    /// started, and replay stops after the failing unit, as in a sequential
    /// run.
    fn run_parallel(&mut self, selected: &[&TestCase]) -> EngineResult<()> {
        let config = &self.config;
        let first_fatal = AtomicUsize::new(usize::MAX);
        let run = |index: usize, test: &TestCase| {
            if index > first_fatal.load(Ordering::Acquire) {
                return None;
            }
            let isolated = run_isolated(config, test);
            if isolated.result.is_err() {
                first_fatal.fetch_min(index, Ordering::AcqRel);
            }
            Some(isolated)
        };

        let results: Vec<Option<IsolatedUnit>> = rayon::ThreadPoolBuilder::new()
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    selected
                        .par_iter()
                        .enumerate()
                        .map(|(index, test)| run(index, *test))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), running sequentially");
                selected
                    .iter()
                    .enumerate()
                    .map(|(index, test)| run(index, *test))
                    .collect()
            });

        // Units before the first fatal one are never skipped, so replay
        // ends at the first gap or error.
        for isolated in results.into_iter().map_while(|unit| unit) {
            self.capture.replay(&isolated.events, isolated.report.totals);
            self.units.push(isolated.report);
            isolated.result?;
        }
        Ok(())
    }
}

/// A unit executed away from the main run, with everything it reported.
struct IsolatedUnit {
    report: UnitReport,
    result: EngineResult<()>,
    events: Vec<ReportEvent>,
}

/// Run one unit into a private event log.
fn run_isolated(config: &Config, test: &TestCase) -> IsolatedUnit {
    let log = EventLog::new();
    let mut capture = ResultCapture::detached(Box::new(log.clone()), config);
    let (report, result) = run_unit(&mut capture, test, config.allow_throws());
    IsolatedUnit {
        report,
        result,
        events: log.take(),
    }
}

/// Execute one unit until its checkpoint tree is exhausted or the cutoff
/// trips.
///
/// The unit is always closed on the reporter and always yields a report,
/// including when a fatal error ends it; such a unit stays `Running`.
fn run_unit(
    capture: &mut ResultCapture,
    test: &TestCase,
    allow_throws: bool,
) -> (UnitReport, EngineResult<()>) {
    let span = tracing::debug_span!("unit", name = test.name());
    let _entered = span.enter();
    let start = Instant::now();

    capture.unit_started(test.info());
    let mut tracker = CheckpointTracker::new();
    let mut output = String::new();
    let mut state = UnitState::Running;

    let result = loop {
        let outcome = execute_once(capture, &mut tracker, test, allow_throws, &mut output);

        if let Some(path) = tracker.take_violation() {
            break Err(unstable_checkpoints(test.name(), &path));
        }
        if let Err(Failure::Raised(message)) = &outcome {
            break Err(uncaught_condition(test.name(), message));
        }
        if capture.is_aborting() {
            state = UnitState::Aborted;
            break Ok(());
        }
        if tracker.is_exhausted() {
            state = UnitState::Exhausted;
            break Ok(());
        }
        if tracker.exceeded_execution_bound() {
            break Err(non_terminating(
                test.name(),
                tracker.executions(),
                tracker.checkpoint_count(),
            ));
        }
    };

    let executions = tracker.executions();
    let leaves = tracker.tree().leaf_paths().len();
    let totals = capture.unit_ended(test.info(), output, executions);
    tracing::debug!(?state, executions, leaves, failed = totals.assertions.failed, "unit finished");

    let report = UnitReport {
        name: test.name().to_string(),
        state,
        executions,
        leaves,
        totals,
        duration: start.elapsed(),
    };
    (report, result)
}

/// One execution of the body, inside its own output scope.
fn execute_once(
    capture: &mut ResultCapture,
    tracker: &mut CheckpointTracker,
    test: &TestCase,
    allow_throws: bool,
    output: &mut String,
) -> Outcome {
    tracker.start_execution();
    let scope = OutputScope::acquire();
    let outcome = TestContext::new(capture, tracker, allow_throws).run_body(test);
    output.push_str(&scope.release());
    tracker.finish_execution(outcome.is_err());
    tracing::trace!(
        execution = tracker.executions(),
        ok = outcome.is_ok(),
        "execution finished"
    );
    outcome
}

/// Run a whole session: list if the configuration asks for a listing,
/// otherwise run the selected test cases with the configured reporter.
pub fn run_session(
    config: Config,
    tests: &TestRegistry,
    reporters: &ReporterRegistry,
) -> EngineResult<RunReport> {
    if config.list().wants_listing() {
        let mut sink = config.output().open()?;
        write_listing(&config, tests, reporters, &mut sink);
        return Ok(RunReport::default());
    }
    Runner::from_registry(config, reporters)?.run(tests)
}

/// `run_session` over the process-wide registry published with
/// `registry::install`.
pub fn run_installed(config: Config, reporters: &ReporterRegistry) -> EngineResult<RunReport> {
    let tests = global().ok_or(EngineError::RegistryNotInstalled)?;
    run_session(config, tests, reporters)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
