//! Result capture: the single path from an assertion to totals and reporter.
//!
//! Every outcome recorded by a test body goes through `ResultCapture::record`,
//! which:
//!
//! 1. drops it if the failure cutoff has already tripped
//! 2. counts it in the session totals and in every open checkpoint
//! 3. forwards it to the reporter (unless successful results are excluded)
//! 4. trips the cutoff when the failed count reaches it
//!
//! Lifecycle events (unit and checkpoint boundaries, run start and end) are
//! forwarded in call order, so the reporter sees records in the order the
//! assertions executed.

use std::panic::{self, AssertUnwindSafe};

use smallvec::SmallVec;
use vigil_ir::{CheckpointInfo, Counts, ResultKind, ResultRecord, TestCaseInfo, Totals};

use crate::config::{Config, Cutoff, IncludeResults};
use crate::reporter::{ReportEvent, Reporter, UnitSummary};

/// Routes outcomes into totals and the active reporter.
pub struct ResultCapture {
    reporter: Box<dyn Reporter>,
    totals: Totals,
    include: IncludeResults,
    cutoff: Cutoff,
    break_on_failure: bool,
    tripped: bool,
    run_started: bool,
    /// Assertion counts of the open checkpoints, innermost last.
    sections: SmallVec<[Counts; 8]>,
    /// Totals when the current unit started.
    unit_start: Totals,
}

impl ResultCapture {
    pub fn new(reporter: Box<dyn Reporter>, config: &Config) -> Self {
        ResultCapture {
            reporter,
            totals: Totals::ZERO,
            include: config.include(),
            cutoff: config.cutoff(),
            break_on_failure: config.break_on_failure(),
            tripped: false,
            run_started: false,
            sections: SmallVec::new(),
            unit_start: Totals::ZERO,
        }
    }

    /// Capture for a unit executed away from the main run (on a worker
    /// thread). Run start and end are never reported through it.
    pub fn detached(reporter: Box<dyn Reporter>, config: &Config) -> Self {
        let mut capture = ResultCapture::new(reporter, config);
        capture.run_started = true;
        capture
    }

    /// Report the start of the run. Only the first call reaches the
    /// reporter.
    pub fn run_started(&mut self) {
        if !self.run_started {
            self.run_started = true;
            self.reporter.run_started();
        }
    }

    /// Report the end of the run, if it was started.
    pub fn run_ended(&mut self) {
        if self.run_started {
            self.run_started = false;
            self.reporter.run_ended(&self.totals, self.tripped);
        }
    }

    pub fn group_started(&mut self, name: &str) {
        self.run_started();
        self.reporter.group_started(name);
    }

    pub fn group_ended(&mut self, name: &str, totals: &Totals) {
        self.reporter.group_ended(name, totals);
    }

    pub fn unit_started(&mut self, info: &TestCaseInfo) {
        self.run_started();
        self.unit_start = self.totals;
        self.sections.clear();
        self.reporter.unit_started(info);
    }

    pub fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo) {
        self.sections.push(Counts::ZERO);
        self.reporter.checkpoint_entered(checkpoint);
    }

    pub fn checkpoint_left(&mut self, checkpoint: &CheckpointInfo) {
        let counts = self.sections.pop().unwrap_or_default();
        self.reporter.checkpoint_left(checkpoint, &counts);
    }

    /// Record one outcome.
    pub fn record(&mut self, record: ResultRecord) {
        if self.tripped {
            tracing::trace!(kind = %record.kind(), "result dropped after cutoff");
            return;
        }

        let kind = record.kind();
        self.totals.assertions.record(kind);
        for counts in &mut self.sections {
            counts.record(kind);
        }

        if kind.is_failure() && self.break_on_failure {
            tracing::debug!(
                kind = %kind,
                expression = record.expression().unwrap_or_default(),
                "break on failure"
            );
        }

        let forward = !(kind == ResultKind::Success && self.include == IncludeResults::FailedOnly);
        if forward {
            self.reporter.assertion_result(&record);
        }

        if kind.is_failure() && self.cutoff.is_reached(self.totals.assertions.failed) {
            tracing::warn!(
                failed = self.totals.assertions.failed,
                "failure cutoff reached; remaining test cases will not run"
            );
            self.tripped = true;
        }
    }

    /// Build and record an assertion outcome.
    pub fn record_assertion(
        &mut self,
        kind: ResultKind,
        expression: Option<&str>,
        expanded: Option<String>,
        message: Option<&str>,
    ) {
        let mut record = ResultRecord::new(kind).with_expanded(expanded);
        if let Some(expression) = expression {
            record = record.with_expression(expression);
        }
        if let Some(message) = message {
            record = record.with_message(message);
        }
        self.record(record);
    }

    /// Close the current unit: bump the test-case totals by one passed or
    /// failed unit and report its summary. Returns the unit's contribution.
    pub fn unit_ended(&mut self, info: &TestCaseInfo, output: String, executions: usize) -> Totals {
        let delta = self.totals.unit_delta(&self.unit_start);
        self.totals.test_cases += delta.test_cases;
        let summary = UnitSummary {
            info: info.clone(),
            totals: delta,
            executions,
            output,
            aborted: self.tripped,
        };
        self.reporter.unit_ended(&summary);
        self.sections.clear();
        delta
    }

    /// Deliver events recorded elsewhere (a unit run on another thread)
    /// and merge the totals they contributed.
    pub fn replay(&mut self, events: &[ReportEvent], contributed: Totals) {
        self.run_started();
        for event in events {
            event.replay(self.reporter.as_mut());
        }
        self.totals += contributed;
    }

    /// True once the failure cutoff has tripped.
    pub fn is_aborting(&self) -> bool {
        self.tripped
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Open-checkpoint depth; zero at the body root.
    pub fn section_depth(&self) -> usize {
        self.sections.len()
    }
}

/// Evaluate a formatting closure; a panic inside it yields `None`.
pub fn expand_safely(format: impl FnOnce() -> String) -> Option<String> {
    match panic::catch_unwind(AssertUnwindSafe(format)) {
        Ok(text) => Some(text),
        Err(_) => {
            tracing::debug!("expression expansion panicked; omitting expanded text");
            None
        }
    }
}
