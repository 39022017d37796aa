//! Reporter interface and built-in reporters.
//!
//! A reporter observes a run through an ordered sequence of callbacks:
//!
//! ```text
//! run_started
//!   group_started                      (only around run_matching)
//!     unit_started
//!       checkpoint_entered
//!         assertion_result ...
//!       checkpoint_left
//!     unit_ended
//!   group_ended
//! run_ended
//! ```
//!
//! For a unit executed several times, the entered/left pairs of every
//! execution appear between one `unit_started` and one `unit_ended`, in
//! execution order.

mod console;
mod event_log;
mod registry;

pub use console::ConsoleReporter;
pub use event_log::{EventLog, LogFilter, LogReporter, ReportEvent};
pub use registry::{ReporterFactory, ReporterRegistry};

use vigil_ir::{CheckpointInfo, Counts, ResultRecord, TestCaseInfo, Totals};

/// Everything known about a unit when it ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitSummary {
    pub info: TestCaseInfo,
    /// Contribution of this unit to the session totals.
    pub totals: Totals,
    /// Number of times the body was executed.
    pub executions: usize,
    /// Text captured from the body across all executions.
    pub output: String,
    /// The failure cutoff tripped while this unit was running.
    pub aborted: bool,
}

/// Observer of engine lifecycle and result events.
pub trait Reporter: Send {
    fn run_started(&mut self);

    fn group_started(&mut self, _name: &str) {}

    fn unit_started(&mut self, info: &TestCaseInfo);

    fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo);

    fn assertion_result(&mut self, record: &ResultRecord);

    /// `assertions` holds the assertions recorded inside the block during
    /// this execution.
    fn checkpoint_left(&mut self, checkpoint: &CheckpointInfo, assertions: &Counts);

    fn unit_ended(&mut self, summary: &UnitSummary);

    fn group_ended(&mut self, _name: &str, _totals: &Totals) {}

    fn run_ended(&mut self, totals: &Totals, aborted: bool);
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn run_started(&mut self) {
        (**self).run_started();
    }

    fn group_started(&mut self, name: &str) {
        (**self).group_started(name);
    }

    fn unit_started(&mut self, info: &TestCaseInfo) {
        (**self).unit_started(info);
    }

    fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo) {
        (**self).checkpoint_entered(checkpoint);
    }

    fn assertion_result(&mut self, record: &ResultRecord) {
        (**self).assertion_result(record);
    }

    fn checkpoint_left(&mut self, checkpoint: &CheckpointInfo, assertions: &Counts) {
        (**self).checkpoint_left(checkpoint, assertions);
    }

    fn unit_ended(&mut self, summary: &UnitSummary) {
        (**self).unit_ended(summary);
    }

    fn group_ended(&mut self, name: &str, totals: &Totals) {
        (**self).group_ended(name, totals);
    }

    fn run_ended(&mut self, totals: &Totals, aborted: bool) {
        (**self).run_ended(totals, aborted);
    }
}
