//! Recorded reporter events and the indented label log.
//!
//! `EventLog` keeps every callback as an owned `ReportEvent`. It serves as
//! an in-memory reporter for checking callback order, and as the per-unit
//! buffer that lets units run in parallel while the real reporter still sees
//! them one after another.
//!
//! The label form opens a label with `\name` and closes it with `/name`,
//! indenting one space per open label:
//!
//! ```text
//! \run
//!  \tc nested
//!   \section A
//!    ExpressionFailed a == b 1 == 2
//!   /section A
//!  /tc nested
//! /run
//! ```
//!
//! Successful assertions are not written to the label log.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::Mutex;
use vigil_ir::{CheckpointInfo, Counts, ResultKind, ResultRecord, TestCaseInfo, Totals};

use super::{Reporter, UnitSummary};
use crate::output::Sink;

/// One reporter callback with owned arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportEvent {
    RunStarted,
    GroupStarted(String),
    UnitStarted(TestCaseInfo),
    CheckpointEntered(CheckpointInfo),
    Assertion(ResultRecord),
    CheckpointLeft(CheckpointInfo, Counts),
    UnitEnded(UnitSummary),
    GroupEnded(String, Totals),
    RunEnded(Totals, bool),
}

impl ReportEvent {
    /// Deliver this event to `reporter`.
    pub fn replay(&self, reporter: &mut dyn Reporter) {
        match self {
            ReportEvent::RunStarted => reporter.run_started(),
            ReportEvent::GroupStarted(name) => reporter.group_started(name),
            ReportEvent::UnitStarted(info) => reporter.unit_started(info),
            ReportEvent::CheckpointEntered(info) => reporter.checkpoint_entered(info),
            ReportEvent::Assertion(record) => reporter.assertion_result(record),
            ReportEvent::CheckpointLeft(info, counts) => reporter.checkpoint_left(info, counts),
            ReportEvent::UnitEnded(summary) => reporter.unit_ended(summary),
            ReportEvent::GroupEnded(name, totals) => reporter.group_ended(name, totals),
            ReportEvent::RunEnded(totals, aborted) => reporter.run_ended(totals, *aborted),
        }
    }
}

bitflags! {
    /// Which labels the label log writes.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct LogFilter: u8 {
        const GROUPS = 1 << 0;
        const TEST_CASES = 1 << 1;
        const SECTIONS = 1 << 2;
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        LogFilter::all()
    }
}

/// Incremental renderer for the label form.
#[derive(Debug)]
struct LabelWriter {
    filter: LogFilter,
    indent: usize,
}

impl LabelWriter {
    fn new(filter: LogFilter) -> Self {
        LabelWriter { filter, indent: 0 }
    }

    fn open(&mut self, out: &mut String, label: &str, arg: &str) {
        self.line(out, '\\', label, arg);
        self.indent += 1;
    }

    fn close(&mut self, out: &mut String, label: &str, arg: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(out, '/', label, arg);
    }

    fn line(&self, out: &mut String, marker: char, label: &str, arg: &str) {
        let _ = write!(out, "{:indent$}{marker}{label}", "", indent = self.indent);
        if !arg.is_empty() {
            out.push(' ');
            out.push_str(arg);
        }
        out.push('\n');
    }

    fn assertion(&self, out: &mut String, record: &ResultRecord) {
        if record.kind() == ResultKind::Success {
            return;
        }
        let _ = write!(out, "{:indent$}{}", "", record.kind(), indent = self.indent);
        if let Some(expression) = record.expression() {
            let _ = write!(out, " {expression}");
        }
        if let Some(message) = record.message() {
            let _ = write!(out, " '{message}'");
        }
        if let Some(expanded) = record.expanded() {
            let _ = write!(out, " {expanded}");
        }
        out.push('\n');
    }

    /// Append the rendering of one event to `out`.
    fn render(&mut self, out: &mut String, event: &ReportEvent) {
        let groups = self.filter.contains(LogFilter::GROUPS);
        let cases = self.filter.contains(LogFilter::TEST_CASES);
        let sections = self.filter.contains(LogFilter::SECTIONS);
        match event {
            ReportEvent::RunStarted => self.open(out, "run", ""),
            ReportEvent::RunEnded(..) => self.close(out, "run", ""),
            ReportEvent::GroupStarted(name) if groups => self.open(out, "group", name),
            ReportEvent::GroupEnded(name, _) if groups => self.close(out, "group", name),
            ReportEvent::UnitStarted(info) if cases => self.open(out, "tc", &info.name),
            ReportEvent::UnitEnded(summary) if cases => {
                self.close(out, "tc", &summary.info.name);
            }
            ReportEvent::CheckpointEntered(info) if sections => {
                self.open(out, "section", info.name());
            }
            ReportEvent::CheckpointLeft(info, _) if sections => {
                self.close(out, "section", info.name());
            }
            ReportEvent::Assertion(record) => self.assertion(out, record),
            _ => {}
        }
    }
}

/// Shared, cloneable record of reporter callbacks.
///
/// Clones share storage: keep one handle, give the other to the runner.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ReportEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    fn push(&self, event: ReportEvent) {
        self.events.lock().push(event);
    }

    /// Snapshot of every event so far.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().clone()
    }

    /// Remove and return every event so far.
    pub fn take(&self) -> Vec<ReportEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Deliver every recorded event to `reporter`, in order.
    pub fn replay_into(&self, reporter: &mut dyn Reporter) {
        for event in self.events() {
            event.replay(reporter);
        }
    }

    /// Label form restricted to `filter`.
    pub fn render(&self, filter: LogFilter) -> String {
        let mut writer = LabelWriter::new(filter);
        let mut out = String::new();
        for event in self.events.lock().iter() {
            writer.render(&mut out, event);
        }
        out
    }
}

impl fmt::Display for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(LogFilter::all()))
    }
}

impl Reporter for EventLog {
    fn run_started(&mut self) {
        self.push(ReportEvent::RunStarted);
    }

    fn group_started(&mut self, name: &str) {
        self.push(ReportEvent::GroupStarted(name.to_string()));
    }

    fn unit_started(&mut self, info: &TestCaseInfo) {
        self.push(ReportEvent::UnitStarted(info.clone()));
    }

    fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo) {
        self.push(ReportEvent::CheckpointEntered(checkpoint.clone()));
    }

    fn assertion_result(&mut self, record: &ResultRecord) {
        self.push(ReportEvent::Assertion(record.clone()));
    }

    fn checkpoint_left(&mut self, checkpoint: &CheckpointInfo, assertions: &Counts) {
        self.push(ReportEvent::CheckpointLeft(checkpoint.clone(), *assertions));
    }

    fn unit_ended(&mut self, summary: &UnitSummary) {
        self.push(ReportEvent::UnitEnded(summary.clone()));
    }

    fn group_ended(&mut self, name: &str, totals: &Totals) {
        self.push(ReportEvent::GroupEnded(name.to_string(), *totals));
    }

    fn run_ended(&mut self, totals: &Totals, aborted: bool) {
        self.push(ReportEvent::RunEnded(*totals, aborted));
    }
}

/// Reporter streaming the label form to a sink. Registered as `"log"`.
pub struct LogReporter {
    sink: Sink,
    writer: LabelWriter,
    buffer: String,
}

impl LogReporter {
    pub fn new(sink: Sink) -> Self {
        LogReporter::with_filter(sink, LogFilter::all())
    }

    pub fn with_filter(sink: Sink, filter: LogFilter) -> Self {
        LogReporter {
            sink,
            writer: LabelWriter::new(filter),
            buffer: String::new(),
        }
    }

    fn emit(&mut self, event: &ReportEvent) {
        self.buffer.clear();
        self.writer.render(&mut self.buffer, event);
        if !self.buffer.is_empty() {
            self.sink.text(&self.buffer);
        }
    }
}

impl Reporter for LogReporter {
    fn run_started(&mut self) {
        self.emit(&ReportEvent::RunStarted);
    }

    fn group_started(&mut self, name: &str) {
        self.emit(&ReportEvent::GroupStarted(name.to_string()));
    }

    fn unit_started(&mut self, info: &TestCaseInfo) {
        self.emit(&ReportEvent::UnitStarted(info.clone()));
    }

    fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo) {
        self.emit(&ReportEvent::CheckpointEntered(checkpoint.clone()));
    }

    fn assertion_result(&mut self, record: &ResultRecord) {
        self.emit(&ReportEvent::Assertion(record.clone()));
    }

    fn checkpoint_left(&mut self, checkpoint: &CheckpointInfo, assertions: &Counts) {
        self.emit(&ReportEvent::CheckpointLeft(checkpoint.clone(), *assertions));
    }

    fn unit_ended(&mut self, summary: &UnitSummary) {
        self.emit(&ReportEvent::UnitEnded(summary.clone()));
    }

    fn group_ended(&mut self, name: &str, totals: &Totals) {
        self.emit(&ReportEvent::GroupEnded(name.to_string(), *totals));
    }

    fn run_ended(&mut self, totals: &Totals, aborted: bool) {
        self.emit(&ReportEvent::RunEnded(*totals, aborted));
        self.sink.flush();
    }
}
