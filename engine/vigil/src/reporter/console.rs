//! Line-oriented text reporter. Registered as `"console"`.

use smallvec::SmallVec;
use vigil_ir::{CheckpointInfo, Counts, ResultRecord, TestCaseInfo, Totals};

use super::{Reporter, UnitSummary};
use crate::output::Sink;

/// Prints one line per finished unit, details for every non-successful
/// record, and a summary at the end.
pub struct ConsoleReporter {
    sink: Sink,
    unit: String,
    sections: SmallVec<[String; 4]>,
}

impl ConsoleReporter {
    pub fn new(sink: Sink) -> Self {
        ConsoleReporter {
            sink,
            unit: String::new(),
            sections: SmallVec::new(),
        }
    }

    fn location(&self) -> String {
        let mut location = self.unit.clone();
        for section in &self.sections {
            location.push_str(" > ");
            location.push_str(section);
        }
        location
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// One-line description of a set of totals.
pub(crate) fn describe_totals(totals: &Totals) -> String {
    let Totals {
        assertions,
        test_cases,
    } = totals;
    if test_cases.failed == 0 && assertions.failed == 0 {
        format!(
            "all tests passed ({} in {})",
            plural(assertions.total(), "assertion"),
            plural(test_cases.total(), "test case")
        )
    } else {
        format!(
            "{} of {} failed ({} of {} failed)",
            test_cases.failed,
            plural(test_cases.total(), "test case"),
            assertions.failed,
            plural(assertions.total(), "assertion")
        )
    }
}

impl Reporter for ConsoleReporter {
    fn run_started(&mut self) {}

    fn group_started(&mut self, name: &str) {
        self.sink.line(format_args!("[group '{name}']"));
    }

    fn unit_started(&mut self, info: &TestCaseInfo) {
        self.unit.clone_from(&info.name);
        self.sections.clear();
    }

    fn checkpoint_entered(&mut self, checkpoint: &CheckpointInfo) {
        self.sections.push(checkpoint.name().to_string());
    }

    fn assertion_result(&mut self, record: &ResultRecord) {
        if record.is_failure() {
            let location = self.location();
            self.sink.line(format_args!("{location}"));
            self.sink.line(format_args!("  {}", record.kind()));
            if let Some(expression) = record.expression() {
                self.sink.line(format_args!("    {expression}"));
            }
            if let Some(expanded) = record.expanded() {
                self.sink.line(format_args!("  with expansion:"));
                self.sink.line(format_args!("    {expanded}"));
            }
            if let Some(message) = record.message() {
                self.sink.line(format_args!("  {message}"));
            }
        } else if let Some(message) = record.message() {
            let location = self.location();
            self.sink
                .line(format_args!("{location}: {}: {message}", record.kind()));
        }
    }

    fn checkpoint_left(&mut self, _checkpoint: &CheckpointInfo, _assertions: &Counts) {
        self.sections.pop();
    }

    fn unit_ended(&mut self, summary: &UnitSummary) {
        let assertions = summary.totals.assertions;
        if summary.totals.test_cases.failed > 0 {
            self.sink.line(format_args!(
                "FAIL {} ({} of {} failed)",
                summary.info.name,
                assertions.failed,
                plural(assertions.total(), "assertion")
            ));
            for line in summary.output.lines() {
                self.sink.line(format_args!("  | {line}"));
            }
        } else {
            self.sink.line(format_args!(
                "PASS {} ({})",
                summary.info.name,
                plural(assertions.total(), "assertion")
            ));
        }
        self.unit.clear();
        self.sections.clear();
    }

    fn group_ended(&mut self, name: &str, totals: &Totals) {
        self.sink
            .line(format_args!("[group '{name}': {}]", describe_totals(totals)));
    }

    fn run_ended(&mut self, totals: &Totals, aborted: bool) {
        if aborted {
            self.sink.line(format_args!("run aborted: failure cutoff reached"));
        }
        self.sink.line(format_args!("{}", describe_totals(totals)));
        self.sink.flush();
    }
}
