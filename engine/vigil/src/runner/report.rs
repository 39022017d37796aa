//! Run report types.

use std::time::Duration;

use vigil_ir::Totals;

/// Lifecycle state of one selected test case.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnitState {
    /// Selected but never started.
    Pending,
    /// Executions in progress. A unit still `Running` in a finished report
    /// was ended by a fatal error.
    Running,
    /// Every checkpoint path was executed.
    Exhausted,
    /// The failure cutoff tripped during this unit.
    Aborted,
}

impl UnitState {
    pub fn is_finished(self) -> bool {
        matches!(self, UnitState::Exhausted | UnitState::Aborted)
    }
}

/// What happened to one selected test case.
#[derive(Clone, Debug)]
pub struct UnitReport {
    pub name: String,
    pub state: UnitState,
    /// Number of times the body was executed.
    pub executions: usize,
    /// Leaf checkpoint paths observed (zero for a body without sections).
    pub leaves: usize,
    /// Contribution of this unit to the session totals.
    pub totals: Totals,
    pub duration: Duration,
}

impl UnitReport {
    /// A unit that was selected but never started.
    pub fn pending(name: &str) -> Self {
        UnitReport {
            name: name.to_string(),
            state: UnitState::Pending,
            executions: 0,
            leaves: 0,
            totals: Totals::ZERO,
            duration: Duration::ZERO,
        }
    }

    pub fn passed(&self) -> bool {
        self.state.is_finished() && self.totals.test_cases.failed == 0
    }
}

/// Result of a whole run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub totals: Totals,
    /// Selected units, in registration order.
    pub units: Vec<UnitReport>,
    /// The failure cutoff ended the run early.
    pub aborted: bool,
    pub duration: Duration,
}

impl RunReport {
    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|unit| unit.name == name)
    }

    /// Units that actually ran.
    pub fn started(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|unit| unit.state != UnitState::Pending)
    }

    /// True when no assertion failed.
    pub fn all_passed(&self) -> bool {
        self.totals.assertions.failed == 0 && self.totals.test_cases.failed == 0
    }

    /// Process exit status: the number of failed assertions, saturated.
    pub fn exit_code(&self) -> i32 {
        i32::try_from(self.totals.assertions.failed).unwrap_or(i32::MAX)
    }
}
