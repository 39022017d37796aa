//! Pass/fail counters.
//!
//! `Counts` is one {passed, failed} pair; `Totals` holds one pair for
//! assertions and one for test cases. Both support addition (merging a
//! sub-run into its parent) and subtraction (the delta contributed by a
//! sub-run). Subtraction saturates at zero.

use std::ops::{Add, AddAssign, Sub};

use crate::ResultKind;

/// A passed/failed counter pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
}

impl Counts {
    pub const ZERO: Counts = Counts {
        passed: 0,
        failed: 0,
    };

    pub const fn new(passed: usize, failed: usize) -> Self {
        Counts { passed, failed }
    }

    /// Bump the bucket selected by `kind`.
    #[inline]
    pub fn record(&mut self, kind: ResultKind) {
        if kind.is_failure() {
            self.failed += 1;
        } else {
            self.passed += 1;
        }
    }

    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// True when nothing failed.
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
        }
    }
}

impl AddAssign for Counts {
    fn add_assign(&mut self, rhs: Counts) {
        *self = *self + rhs;
    }
}

impl Sub for Counts {
    type Output = Counts;

    fn sub(self, rhs: Counts) -> Counts {
        Counts {
            passed: self.passed.saturating_sub(rhs.passed),
            failed: self.failed.saturating_sub(rhs.failed),
        }
    }
}

/// Assertion-level and test-case-level counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Totals {
    pub assertions: Counts,
    pub test_cases: Counts,
}

impl Totals {
    pub const ZERO: Totals = Totals {
        assertions: Counts::ZERO,
        test_cases: Counts::ZERO,
    };

    pub fn new() -> Self {
        Totals::default()
    }

    /// Delta contributed since `before`, with the test-case bucket set
    /// to exactly one unit: passed if no assertion failed in the delta,
    /// failed otherwise.
    #[must_use]
    pub fn unit_delta(&self, before: &Totals) -> Totals {
        let mut diff = *self - *before;
        diff.test_cases = if diff.assertions.all_passed() {
            Counts::new(1, 0)
        } else {
            Counts::new(0, 1)
        };
        diff
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals {
            assertions: self.assertions + rhs.assertions,
            test_cases: self.test_cases + rhs.test_cases,
        }
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Totals) {
        *self = *self + rhs;
    }
}

impl Sub for Totals {
    type Output = Totals;

    fn sub(self, rhs: Totals) -> Totals {
        Totals {
            assertions: self.assertions - rhs.assertions,
            test_cases: self.test_cases - rhs.test_cases,
        }
    }
}
