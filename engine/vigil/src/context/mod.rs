//! The assertion surface handed to test bodies.
//!
//! A `TestContext` lives for one execution of a body. It forwards every
//! assertion to the result capture and every `section` to the checkpoint
//! tracker.
//!
//! Bodies return [`Outcome`]. Non-fatal checks (`check*`) record and carry
//! on; requirements (`require*`, `fail`) record and return
//! `Err(Failure::Aborted)` so the body stops with `?`.
//!
//! Panics and `Err(Failure::Raised(..))` are unexpected conditions. They
//! are caught at the nearest section boundary (or at the body root),
//! recorded as `ThrewUnexpectedCondition`, and turned into
//! `Failure::Aborted`. With allow-throws off they propagate unchanged and
//! end the session.

use std::fmt::{Debug, Display};
use std::panic::{self, AssertUnwindSafe};

use vigil_ir::{CheckpointInfo, ResultKind, ResultRecord};

use crate::capture::{expand_safely, ResultCapture};
use crate::checkpoint::CheckpointTracker;
use crate::error::{panic_message, Failure, Outcome};
use crate::output::ScopeWriter;
use crate::registry::TestCase;

/// Per-execution handle for assertions and sections.
pub struct TestContext<'a> {
    capture: &'a mut ResultCapture,
    tracker: &'a mut CheckpointTracker,
    allow_throws: bool,
}

impl<'a> TestContext<'a> {
    pub fn new(
        capture: &'a mut ResultCapture,
        tracker: &'a mut CheckpointTracker,
        allow_throws: bool,
    ) -> Self {
        TestContext {
            capture,
            tracker,
            allow_throws,
        }
    }

    fn assertion(&mut self, passed: bool, expression: &str, expanded: Option<String>) -> bool {
        let kind = if passed {
            ResultKind::Success
        } else {
            ResultKind::ExpressionFailed
        };
        self.capture
            .record_assertion(kind, Some(expression), expanded, None);
        passed
    }

    /// Record whether `condition` holds. Returns it.
    pub fn check(&mut self, condition: bool, expression: &str) -> bool {
        self.assertion(condition, expression, None)
    }

    /// Record whether `left == right`, with both operands expanded.
    pub fn check_eq<L, R>(&mut self, left: &L, right: &R, expression: &str) -> bool
    where
        L: PartialEq<R> + Debug + ?Sized,
        R: Debug + ?Sized,
    {
        let passed = left == right;
        let expanded = expand_safely(|| format!("{left:?} == {right:?}"));
        self.assertion(passed, expression, expanded)
    }

    /// Record whether `left != right`, with both operands expanded.
    pub fn check_ne<L, R>(&mut self, left: &L, right: &R, expression: &str) -> bool
    where
        L: PartialEq<R> + Debug + ?Sized,
        R: Debug + ?Sized,
    {
        let passed = left != right;
        let expanded = expand_safely(|| format!("{left:?} != {right:?}"));
        self.assertion(passed, expression, expanded)
    }

    /// Like `check`, but stops the body when the condition is false.
    pub fn require(&mut self, condition: bool, expression: &str) -> Outcome {
        if self.check(condition, expression) {
            Ok(())
        } else {
            Err(Failure::Aborted)
        }
    }

    /// Like `check_eq`, but stops the body when the operands differ.
    pub fn require_eq<L, R>(&mut self, left: &L, right: &R, expression: &str) -> Outcome
    where
        L: PartialEq<R> + Debug + ?Sized,
        R: Debug + ?Sized,
    {
        if self.check_eq(left, right, expression) {
            Ok(())
        } else {
            Err(Failure::Aborted)
        }
    }

    /// Record whether `f` fails (returns `Err` or panics).
    pub fn check_throws<T, E>(
        &mut self,
        expression: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> bool {
        let threw = !matches!(panic::catch_unwind(AssertUnwindSafe(f)), Ok(Ok(_)));
        let kind = if threw {
            ResultKind::Success
        } else {
            ResultKind::DidNotThrowExpectedCondition
        };
        self.capture.record_assertion(kind, Some(expression), None, None);
        threw
    }

    /// Record whether `f` completes without an error or a panic.
    pub fn check_nothrow<T, E: Display>(
        &mut self,
        expression: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> bool {
        let problem = match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        match problem {
            None => {
                self.capture
                    .record_assertion(ResultKind::Success, Some(expression), None, None);
                true
            }
            Some(message) => {
                self.capture.record_assertion(
                    ResultKind::ThrewUnexpectedCondition,
                    Some(expression),
                    None,
                    Some(&message),
                );
                false
            }
        }
    }

    pub fn require_throws<T, E>(
        &mut self,
        expression: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Outcome {
        if self.check_throws(expression, f) {
            Ok(())
        } else {
            Err(Failure::Aborted)
        }
    }

    pub fn require_nothrow<T, E: Display>(
        &mut self,
        expression: &str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Outcome {
        if self.check_nothrow(expression, f) {
            Ok(())
        } else {
            Err(Failure::Aborted)
        }
    }

    /// Record an explicit failure and stop the body.
    pub fn fail(&mut self, message: &str) -> Outcome {
        self.capture
            .record(ResultRecord::new(ResultKind::ExplicitFailure).with_message(message));
        Err(Failure::Aborted)
    }

    /// Record an explicit success.
    pub fn succeed(&mut self, message: &str) {
        self.capture
            .record(ResultRecord::new(ResultKind::Success).with_message(message));
    }

    pub fn warn(&mut self, message: &str) {
        self.capture
            .record(ResultRecord::new(ResultKind::Warning).with_message(message));
    }

    pub fn info(&mut self, message: &str) {
        self.capture
            .record(ResultRecord::new(ResultKind::Info).with_message(message));
    }

    /// A nested checkpoint. `body` runs only if the tracker selects this
    /// checkpoint for the current execution.
    pub fn section<F>(&mut self, name: &str, description: &str, body: F) -> Outcome
    where
        F: FnOnce(&mut TestContext<'_>) -> Outcome,
    {
        if !self.tracker.enter_checkpoint(name, description) {
            return Ok(());
        }
        let info = self.tracker.current();
        if let Some(info) = &info {
            self.capture.checkpoint_entered(info);
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *self)));
        let outcome = self.absorb(result);

        self.tracker.leave_checkpoint(outcome.is_err());
        if let Some(info) = &info {
            self.capture.checkpoint_left(info);
        }
        outcome
    }

    /// Run a test case's body at the root of this execution.
    pub(crate) fn run_body(&mut self, test: &TestCase) -> Outcome {
        let result = panic::catch_unwind(AssertUnwindSafe(|| test.invoke(&mut *self)));
        self.absorb(result)
    }

    /// Convert a panic into `Raised`, then record a `Raised` condition if
    /// unexpected conditions are allowed.
    fn absorb(&mut self, result: std::thread::Result<Outcome>) -> Outcome {
        let outcome = result
            .unwrap_or_else(|payload| Err(Failure::Raised(panic_message(payload.as_ref()))));
        match outcome {
            Err(Failure::Raised(message)) if self.allow_throws => {
                tracing::debug!(%message, "unexpected condition recorded");
                self.capture.record(
                    ResultRecord::new(ResultKind::ThrewUnexpectedCondition).with_message(message),
                );
                Err(Failure::Aborted)
            }
            other => other,
        }
    }

    /// Writer into this execution's captured output.
    pub fn out(&self) -> ScopeWriter {
        ScopeWriter::new()
    }

    /// The innermost entered section, if any.
    pub fn current_section(&self) -> Option<CheckpointInfo> {
        self.tracker.current()
    }

    /// 1-based number of the current execution of this body.
    pub fn execution(&self) -> usize {
        self.tracker.executions()
    }
}

/// Record whether a condition holds: `check!(ctx, x > 0)`.
#[macro_export]
macro_rules! check {
    ($ctx:expr, $cond:expr $(,)?) => {
        $ctx.check($cond, stringify!($cond))
    };
}

/// Record whether two values are equal, showing both on failure.
#[macro_export]
macro_rules! check_eq {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.check_eq(
            &$left,
            &$right,
            concat!(stringify!($left), " == ", stringify!($right)),
        )
    };
}

/// Record whether two values differ, showing both on failure.
#[macro_export]
macro_rules! check_ne {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.check_ne(
            &$left,
            &$right,
            concat!(stringify!($left), " != ", stringify!($right)),
        )
    };
}

/// Require a condition; returns from the body on failure.
#[macro_export]
macro_rules! require {
    ($ctx:expr, $cond:expr $(,)?) => {
        $ctx.require($cond, stringify!($cond))?
    };
}

/// Require two values to be equal; returns from the body on failure.
#[macro_export]
macro_rules! require_eq {
    ($ctx:expr, $left:expr, $right:expr $(,)?) => {
        $ctx.require_eq(
            &$left,
            &$right,
            concat!(stringify!($left), " == ", stringify!($right)),
        )?
    };
}
