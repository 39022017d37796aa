//! Engine errors and test-body outcomes.
//!
//! Two distinct things can go wrong:
//!
//! - `EngineError`: the session itself cannot continue (bad configuration,
//!   a body that never settles, an uncaught condition with allow-throws
//!   off). Returned from `Runner::run`.
//! - `Failure`: a test body stopped early. This is ordinary control flow
//!   inside a unit; it never leaves the runner as an error unless the
//!   configuration says so.

use std::fmt;
use std::io;

use vigil_ir::CheckpointPath;

/// Session-level failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid test spec `{pattern}`: {reason}")]
    InvalidTestSpec { pattern: String, reason: String },

    #[error("test case `{name}` is registered more than once")]
    DuplicateTestCase { name: String },

    #[error("no reporter named `{name}` (available: {})", available.join(", "))]
    UnknownReporter { name: String, available: Vec<String> },

    #[error(
        "test case `{unit}` did not settle after {executions} executions \
         ({checkpoints} checkpoints observed)"
    )]
    NonTerminating {
        unit: String,
        executions: usize,
        checkpoints: usize,
    },

    #[error("test case `{unit}` presented a new checkpoint `{path}` after its parent was fully explored")]
    UnstableCheckpoints { unit: String, path: String },

    #[error("test case `{unit}` raised an unexpected condition: {message}")]
    UncaughtCondition { unit: String, message: String },

    #[error("the global test registry is already installed")]
    RegistryAlreadyInstalled,

    #[error("no global test registry has been installed")]
    RegistryNotInstalled,

    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cold]
pub fn invalid_test_spec(pattern: &str, reason: impl fmt::Display) -> EngineError {
    EngineError::InvalidTestSpec {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

#[cold]
pub fn duplicate_test_case(name: &str) -> EngineError {
    EngineError::DuplicateTestCase {
        name: name.to_string(),
    }
}

#[cold]
pub fn unknown_reporter(name: &str, available: Vec<String>) -> EngineError {
    EngineError::UnknownReporter {
        name: name.to_string(),
        available,
    }
}

#[cold]
pub fn non_terminating(unit: &str, executions: usize, checkpoints: usize) -> EngineError {
    EngineError::NonTerminating {
        unit: unit.to_string(),
        executions,
        checkpoints,
    }
}

#[cold]
pub fn unstable_checkpoints(unit: &str, path: &CheckpointPath) -> EngineError {
    EngineError::UnstableCheckpoints {
        unit: unit.to_string(),
        path: path.to_string(),
    }
}

#[cold]
pub fn uncaught_condition(unit: &str, message: &str) -> EngineError {
    EngineError::UncaughtCondition {
        unit: unit.to_string(),
        message: message.to_string(),
    }
}

/// Why a test body stopped before its natural end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Stopped by a failed requirement; the failure is already recorded.
    Aborted,
    /// An unexpected condition (an `Err` or a panic) that has not been
    /// recorded yet.
    Raised(String),
}

impl Failure {
    /// Wrap any displayable error as an unexpected condition.
    pub fn raised(message: impl fmt::Display) -> Self {
        Failure::Raised(message.to_string())
    }
}

/// Any error propagated with `?` from a test body is an unexpected
/// condition.
impl<E: std::error::Error> From<E> for Failure {
    fn from(error: E) -> Self {
        Failure::Raised(error.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Aborted => f.write_str("aborted by a failed requirement"),
            Failure::Raised(message) => write!(f, "unexpected condition: {message}"),
        }
    }
}

/// What a test body or checkpoint block returns.
pub type Outcome = Result<(), Failure>;

/// Text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
