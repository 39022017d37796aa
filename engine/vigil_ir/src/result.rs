//! Assertion result records.

use std::fmt;

/// Classification of a single recorded outcome.
///
/// `Success`, `Warning` and `Info` count as passed; every other kind
/// counts as failed. `Unknown` never comes out of correct operation but
/// is still counted (as a failure) rather than rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResultKind {
    /// The asserted condition held.
    Success,
    /// The asserted condition evaluated to false.
    ExpressionFailed,
    /// The test signalled failure directly.
    ExplicitFailure,
    /// An unexpected abnormal exit was observed.
    ThrewUnexpectedCondition,
    /// An abnormal exit was expected but did not happen.
    DidNotThrowExpectedCondition,
    /// Non-failing diagnostic.
    Warning,
    /// Non-failing annotation.
    Info,
    /// Unrecognized kind.
    Unknown,
}

impl ResultKind {
    /// Returns true if this outcome goes into the failed bucket.
    #[inline]
    pub const fn is_failure(self) -> bool {
        !matches!(
            self,
            ResultKind::Success | ResultKind::Warning | ResultKind::Info
        )
    }

    /// Stable display name, used by text reporters.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResultKind::Success => "Success",
            ResultKind::ExpressionFailed => "ExpressionFailed",
            ResultKind::ExplicitFailure => "ExplicitFailure",
            ResultKind::ThrewUnexpectedCondition => "ThrewUnexpectedCondition",
            ResultKind::DidNotThrowExpectedCondition => "DidNotThrowExpectedCondition",
            ResultKind::Warning => "Warning",
            ResultKind::Info => "Info",
            ResultKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one assertion or informational event.
///
/// Built once by the result capture at the moment the assertion executes;
/// there are no setters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultRecord {
    kind: ResultKind,
    expression: Option<String>,
    expanded: Option<String>,
    message: Option<String>,
}

impl ResultRecord {
    /// Create a record carrying only an outcome kind.
    pub fn new(kind: ResultKind) -> Self {
        ResultRecord {
            kind,
            expression: None,
            expanded: None,
            message: None,
        }
    }

    /// Attach the source text of the asserted expression.
    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Attach the expression with operands replaced by their values.
    #[must_use]
    pub fn with_expanded(mut self, expanded: Option<String>) -> Self {
        self.expanded = expanded;
        self
    }

    /// Attach a free-text message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Shorthand for `self.kind().is_failure()`.
    pub fn is_failure(&self) -> bool {
        self.kind.is_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_buckets() {
        assert!(!ResultKind::Success.is_failure());
        assert!(!ResultKind::Warning.is_failure());
        assert!(!ResultKind::Info.is_failure());
        assert!(ResultKind::ExpressionFailed.is_failure());
        assert!(ResultKind::ExplicitFailure.is_failure());
        assert!(ResultKind::ThrewUnexpectedCondition.is_failure());
        assert!(ResultKind::DidNotThrowExpectedCondition.is_failure());
        assert!(ResultKind::Unknown.is_failure());
    }

    #[test]
    fn test_record_builder() {
        let record = ResultRecord::new(ResultKind::ExpressionFailed)
            .with_expression("a == b")
            .with_expanded(Some("1 == 2".to_string()))
            .with_message("values differ");

        assert_eq!(record.kind(), ResultKind::ExpressionFailed);
        assert_eq!(record.expression(), Some("a == b"));
        assert_eq!(record.expanded(), Some("1 == 2"));
        assert_eq!(record.message(), Some("values differ"));
        assert!(record.is_failure());
    }

    #[test]
    fn test_record_optional_fields_absent() {
        let record = ResultRecord::new(ResultKind::Info);
        assert_eq!(record.expression(), None);
        assert_eq!(record.expanded(), None);
        assert_eq!(record.message(), None);
    }
}
