//! Test case identity.

/// Name and one-line description of a registered test case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TestCaseInfo {
    pub name: String,
    pub description: String,
}

impl TestCaseInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        TestCaseInfo {
            name: name.into(),
            description: description.into(),
        }
    }
}
