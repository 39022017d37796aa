//! Test case registry.
//!
//! Test cases are collected into a `RegistryBuilder` during startup and
//! frozen into an immutable `TestRegistry`. The registry can be published
//! once as the process-wide registry; after that it is only read.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashSet;
use vigil_ir::TestCaseInfo;

use crate::context::TestContext;
use crate::error::{duplicate_test_case, EngineError, EngineResult, Outcome};
use crate::filter::TestSpecs;

/// Executable body of a test case.
pub type TestFn = dyn Fn(&mut TestContext<'_>) -> Outcome + Send + Sync;

/// A registered test case: identity plus body.
#[derive(Clone)]
pub struct TestCase {
    info: TestCaseInfo,
    body: Arc<TestFn>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        TestCase {
            info: TestCaseInfo::new(name, description),
            body: Arc::new(body),
        }
    }

    pub fn info(&self) -> &TestCaseInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn description(&self) -> &str {
        &self.info.description
    }

    /// Run the body once.
    pub fn invoke(&self, ctx: &mut TestContext<'_>) -> Outcome {
        (self.body)(ctx)
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.info.name)
            .field("description", &self.info.description)
            .finish_non_exhaustive()
    }
}

/// Collects test cases in registration order.
#[derive(Default)]
pub struct RegistryBuilder {
    cases: Vec<TestCase>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        RegistryBuilder::default()
    }

    /// Register a test case.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        body: F,
    ) -> &mut Self
    where
        F: Fn(&mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        self.cases.push(TestCase::new(name, description, body));
        self
    }

    /// Register an already-built test case.
    pub fn add(&mut self, case: TestCase) -> &mut Self {
        self.cases.push(case);
        self
    }

    /// Freeze the registry. Fails if a name was registered twice.
    pub fn build(self) -> EngineResult<TestRegistry> {
        let mut seen = FxHashSet::default();
        for case in &self.cases {
            if !seen.insert(case.name()) {
                return Err(duplicate_test_case(case.name()));
            }
        }
        tracing::debug!(count = self.cases.len(), "test registry built");
        Ok(TestRegistry {
            cases: self.cases.into(),
        })
    }
}

/// Immutable, ordered collection of test cases.
#[derive(Clone, Debug)]
pub struct TestRegistry {
    cases: Arc<[TestCase]>,
}

impl TestRegistry {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// All test cases in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.name() == name)
    }

    /// Test cases selected by `specs`, in registration order.
    pub fn matching<'a>(&'a self, specs: &'a TestSpecs) -> impl Iterator<Item = &'a TestCase> {
        self.cases.iter().filter(move |case| specs.matches(case.name()))
    }
}

impl<'a> IntoIterator for &'a TestRegistry {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

static GLOBAL: OnceLock<TestRegistry> = OnceLock::new();

/// Publish the process-wide registry. Only the first call succeeds.
pub fn install(registry: TestRegistry) -> EngineResult<()> {
    GLOBAL
        .set(registry)
        .map_err(|_| EngineError::RegistryAlreadyInstalled)
}

/// The process-wide registry, if one has been installed.
pub fn global() -> Option<&'static TestRegistry> {
    GLOBAL.get()
}
