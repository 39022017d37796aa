//! Run configuration.
//!
//! `ConfigData` is plain, freely mutable data (what a command line parser
//! would fill in). `Config` is the validated snapshot the runner reads; it
//! is never mutated once a run starts.

use bitflags::bitflags;

use crate::error::EngineResult;
use crate::filter::TestSpecs;
use crate::output::OutputTarget;

/// Name of the reporter used when none is configured.
pub const DEFAULT_REPORTER: &str = "console";

/// Group name used when none is configured.
pub const DEFAULT_RUN_NAME: &str = "all tests";

/// Failure cutoff: how many failed assertions end the session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Cutoff {
    /// Never stop early.
    #[default]
    Unbounded,
    /// Stop once this many assertions have failed.
    AfterFailures(usize),
}

impl Cutoff {
    /// Interpret a raw count; zero and negative values mean no limit.
    pub fn from_count(count: i64) -> Self {
        match usize::try_from(count) {
            Ok(0) | Err(_) => Cutoff::Unbounded,
            Ok(n) => Cutoff::AfterFailures(n),
        }
    }

    /// Stop after the first failure.
    pub const fn first_failure() -> Self {
        Cutoff::AfterFailures(1)
    }

    /// True if `failed` failed assertions reach this cutoff.
    #[inline]
    pub const fn is_reached(self, failed: usize) -> bool {
        match self {
            Cutoff::Unbounded => false,
            Cutoff::AfterFailures(limit) => failed >= limit,
        }
    }

    pub const fn is_unbounded(self) -> bool {
        matches!(self, Cutoff::Unbounded)
    }
}

/// Which result records reach the reporter.
///
/// Records that are not forwarded are still counted in the totals.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum IncludeResults {
    /// Forward every record.
    #[default]
    All,
    /// Drop successful assertions.
    FailedOnly,
}

bitflags! {
    /// What to list instead of running.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ListSpec: u8 {
        const TESTS = 1 << 0;
        const REPORTERS = 1 << 1;
        /// Emit the listing as XML rather than text.
        const AS_XML = 1 << 4;
    }
}

impl ListSpec {
    /// Everything that can be listed, as text.
    pub const ALL: ListSpec = ListSpec::TESTS.union(ListSpec::REPORTERS);

    /// The "what" part, without the format flag.
    pub fn what(self) -> ListSpec {
        self.difference(ListSpec::AS_XML)
    }

    /// True if anything is to be listed.
    pub fn wants_listing(self) -> bool {
        !self.what().is_empty()
    }
}

/// Raw configuration values.
#[derive(Clone, Debug)]
pub struct ConfigData {
    /// Glob patterns selecting test cases by name. Empty selects all.
    pub test_specs: Vec<String>,
    pub cutoff: Cutoff,
    /// Convert unexpected conditions into failed assertions. When off, the
    /// first one ends the session with an error.
    pub allow_throws: bool,
    pub include: IncludeResults,
    /// Reporter name; empty selects the default.
    pub reporter: String,
    pub output: OutputTarget,
    pub list: ListSpec,
    /// Group name reported around the run.
    pub name: String,
    /// Run independent test cases on a thread pool. Only honored when the
    /// cutoff is unbounded.
    pub parallel: bool,
    /// Emit a debug event on every failed assertion.
    pub break_on_failure: bool,
}

impl Default for ConfigData {
    fn default() -> Self {
        ConfigData {
            test_specs: Vec::new(),
            cutoff: Cutoff::Unbounded,
            allow_throws: true,
            include: IncludeResults::All,
            reporter: String::new(),
            output: OutputTarget::Stdout,
            list: ListSpec::empty(),
            name: String::new(),
            parallel: false,
            break_on_failure: false,
        }
    }
}

/// Validated, read-only run configuration.
#[derive(Clone, Debug)]
pub struct Config {
    data: ConfigData,
    specs: TestSpecs,
}

impl Config {
    /// Validate raw data. Fails if any test spec is malformed.
    pub fn new(data: ConfigData) -> EngineResult<Self> {
        let specs = TestSpecs::parse(&data.test_specs)?;
        Ok(Config { data, specs })
    }

    pub fn data(&self) -> &ConfigData {
        &self.data
    }

    pub fn test_specs(&self) -> &TestSpecs {
        &self.specs
    }

    /// True if the user narrowed the selection.
    pub fn tests_specified(&self) -> bool {
        !self.specs.is_empty()
    }

    pub fn cutoff(&self) -> Cutoff {
        self.data.cutoff
    }

    pub fn allow_throws(&self) -> bool {
        self.data.allow_throws
    }

    pub fn include(&self) -> IncludeResults {
        self.data.include
    }

    pub fn include_successful_results(&self) -> bool {
        self.data.include == IncludeResults::All
    }

    /// Configured reporter name, or the default.
    pub fn reporter_name(&self) -> &str {
        if self.data.reporter.is_empty() {
            DEFAULT_REPORTER
        } else {
            &self.data.reporter
        }
    }

    pub fn output(&self) -> &OutputTarget {
        &self.data.output
    }

    pub fn list(&self) -> ListSpec {
        self.data.list
    }

    /// Configured group name, or the default.
    pub fn name(&self) -> &str {
        if self.data.name.is_empty() {
            DEFAULT_RUN_NAME
        } else {
            &self.data.name
        }
    }

    /// Parallel execution is requested and allowed.
    pub fn runs_in_parallel(&self) -> bool {
        self.data.parallel && self.data.cutoff.is_unbounded()
    }

    pub fn break_on_failure(&self) -> bool {
        self.data.break_on_failure
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: ConfigData::default(),
            specs: TestSpecs::all(),
        }
    }
}
