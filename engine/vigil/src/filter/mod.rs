//! Test name filters.
//!
//! Specs are glob patterns matched against the whole test case name
//! (`*`, `?`, `[...]`). A name is selected when any spec matches; an empty
//! spec list selects everything.

use crate::error::{invalid_test_spec, EngineResult};

/// Compiled, ordered list of name patterns.
#[derive(Clone, Debug, Default)]
pub struct TestSpecs {
    patterns: Vec<glob::Pattern>,
}

impl TestSpecs {
    /// Select every test case.
    pub fn all() -> Self {
        TestSpecs::default()
    }

    /// Compile a list of glob specs, failing on the first malformed one.
    pub fn parse<I, S>(specs: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = specs
            .into_iter()
            .map(|spec| {
                let spec = spec.as_ref();
                glob::Pattern::new(spec).map_err(|e| invalid_test_spec(spec, e.msg))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(TestSpecs { patterns })
    }

    /// True if `name` is selected.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(name))
    }

    /// True when no spec was given.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Source text of each spec, in order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(glob::Pattern::as_str)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
