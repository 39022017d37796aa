//! Reporter lookup by name.

use rustc_hash::FxHashMap;

use super::{ConsoleReporter, LogReporter, Reporter};
use crate::error::{unknown_reporter, EngineResult};
use crate::output::Sink;

/// Builds a reporter writing to the given sink.
pub type ReporterFactory = fn(Sink) -> Box<dyn Reporter>;

struct Entry {
    description: &'static str,
    factory: ReporterFactory,
}

/// Registry mapping reporter names to factories.
pub struct ReporterRegistry {
    entries: FxHashMap<String, Entry>,
}

impl ReporterRegistry {
    /// Registry with no reporters.
    pub fn empty() -> Self {
        ReporterRegistry {
            entries: FxHashMap::default(),
        }
    }

    /// Registry with the built-in reporters.
    pub fn with_builtins() -> Self {
        let mut registry = ReporterRegistry::empty();
        registry.register(
            "console",
            "Reports results as lines of text",
            |sink| Box::new(ConsoleReporter::new(sink)),
        );
        registry.register(
            "log",
            "Writes every lifecycle event as an indented label log",
            |sink| Box::new(LogReporter::new(sink)),
        );
        registry
    }

    /// Register (or replace) a reporter.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: &'static str,
        factory: ReporterFactory,
    ) {
        self.entries.insert(
            name.into(),
            Entry {
                description,
                factory,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Instantiate the reporter called `name`.
    pub fn create(&self, name: &str, sink: Sink) -> EngineResult<Box<dyn Reporter>> {
        match self.entries.get(name) {
            Some(entry) => Ok((entry.factory)(sink)),
            None => Err(unknown_reporter(
                name,
                self.names().into_iter().map(str::to_string).collect(),
            )),
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered names with their descriptions, sorted by name.
    pub fn descriptions(&self) -> Vec<(&str, &'static str)> {
        let mut list: Vec<_> = self
            .entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.description))
            .collect();
        list.sort_unstable_by_key(|(name, _)| *name);
        list
    }
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
