//! Vigil - Checkpoint-Driven Unit Test Engine
//!
//! Test bodies contain nested checkpoints (sections). The engine executes
//! each body repeatedly, taking exactly one unvisited path through the
//! nesting per execution, until every path has run.
//!
//! # Architecture
//!
//! ```text
//! TestRegistry ──► Runner ──► (per execution) TestContext
//!                    │              │
//!                    │              ├─► CheckpointTracker  (enter/skip)
//!                    │              └─► ResultCapture ──► Reporter
//!                    │
//!                    └─► RunReport
//! ```
//!
//! The tracker persists across the executions of one unit; the context is
//! rebuilt for every execution. All outcomes flow through the capture,
//! which owns the totals and enforces the failure cutoff.
//!
//! # Example
//!
//! ```text
//! let mut tests = RegistryBuilder::new();
//! tests.register("vector", "growth", |ctx| {
//!     let mut v = vec![1, 2, 3];
//!     ctx.section("push", "", |ctx| {
//!         v.push(4);
//!         check_eq!(ctx, v.len(), 4);
//!         Ok(())
//!     })?;
//!     ctx.section("clear", "", |ctx| {
//!         v.clear();
//!         check!(ctx, v.is_empty());
//!         Ok(())
//!     })
//! });
//! let report = run_session(Config::default(), &tests.build()?, &ReporterRegistry::default())?;
//! ```

pub mod capture;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod listing;
pub mod output;
pub mod registry;
pub mod reporter;
pub mod runner;

use std::sync::Once;

pub use capture::ResultCapture;
pub use checkpoint::CheckpointTracker;
pub use config::{Config, ConfigData, Cutoff, IncludeResults, ListSpec};
pub use context::TestContext;
pub use error::{EngineError, EngineResult, Failure, Outcome};
pub use filter::TestSpecs;
pub use output::{OutputScope, OutputTarget, SharedBuffer, Sink};
pub use registry::{RegistryBuilder, TestCase, TestRegistry};
pub use reporter::{
    ConsoleReporter, EventLog, LogFilter, LogReporter, ReportEvent, Reporter, ReporterRegistry,
    UnitSummary,
};
pub use runner::{run_installed, run_session, RunReport, Runner, UnitReport, UnitState};

pub use vigil_ir::{
    CheckpointInfo, CheckpointPath, Counts, PathSegment, ResultKind, ResultRecord, TestCaseInfo,
    Totals,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for engine diagnostics.
///
/// Reads the filter from `VIGIL_LOG` (e.g. `VIGIL_LOG=vigil=trace`) and
/// prints a hierarchical tree to stderr. Does nothing when the variable is
/// unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        let Ok(filter) = EnvFilter::try_from_env("VIGIL_LOG") else {
            return;
        };
        // Another subscriber may already be installed by the host binary.
        let _ = tracing_subscriber::registry()
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_bracketed_fields(true),
            )
            .with(filter)
            .try_init();
    });
}
