//! Vigil IR - Value Types Shared by the Test Engine
//!
//! This crate contains the plain data that flows between the engine and
//! its observers:
//! - Result records for individual assertion outcomes
//! - Pass/fail counters at assertion and test-case granularity
//! - Checkpoint paths addressing nested blocks inside a test body
//! - Test case identity
//!
//! Nothing here executes test code. Every type is `Clone + Debug` and
//! immutable once built, so reporters may keep copies freely.

mod checkpoint;
mod result;
mod test_case;
mod totals;

pub use checkpoint::{CheckpointInfo, CheckpointPath, PathSegment};
pub use result::{ResultKind, ResultRecord};
pub use test_case::TestCaseInfo;
pub use totals::{Counts, Totals};
