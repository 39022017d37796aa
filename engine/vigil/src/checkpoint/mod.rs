//! Checkpoint tracking across repeated executions of one test body.
//!
//! A test body containing nested checkpoints is executed repeatedly. Each
//! execution follows exactly one not-yet-visited path through the nesting:
//!
//! ```text
//! body { A { A1 {} A2 {} } B {} }
//!
//! run 1: A -> A1          (A2, B observed but skipped)
//! run 2: A -> A2          (A1 complete, skipped)
//! run 3: B                (A complete, skipped)
//! ```
//!
//! The tracker owns the lazily-built `CheckpointTree` for the unit and the
//! per-execution cursor (the stack of entered checkpoints). It only decides
//! enter/skip; reporting is done by the result capture.
//!
//! # Entry rule
//!
//! A checkpoint is entered iff it is not complete and no checkpoint has
//! been left yet during this execution. Leaving a checkpoint ends the
//! search for new work: every later sibling (and ancestor sibling) is
//! skipped until the next execution.
//!
//! # Progress
//!
//! Every execution completes at least one node, so the number of
//! executions never exceeds the number of observed nodes (root included).
//! The runner uses this bound to detect bodies that never settle.

mod tree;

pub use tree::{CheckpointTree, NodeId};

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use vigil_ir::{CheckpointInfo, CheckpointPath, PathSegment};

/// One entered checkpoint on the execution stack.
struct Frame {
    node: NodeId,
    /// Occurrence counters for children reached so far in this execution.
    occurrences: FxHashMap<Arc<str>, u32>,
}

impl Frame {
    fn new(node: NodeId) -> Self {
        Frame {
            node,
            occurrences: FxHashMap::default(),
        }
    }

    fn next_occurrence(&mut self, name: &str) -> u32 {
        if let Some(count) = self.occurrences.get_mut(name) {
            let occurrence = *count;
            *count += 1;
            return occurrence;
        }
        self.occurrences.insert(Arc::from(name), 1);
        0
    }
}

/// Decides, per execution, which checkpoints of a test body are entered.
pub struct CheckpointTracker {
    tree: CheckpointTree,
    stack: SmallVec<[Frame; 8]>,
    /// A checkpoint has been left during this execution.
    leaf_reached: bool,
    /// An abnormal exit is propagating through the stack.
    unwinding: bool,
    executions: usize,
    /// First checkpoint that appeared under a parent whose children were
    /// already fully known.
    violation: Option<CheckpointPath>,
}

impl CheckpointTracker {
    pub fn new() -> Self {
        CheckpointTracker {
            tree: CheckpointTree::new(),
            stack: SmallVec::new(),
            leaf_reached: false,
            unwinding: false,
            executions: 0,
            violation: None,
        }
    }

    /// Begin a new execution of the body.
    pub fn start_execution(&mut self) {
        self.stack.clear();
        self.stack.push(Frame::new(NodeId::ROOT));
        self.leaf_reached = false;
        self.unwinding = false;
        self.executions += 1;
        tracing::trace!(execution = self.executions, "checkpoint execution started");
    }

    /// Called when the body reaches a checkpoint. Returns `true` if its
    /// block should run during this execution.
    pub fn enter_checkpoint(&mut self, name: &str, description: &str) -> bool {
        let Some(frame) = self.stack.last_mut() else {
            tracing::warn!(name, "checkpoint reached outside of an execution");
            return false;
        };
        let parent = frame.node;
        let segment = PathSegment::new(name, frame.next_occurrence(name));

        let node = match self.tree.child(parent, &segment) {
            Some(node) => node,
            None if self.tree.children_known(parent) => {
                let path = self.tree.path(parent).child(segment);
                tracing::debug!(%path, "checkpoint appeared after its parent was fully explored");
                self.violation.get_or_insert(path);
                return false;
            }
            None => self.tree.add_child(parent, segment, description),
        };

        if self.leaf_reached || self.tree.is_complete(node) {
            tracing::trace!(path = %self.tree.path(node), "checkpoint skipped");
            return false;
        }

        tracing::trace!(path = %self.tree.path(node), "checkpoint entered");
        self.stack.push(Frame::new(node));
        true
    }

    /// Called when the innermost entered checkpoint's block exits.
    ///
    /// `abnormal` is true when the block was cut short (a failed
    /// requirement or an unexpected condition). The checkpoint where an
    /// abnormal exit originates is marked complete unless this execution
    /// already made progress below it.
    pub fn leave_checkpoint(&mut self, abnormal: bool) {
        if self.stack.len() <= 1 {
            tracing::warn!("leave_checkpoint without a matching enter");
            return;
        }
        if let Some(frame) = self.stack.pop() {
            self.settle(frame.node, abnormal);
            self.leaf_reached = true;
        }
    }

    /// End the current execution. Any checkpoints still open are closed
    /// as abnormal exits before the root is settled.
    pub fn finish_execution(&mut self, abnormal: bool) {
        while self.stack.len() > 1 {
            if let Some(frame) = self.stack.pop() {
                self.settle(frame.node, true);
                self.leaf_reached = true;
            }
        }
        self.stack.clear();
        self.settle(NodeId::ROOT, abnormal);
        tracing::trace!(
            execution = self.executions,
            exhausted = self.is_exhausted(),
            "checkpoint execution finished"
        );
    }

    fn settle(&mut self, node: NodeId, abnormal: bool) {
        if abnormal {
            if !self.unwinding {
                self.unwinding = true;
                if !self.leaf_reached {
                    self.tree.force_complete(node);
                }
            }
        } else {
            self.tree.mark_children_known(node);
        }
        self.tree.refresh(node);
    }

    /// True once every observed checkpoint has been visited.
    pub fn is_exhausted(&self) -> bool {
        self.tree.is_complete(NodeId::ROOT)
    }

    /// Innermost entered checkpoint, or `None` at the body root.
    pub fn current(&self) -> Option<CheckpointInfo> {
        let frame = self.stack.last()?;
        if frame.node == NodeId::ROOT {
            return None;
        }
        Some(self.tree.info(frame.node))
    }

    /// Path of the innermost entered checkpoint (root path at body level).
    pub fn current_path(&self) -> CheckpointPath {
        self.stack
            .last()
            .map_or_else(CheckpointPath::root, |frame| self.tree.path(frame.node))
    }

    /// Number of executions started so far.
    pub fn executions(&self) -> usize {
        self.executions
    }

    /// Number of observed checkpoints, root included.
    pub fn checkpoint_count(&self) -> usize {
        self.tree.len()
    }

    /// The execution bound has been exceeded: the body keeps producing
    /// work without settling.
    pub fn exceeded_execution_bound(&self) -> bool {
        self.executions > self.tree.len()
    }

    /// Take the first unstable checkpoint observed, if any.
    pub fn take_violation(&mut self) -> Option<CheckpointPath> {
        self.violation.take()
    }

    /// Read access to the explored tree.
    pub fn tree(&self) -> &CheckpointTree {
        &self.tree
    }
}

impl Default for CheckpointTracker {
    fn default() -> Self {
        Self::new()
    }
}
