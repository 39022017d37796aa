//! Lazily-built checkpoint tree.
//!
//! Nodes are discovered while a test body executes and live in a flat
//! arena addressed by `NodeId`. Node 0 is the body root. Each node knows:
//!
//! - `children_known`: its block has run to its natural end at least once,
//!   so every direct child has been observed
//! - `complete`: nothing below it is left to visit
//!
//! A node is complete when its children are known and all of them are
//! complete, or when an abnormal exit originating in it forced it
//! complete.

use rustc_hash::FxHashMap;
use vigil_ir::{CheckpointInfo, CheckpointPath, PathSegment};

/// Index of a node in a `CheckpointTree`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The test body itself.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

struct Node {
    segment: Option<PathSegment>,
    description: String,
    parent: Option<NodeId>,
    /// Children in discovery (body) order.
    children: Vec<NodeId>,
    by_segment: FxHashMap<PathSegment, NodeId>,
    children_known: bool,
    complete: bool,
}

impl Node {
    fn new(segment: Option<PathSegment>, description: String, parent: Option<NodeId>) -> Self {
        Node {
            segment,
            description,
            parent,
            children: Vec::new(),
            by_segment: FxHashMap::default(),
            children_known: false,
            complete: false,
        }
    }
}

/// Arena of every checkpoint observed across the executions of one unit.
pub struct CheckpointTree {
    nodes: Vec<Node>,
}

impl CheckpointTree {
    /// Create a tree holding only the root.
    pub fn new() -> Self {
        CheckpointTree {
            nodes: vec![Node::new(None, String::new(), None)],
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Look up an already-observed child.
    pub fn child(&self, parent: NodeId, segment: &PathSegment) -> Option<NodeId> {
        self.node(parent).by_segment.get(segment).copied()
    }

    /// Record a newly observed child of `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        segment: PathSegment,
        description: impl Into<String>,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes
            .push(Node::new(Some(segment.clone()), description.into(), Some(parent)));
        let node = self.node_mut(parent);
        node.children.push(id);
        node.by_segment.insert(segment, id);
        id
    }

    pub fn is_complete(&self, id: NodeId) -> bool {
        self.node(id).complete
    }

    pub fn children_known(&self, id: NodeId) -> bool {
        self.node(id).children_known
    }

    /// The block ran to its end: all direct children have been observed.
    pub fn mark_children_known(&mut self, id: NodeId) {
        self.node_mut(id).children_known = true;
    }

    /// Mark a node complete regardless of its children.
    pub fn force_complete(&mut self, id: NodeId) {
        self.node_mut(id).complete = true;
    }

    /// Recompute completeness of `id` from its children. Returns the new state.
    pub fn refresh(&mut self, id: NodeId) -> bool {
        let node = self.node(id);
        if node.complete {
            return true;
        }
        let complete =
            node.children_known && node.children.iter().all(|&c| self.node(c).complete);
        self.node_mut(id).complete = complete;
        complete
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Full path of a node.
    pub fn path(&self, id: NodeId) -> CheckpointPath {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if let Some(segment) = &node.segment {
                segments.push(segment.clone());
            }
            cursor = node.parent;
        }
        segments.into_iter().rev().collect()
    }

    /// Path and description of a node, as reported to observers.
    pub fn info(&self, id: NodeId) -> CheckpointInfo {
        CheckpointInfo::new(self.path(id), self.node(id).description.clone())
    }

    /// Paths of every observed node with no children, in body order.
    pub fn leaf_paths(&self) -> Vec<CheckpointPath> {
        let mut leaves = Vec::new();
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.children.is_empty() {
                if id != NodeId::ROOT {
                    leaves.push(self.path(id));
                }
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        leaves
    }
}

impl Default for CheckpointTree {
    fn default() -> Self {
        Self::new()
    }
}
