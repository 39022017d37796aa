//! Checkpoint addressing.
//!
//! A checkpoint is addressed by its nesting path from the test body's
//! root: the ordered `(name, occurrence)` pairs down to it. `occurrence`
//! disambiguates same-named siblings by the order they are reached in the
//! body (0 for the first). Two checkpoints are the same node iff their
//! paths are equal.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// One step of a checkpoint path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSegment {
    name: Arc<str>,
    occurrence: u32,
}

impl PathSegment {
    pub fn new(name: impl Into<Arc<str>>, occurrence: u32) -> Self {
        PathSegment {
            name: name.into(),
            occurrence,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn occurrence(&self) -> u32 {
        self.occurrence
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}#{}", self.name, self.occurrence)
        }
    }
}

/// Nesting path of a checkpoint. The empty path is the test body itself.
///
/// Most bodies nest only a few levels deep, so segments are stored inline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointPath(SmallVec<[PathSegment; 4]>);

impl CheckpointPath {
    /// The body root.
    pub fn root() -> Self {
        CheckpointPath(SmallVec::new())
    }

    /// Path of a child of `self`.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        CheckpointPath(segments)
    }

    /// Path of the enclosing checkpoint, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(CheckpointPath(rest.iter().cloned().collect()))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Nesting depth; the root is depth 0.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Innermost segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// True if `self` equals `other` or lies above it.
    pub fn is_prefix_of(&self, other: &CheckpointPath) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for CheckpointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for CheckpointPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        CheckpointPath(iter.into_iter().collect())
    }
}

/// What a reporter learns about a checkpoint when it is entered or left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointInfo {
    pub path: CheckpointPath,
    pub description: String,
}

impl CheckpointInfo {
    pub fn new(path: CheckpointPath, description: impl Into<String>) -> Self {
        CheckpointInfo {
            path,
            description: description.into(),
        }
    }

    /// Name of the checkpoint itself (the last path segment).
    pub fn name(&self) -> &str {
        self.path.last().map_or("", PathSegment::name)
    }
}
