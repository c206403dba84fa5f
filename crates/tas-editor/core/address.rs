//! Path addressing inside the script tree
//!
//! A [`Coordinate`] reads pairwise: each `(node, branch)` pair descends into
//! a branch point, and a trailing single index selects a node inside the
//! innermost branch. Even lengths therefore name a branch (the empty
//! coordinate is the root) and odd lengths name a node.
//!
//! Coordinates describe one snapshot of the tree. They are recomputed from a
//! [`Handle`] with [`Branch::locate`] whenever needed and never adjusted in
//! place after a structural edit.

use core::fmt;

use super::errors::{EditorError, Result};
use super::tree::{Branch, BranchPoint, Handle, Node, Segment};

/// Integer path from the root to a branch or node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Coordinate(Vec<usize>);

impl Coordinate {
    /// The root branch
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Raw indices
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Number of indices
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root coordinate
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the coordinate names a branch
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.0.len() % 2 == 0
    }

    /// Whether the coordinate names a node
    #[must_use]
    pub fn is_node(&self) -> bool {
        !self.is_branch()
    }

    /// Coordinate of node `index` inside this branch
    #[must_use]
    pub fn node(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// Coordinate of branch `index` of the branch point this names
    #[must_use]
    pub fn branch(&self, index: usize) -> Self {
        self.node(index)
    }

    /// Split a node coordinate into its containing branch and node index
    #[must_use]
    pub fn split_node(&self) -> Option<(Self, usize)> {
        if !self.is_node() {
            return None;
        }
        let (last, parent) = self.0.split_last()?;
        Some((Self(parent.to_vec()), *last))
    }

    /// The branch point enclosing this node or branch
    ///
    /// `None` for the root and for nodes directly inside the root.
    #[must_use]
    pub fn enclosing_branch_point(&self) -> Option<Self> {
        let keep = if self.is_node() {
            self.0.len().checked_sub(2).filter(|keep| *keep > 0)?
        } else {
            self.0.len().checked_sub(1)?
        };
        Some(Self(self.0[..keep].to_vec()))
    }
}

impl From<Vec<usize>> for Coordinate {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// How [`Branch::locate`] post-processes a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The exact matched node
    Any,
    /// Only segments; a branch point header gives `None`
    Segment,
    /// The branch point enclosing the match, or the match itself if it is a
    /// branch point header
    BranchGroupContaining,
}

/// Borrowed view of whatever a coordinate names
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// A branch, including the root
    Branch(&'a Branch),
    /// A segment node
    Segment(&'a Segment),
    /// A branch point node
    BranchPoint(&'a BranchPoint),
}

impl<'a> NodeRef<'a> {
    /// Human readable kind, used in error messages
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Branch(_) => "branch",
            Self::Segment(_) => "segment",
            Self::BranchPoint(_) => "branch point",
        }
    }

    /// The segment, if that is what was resolved
    #[must_use]
    pub const fn as_segment(&self) -> Option<&'a Segment> {
        match self {
            Self::Segment(segment) => Some(segment),
            _ => None,
        }
    }

    /// The branch point, if that is what was resolved
    #[must_use]
    pub const fn as_branch_point(&self) -> Option<&'a BranchPoint> {
        match self {
            Self::BranchPoint(point) => Some(point),
            _ => None,
        }
    }

    /// The branch, if that is what was resolved
    #[must_use]
    pub const fn as_branch(&self) -> Option<&'a Branch> {
        match self {
            Self::Branch(branch) => Some(branch),
            _ => None,
        }
    }
}

/// Mutable view of whatever a coordinate names
#[derive(Debug)]
pub enum NodeMut<'a> {
    /// A branch, including the root
    Branch(&'a mut Branch),
    /// A segment node
    Segment(&'a mut Segment),
    /// A branch point node
    BranchPoint(&'a mut BranchPoint),
}

impl<'a> NodeMut<'a> {
    /// Human readable kind, used in error messages
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Branch(_) => "branch",
            Self::Segment(_) => "segment",
            Self::BranchPoint(_) => "branch point",
        }
    }

    /// Require a segment for `command`
    ///
    /// # Errors
    /// Returns [`EditorError::UnsupportedCommand`] for any other kind.
    pub fn into_segment(self, command: &'static str, at: &Coordinate) -> Result<&'a mut Segment> {
        match self {
            Self::Segment(segment) => Ok(segment),
            other => Err(EditorError::unsupported(command, other.kind_name(), at)),
        }
    }

    /// Require a branch point for `command`
    ///
    /// # Errors
    /// Returns [`EditorError::UnsupportedCommand`] for any other kind.
    pub fn into_branch_point(
        self,
        command: &'static str,
        at: &Coordinate,
    ) -> Result<&'a mut BranchPoint> {
        match self {
            Self::BranchPoint(point) => Ok(point),
            other => Err(EditorError::unsupported(command, other.kind_name(), at)),
        }
    }

    /// Require a branch for `command`
    ///
    /// # Errors
    /// Returns [`EditorError::UnsupportedCommand`] for any other kind.
    pub fn into_branch(self, command: &'static str, at: &Coordinate) -> Result<&'a mut Branch> {
        match self {
            Self::Branch(branch) => Ok(branch),
            other => Err(EditorError::unsupported(command, other.kind_name(), at)),
        }
    }
}

enum Hit {
    Segment,
    Header,
}

impl Branch {
    /// Resolve a coordinate relative to this branch
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidAddress`] when an index is out of range
    /// or a pair tries to descend into a segment.
    pub fn resolve(&self, coordinate: &Coordinate) -> Result<NodeRef<'_>> {
        descend(self, coordinate.as_slice(), coordinate)
    }

    /// Resolve a coordinate relative to this branch for mutation
    ///
    /// # Errors
    /// Same as [`Branch::resolve`].
    pub fn resolve_mut(&mut self, coordinate: &Coordinate) -> Result<NodeMut<'_>> {
        descend_mut(self, coordinate.as_slice(), coordinate)
    }

    /// Find the coordinate of the segment or header owning `handle`
    ///
    /// Searches in pre-order through active branches only.
    #[must_use]
    pub fn locate(&self, handle: Handle, kind: MatchKind) -> Option<Coordinate> {
        let mut path = Vec::new();
        let hit = self.search(handle, &mut path)?;
        let coordinate = Coordinate(path);
        match (kind, hit) {
            (MatchKind::Any, _) | (MatchKind::Segment, Hit::Segment) => Some(coordinate),
            (MatchKind::Segment, Hit::Header) => None,
            (MatchKind::BranchGroupContaining, Hit::Header) => Some(coordinate),
            (MatchKind::BranchGroupContaining, Hit::Segment) => coordinate.enclosing_branch_point(),
        }
    }

    fn search(&self, handle: Handle, path: &mut Vec<usize>) -> Option<Hit> {
        for (index, node) in self.nodes().iter().enumerate() {
            path.push(index);
            match node {
                Node::Segment(segment) if segment.handle() == handle => return Some(Hit::Segment),
                Node::Segment(_) => {}
                Node::BranchPoint(point) if point.header() == handle => return Some(Hit::Header),
                Node::BranchPoint(point) => {
                    path.push(point.active_index());
                    if let Some(hit) = point.active_branch().search(handle, path) {
                        return Some(hit);
                    }
                    path.pop();
                }
            }
            path.pop();
        }
        None
    }

    /// Handle of the segment or header a coordinate names
    ///
    /// `None` when the coordinate names a branch or no longer resolves.
    #[must_use]
    pub fn handle_at(&self, coordinate: &Coordinate) -> Option<Handle> {
        match self.resolve(coordinate).ok()? {
            NodeRef::Segment(segment) => Some(segment.handle()),
            NodeRef::BranchPoint(point) => Some(point.header()),
            NodeRef::Branch(_) => None,
        }
    }
}

fn out_of_range(coordinate: &Coordinate, what: &str, index: usize, len: usize) -> EditorError {
    EditorError::invalid_address(
        coordinate,
        format!("{what} index {index} out of range ({len} available)"),
    )
}

fn descend<'a>(branch: &'a Branch, path: &[usize], full: &Coordinate) -> Result<NodeRef<'a>> {
    match path {
        [] => Ok(NodeRef::Branch(branch)),
        [node] => match branch.nodes().get(*node) {
            Some(Node::Segment(segment)) => Ok(NodeRef::Segment(segment)),
            Some(Node::BranchPoint(point)) => Ok(NodeRef::BranchPoint(point)),
            None => Err(out_of_range(full, "node", *node, branch.nodes().len())),
        },
        [node, index, tail @ ..] => match branch.nodes().get(*node) {
            Some(Node::BranchPoint(point)) => match point.branches().get(*index) {
                Some(next) => descend(next, tail, full),
                None => Err(out_of_range(full, "branch", *index, point.len())),
            },
            Some(Node::Segment(_)) => Err(EditorError::invalid_address(
                full,
                format!("node {node} is a segment and has no branches"),
            )),
            None => Err(out_of_range(full, "node", *node, branch.nodes().len())),
        },
    }
}

fn descend_mut<'a>(
    branch: &'a mut Branch,
    path: &[usize],
    full: &Coordinate,
) -> Result<NodeMut<'a>> {
    match path {
        [] => Ok(NodeMut::Branch(branch)),
        [node] => {
            let len = branch.nodes().len();
            match branch.nodes_mut().get_mut(*node) {
                Some(Node::Segment(segment)) => Ok(NodeMut::Segment(segment)),
                Some(Node::BranchPoint(point)) => Ok(NodeMut::BranchPoint(point)),
                None => Err(out_of_range(full, "node", *node, len)),
            }
        }
        [node, index, tail @ ..] => {
            let len = branch.nodes().len();
            match branch.nodes_mut().get_mut(*node) {
                Some(Node::BranchPoint(point)) => {
                    let branches = point.len();
                    match point.branches_mut().get_mut(*index) {
                        Some(next) => descend_mut(next, tail, full),
                        None => Err(out_of_range(full, "branch", *index, branches)),
                    }
                }
                Some(Node::Segment(_)) => Err(EditorError::invalid_address(
                    full,
                    format!("node {node} is a segment and has no branches"),
                )),
                None => Err(out_of_range(full, "node", *node, len)),
            }
        }
    }
}
