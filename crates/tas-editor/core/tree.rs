//! Script tree: segments interleaved with branch points
//!
//! The tree is plain owned data. Cloning a node copies the whole subtree, so a
//! snapshot stored in a history entry can never observe later edits to the
//! live document.
//!
//! Every [`Segment`] and every [`BranchPoint`] header carries a [`Handle`]
//! identifying the widget that displays it. Handles survive undo and redo
//! because snapshots are cloned, and are refreshed by [`Branch::duplicate`]
//! so that the live tree never holds the same handle twice.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tas_core::{classify_line, LineKind};

use super::address::Coordinate;
use super::errors::{EditorError, Result};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of the UI element showing a segment or branch header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Allocate a handle never returned before in this process
    #[must_use]
    pub fn fresh() -> Self {
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A contiguous run of raw script lines without alternatives
#[derive(Debug, Clone)]
pub struct Segment {
    handle: Handle,
    text: String,
}

impl Segment {
    /// Create a segment with a fresh handle
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_handle(Handle::fresh(), text)
    }

    pub(crate) fn with_handle(handle: Handle, text: impl Into<String>) -> Self {
        Self {
            handle,
            text: text.into(),
        }
    }

    /// Handle of the widget showing this segment
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    /// Raw text, lines joined by `\n`
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    /// Raw lines of the segment
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Index of the line containing byte `offset`
    #[must_use]
    pub fn line_at(&self, offset: usize) -> usize {
        let end = offset.min(self.text.len());
        self.text.as_bytes()[..end]
            .iter()
            .filter(|byte| **byte == b'\n')
            .count()
    }

    /// Byte offset where line `line` starts; the text length past the last line
    #[must_use]
    pub fn line_start_offset(&self, line: usize) -> usize {
        if line == 0 {
            return 0;
        }
        self.text
            .match_indices('\n')
            .nth(line - 1)
            .map_or(self.text.len(), |(index, _)| index + 1)
    }

    /// Frames covered by the segment's input lines
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.lines()
            .filter_map(|line| match classify_line(line) {
                LineKind::Input(input) => Some(u64::from(input.frames)),
                _ => None,
            })
            .sum()
    }

    /// Copy with a fresh handle
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::new(self.text.clone())
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Segment {}

/// A fork holding alternative branches and the index of the active one
#[derive(Debug, Clone)]
pub struct BranchPoint {
    header: Handle,
    branches: Vec<Branch>,
    active: usize,
}

impl BranchPoint {
    /// Create a branch point with a fresh header handle
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidBranchPoint`] when `branches` is empty or
    /// `active` is out of range.
    pub fn new(branches: Vec<Branch>, active: usize) -> Result<Self> {
        if branches.is_empty() {
            return Err(EditorError::branch_point("a branch point needs at least one branch"));
        }
        if active >= branches.len() {
            return Err(EditorError::branch_point(format!(
                "active index {active} out of range for {} branches",
                branches.len()
            )));
        }
        Ok(Self {
            header: Handle::fresh(),
            branches,
            active,
        })
    }

    /// Handle of the branch name header widget
    #[must_use]
    pub const fn header(&self) -> Handle {
        self.header
    }

    /// All branches in display order
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub(crate) fn branches_mut(&mut self) -> &mut Vec<Branch> {
        &mut self.branches
    }

    /// Index of the active branch
    #[must_use]
    pub const fn active_index(&self) -> usize {
        self.active
    }

    pub(crate) fn set_active_index(&mut self, active: usize) {
        self.active = active;
    }

    /// The branch whose content is shown, played and merged into
    #[must_use]
    pub fn active_branch(&self) -> &Branch {
        &self.branches[self.active]
    }

    /// Number of branches
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Always false for a well-formed branch point
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Deep copy with fresh handles throughout
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            header: Handle::fresh(),
            branches: self.branches.iter().map(Branch::duplicate).collect(),
            active: self.active,
        }
    }
}

impl PartialEq for BranchPoint {
    fn eq(&self, other: &Self) -> bool {
        self.active == other.active && self.branches == other.branches
    }
}

impl Eq for BranchPoint {}

/// A named alternative timeline; the document root is an unnamed branch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Branch {
    name: String,
    nodes: Vec<Node>,
}

impl Branch {
    /// Create a branch from its nodes
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// A root holding a single segment with `text`
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(String::new(), vec![Node::Segment(Segment::new(text))])
    }

    /// Branch name, free text and not necessarily unique
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) -> String {
        core::mem::replace(&mut self.name, name)
    }

    /// Child nodes in order
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    /// Rendered text: node texts joined by `\n`, active branches only
    #[must_use]
    pub fn active_text(&self) -> String {
        let mut out = String::new();
        self.write_active_text(&mut out);
        out
    }

    fn write_active_text(&self, out: &mut String) {
        for (index, node) in self.nodes.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            match node {
                Node::Segment(segment) => out.push_str(segment.text()),
                Node::BranchPoint(point) => point.active_branch().write_active_text(out),
            }
        }
    }

    /// Frames played through this branch following active branches
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.nodes
            .iter()
            .map(|node| match node {
                Node::Segment(segment) => segment.frames(),
                Node::BranchPoint(point) => point.active_branch().total_frames(),
            })
            .sum()
    }

    /// Every reachable segment in play order with its starting frame
    ///
    /// Pre-order walk descending only into active branches. Coordinates are
    /// relative to `self`.
    #[must_use]
    pub fn segments_by_start_frame(&self) -> Vec<SegmentEntry<'_>> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        let mut frame = 0;
        self.collect_segments(&mut prefix, &mut frame, &mut out);
        out
    }

    fn collect_segments<'a>(
        &'a self,
        prefix: &mut Vec<usize>,
        frame: &mut u64,
        out: &mut Vec<SegmentEntry<'a>>,
    ) {
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Segment(segment) => {
                    let mut path = prefix.clone();
                    path.push(index);
                    out.push(SegmentEntry {
                        coordinate: Coordinate::from(path),
                        start_frame: *frame,
                        segment,
                    });
                    *frame += segment.frames();
                }
                Node::BranchPoint(point) => {
                    prefix.push(index);
                    prefix.push(point.active_index());
                    point.active_branch().collect_segments(prefix, frame, out);
                    prefix.truncate(prefix.len() - 2);
                }
            }
        }
    }

    /// Deep copy with fresh handles throughout
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            name: self.name.clone(),
            nodes: self.nodes.iter().map(Node::duplicate).collect(),
        }
    }
}

/// One entry of [`Branch::segments_by_start_frame`]
#[derive(Debug, Clone)]
pub struct SegmentEntry<'a> {
    /// Where the segment sits
    pub coordinate: Coordinate,
    /// Frames played before the segment starts
    pub start_frame: u64,
    /// The segment itself
    pub segment: &'a Segment,
}

/// Element of a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Plain lines
    Segment(Segment),
    /// Nested alternatives
    BranchPoint(BranchPoint),
}

impl Node {
    /// Rendered text following active branches
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Segment(segment) => segment.text().to_string(),
            Self::BranchPoint(point) => point.active_branch().active_text(),
        }
    }

    /// Segment handle or branch point header handle
    #[must_use]
    pub const fn handle(&self) -> Handle {
        match self {
            Self::Segment(segment) => segment.handle(),
            Self::BranchPoint(point) => point.header(),
        }
    }

    /// Human readable kind, used in error messages
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Segment(_) => "segment",
            Self::BranchPoint(_) => "branch point",
        }
    }

    /// The segment, if this node is one
    #[must_use]
    pub const fn as_segment(&self) -> Option<&Segment> {
        match self {
            Self::Segment(segment) => Some(segment),
            Self::BranchPoint(_) => None,
        }
    }

    /// Deep copy with fresh handles throughout
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Segment(segment) => Self::Segment(segment.duplicate()),
            Self::BranchPoint(point) => Self::BranchPoint(point.duplicate()),
        }
    }
}
