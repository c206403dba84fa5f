//! Fluent API for segment editing
//!
//! Provides a builder over one segment of a [`ScriptDocument`]:
//! ```
//! # use tas_editor::{Position, Range, ScriptDocument};
//! let mut doc = ScriptDocument::from_text("downhill", "  10,R");
//! let segment = doc.root().nodes()[0].handle();
//! doc.segment(segment).at(Position::new(6)).insert_text("J").unwrap();
//! doc.segment(segment)
//!     .select(Range::new(Position::new(0), Position::new(4)))
//!     .replace_text("  12")
//!     .unwrap();
//! assert_eq!(doc.text(), "  12,RJ");
//! ```

use tas_core::Buttons;

use super::document::ScriptDocument;
use super::errors::Result;
use super::position::{Position, Range};
use super::tree::Handle;

/// Edits addressed to one segment by handle
pub struct SegmentEditor<'a> {
    document: &'a mut ScriptDocument,
    segment: Handle,
}

impl<'a> SegmentEditor<'a> {
    /// Place a caret in the segment
    #[must_use]
    pub fn at(self, position: Position) -> AtPosition<'a> {
        AtPosition {
            document: self.document,
            segment: self.segment,
            position,
        }
    }

    /// Select a range of the segment
    #[must_use]
    pub fn select(self, range: Range) -> SelectRange<'a> {
        SelectRange {
            document: self.document,
            segment: self.segment,
            range,
        }
    }

    /// Normalize line `line`, preferring `typed` on direction conflicts
    ///
    /// # Errors
    /// Fails when the segment is unknown or has no such line.
    pub fn reformat_line(self, line: usize, typed: Option<Buttons>) -> Result<bool> {
        self.document.reformat_line(self.segment, line, typed)
    }
}

/// Caret inside a segment
pub struct AtPosition<'a> {
    document: &'a mut ScriptDocument,
    segment: Handle,
    position: Position,
}

impl AtPosition<'_> {
    /// Insert text at the caret
    ///
    /// # Errors
    /// Fails when the caret is out of bounds.
    pub fn insert_text(self, text: &str) -> Result<()> {
        self.document.insert(self.segment, self.position, text)
    }

    /// Fork a bottomless branch point at the caret's line
    ///
    /// # Errors
    /// Fails when the caret is out of bounds.
    pub fn branch(self) -> Result<()> {
        self.document
            .create_branch_point(self.segment, Range::caret(self.position))
    }
}

/// Selection inside a segment
pub struct SelectRange<'a> {
    document: &'a mut ScriptDocument,
    segment: Handle,
    range: Range,
}

impl SelectRange<'_> {
    /// Replace the selection
    ///
    /// # Errors
    /// Fails when the selection is out of bounds.
    pub fn replace_text(self, text: &str) -> Result<()> {
        self.document.replace(self.segment, self.range, text)
    }

    /// Delete the selection
    ///
    /// # Errors
    /// Fails when the selection is out of bounds.
    pub fn delete(self) -> Result<()> {
        self.document.delete(self.segment, self.range)
    }

    /// Wrap the selected lines in a branch point
    ///
    /// # Errors
    /// Fails when the selection is out of bounds.
    pub fn branch(self) -> Result<()> {
        self.document.create_branch_point(self.segment, self.range)
    }
}

impl ScriptDocument {
    /// Start a fluent edit of one segment
    pub fn segment(&mut self, segment: Handle) -> SegmentEditor<'_> {
        SegmentEditor {
            document: self,
            segment,
        }
    }
}
