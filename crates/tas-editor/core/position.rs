//! Caret and selection types for segment editing
//!
//! Offsets are byte offsets into a single segment's text. A [`Range`] with
//! equal ends is a caret; anything wider is a selection.

use core::cmp::{max, min};
use core::fmt;

use crate::core::errors::{EditorError, Result};

/// A byte offset inside a segment's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Byte offset from the start of the segment
    pub offset: usize,
}

impl Position {
    /// Create a new position from byte offset
    #[must_use]
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Create a position at the start of the segment
    #[must_use]
    pub const fn start() -> Self {
        Self { offset: 0 }
    }

    /// Advance position by given bytes
    #[must_use]
    pub const fn advance(&self, bytes: usize) -> Self {
        Self {
            offset: self.offset.saturating_add(bytes),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.offset)
    }
}

/// A span of a segment's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Range {
    /// Create a new range
    ///
    /// Automatically normalizes so start <= end
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start: min(start, end),
            end: max(start, end),
        }
    }

    /// An empty range at a caret position
    #[must_use]
    pub const fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Whether the range is a bare caret
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    /// Check the range lies inside `text` on character boundaries
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidRange`] when either end is past the text
    /// or splits a multi-byte character.
    pub fn validate(&self, text: &str) -> Result<()> {
        let valid = self.end.offset <= text.len()
            && text.is_char_boundary(self.start.offset)
            && text.is_char_boundary(self.end.offset);
        if valid {
            Ok(())
        } else {
            Err(EditorError::InvalidRange {
                start: self.start.offset,
                end: self.end.offset,
                length: text.len(),
            })
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
