//! Text edits inside a single segment
//!
//! A [`TextEdit`] replaces `removed` with `inserted` at a byte offset. Both
//! directions check that the text they are about to replace is exactly what
//! the edit expects, so a history entry replayed against the wrong tree fails
//! instead of corrupting it.

use tas_core::{reformat_line, Buttons, LineFormat};

use crate::core::address::Coordinate;
use crate::core::errors::{EditorError, Result};
use crate::core::position::{Position, Range};
use crate::core::tree::Branch;

const COMMAND: &str = "text edit";

/// Replace a span of one segment's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Coordinate of the segment
    pub target: Coordinate,
    /// Byte offset of the edit
    pub position: usize,
    /// Text present before the edit
    pub removed: String,
    /// Text present after the edit
    pub inserted: String,
    /// Caret to restore on undo
    pub cursor_before: Position,
    /// Caret to restore on redo
    pub cursor_after: Position,
}

impl TextEdit {
    /// Insert `text` at `at`
    ///
    /// # Errors
    /// Fails when `target` is not a segment or `at` is not a valid offset.
    pub fn insert(
        root: &Branch,
        target: Coordinate,
        at: Position,
        text: impl Into<String>,
    ) -> Result<Self> {
        Self::replace(root, target, Range::caret(at), text)
    }

    /// Delete the text in `range`
    ///
    /// # Errors
    /// Fails when `target` is not a segment or `range` is out of bounds.
    pub fn delete(root: &Branch, target: Coordinate, range: Range) -> Result<Self> {
        Self::replace(root, target, range, String::new())
    }

    /// Replace the text in `range` with `text`
    ///
    /// # Errors
    /// Fails when `target` is not a segment or `range` is out of bounds.
    pub fn replace(
        root: &Branch,
        target: Coordinate,
        range: Range,
        text: impl Into<String>,
    ) -> Result<Self> {
        let node = root.resolve(&target)?;
        let segment = node
            .as_segment()
            .ok_or_else(|| EditorError::unsupported(COMMAND, node.kind_name(), &target))?;
        range.validate(segment.text())?;
        let inserted = text.into();
        let cursor_after = range.start.advance(inserted.len());
        Ok(Self {
            removed: segment.text()[range.start.offset..range.end.offset].to_string(),
            position: range.start.offset,
            inserted,
            cursor_before: range.end,
            cursor_after,
            target,
        })
    }

    /// Normalize line `line` of a segment, resolving direction conflicts
    ///
    /// Returns `None` for non-input lines and lines already in canonical form.
    ///
    /// # Errors
    /// Fails when `target` is not a segment or has no such line.
    pub fn reformat_line(
        root: &Branch,
        target: Coordinate,
        line: usize,
        typed: Option<Buttons>,
        format: &LineFormat,
    ) -> Result<Option<Self>> {
        let node = root.resolve(&target)?;
        let segment = node
            .as_segment()
            .ok_or_else(|| EditorError::unsupported(COMMAND, node.kind_name(), &target))?;
        let Some(original) = segment.lines().nth(line) else {
            return Err(EditorError::invalid_address(
                &target,
                format!("segment has no line {line}"),
            ));
        };
        let Some(formatted) = reformat_line(original, typed, format) else {
            return Ok(None);
        };
        if formatted == original {
            return Ok(None);
        }
        let start = segment.line_start_offset(line);
        let range = Range::new(Position::new(start), Position::new(start + original.len()));
        Self::replace(root, target, range, formatted).map(Some)
    }

    /// Apply the edit to the tree
    ///
    /// # Errors
    /// Fails without mutating when the segment does not contain `removed` at
    /// `position`.
    pub fn apply(&self, root: &mut Branch) -> Result<()> {
        self.splice(root, &self.removed, &self.inserted)
    }

    /// Undo the edit
    ///
    /// # Errors
    /// Fails without mutating when the segment does not contain `inserted` at
    /// `position`.
    pub fn revert(&self, root: &mut Branch) -> Result<()> {
        self.splice(root, &self.inserted, &self.removed)
    }

    fn splice(&self, root: &mut Branch, expected: &str, replacement: &str) -> Result<()> {
        let segment = root
            .resolve_mut(&self.target)?
            .into_segment(COMMAND, &self.target)?;
        let end = self.position + expected.len();
        Range::new(Position::new(self.position), Position::new(end)).validate(segment.text())?;
        if &segment.text()[self.position..end] != expected {
            return Err(EditorError::history(format!(
                "segment at {} no longer holds {expected:?} at offset {}",
                self.target, self.position
            )));
        }
        segment
            .text_mut()
            .replace_range(self.position..end, replacement);
        Ok(())
    }

    /// Merge `next` into this edit if it continues the same typing burst
    ///
    /// `next` must have been applied right after `self`. It continues the
    /// burst when it starts where this edit's insertion ends, or ends where
    /// this edit starts.
    #[must_use]
    pub fn coalesce(&self, next: &Self) -> Option<Self> {
        if self.target != next.target {
            return None;
        }
        if next.position == self.position + self.inserted.len() {
            return Some(Self {
                target: self.target.clone(),
                position: self.position,
                removed: format!("{}{}", self.removed, next.removed),
                inserted: format!("{}{}", self.inserted, next.inserted),
                cursor_before: self.cursor_before,
                cursor_after: next.cursor_after,
            });
        }
        if next.position + next.removed.len() == self.position {
            return Some(Self {
                target: self.target.clone(),
                position: next.position,
                removed: format!("{}{}", next.removed, self.removed),
                inserted: format!("{}{}", next.inserted, self.inserted),
                cursor_before: self.cursor_before,
                cursor_after: next.cursor_after,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tree::{BranchPoint, Node, Segment};
    use pretty_assertions::assert_eq;

    fn root(text: &str) -> Branch {
        Branch::from_text(text)
    }

    fn first() -> Coordinate {
        Coordinate::from(vec![0])
    }

    #[test]
    fn insert_apply_revert() {
        let mut tree = root("  10,R");
        let edit = TextEdit::insert(&tree, first(), Position::new(6), "J").unwrap();
        edit.apply(&mut tree).unwrap();
        assert_eq!(tree.active_text(), "  10,RJ");
        edit.revert(&mut tree).unwrap();
        assert_eq!(tree.active_text(), "  10,R");
    }

    #[test]
    fn apply_refuses_mismatched_text() {
        let mut tree = root("  10,R");
        let edit = TextEdit::delete(
            &tree,
            first(),
            Range::new(Position::new(5), Position::new(6)),
        )
        .unwrap();
        edit.apply(&mut tree).unwrap();
        let err = edit.apply(&mut tree).unwrap_err();
        assert!(err.is_history_error());
        assert_eq!(tree.active_text(), "  10,");
    }

    #[test]
    fn text_edit_on_branch_point_is_unsupported() {
        let point = BranchPoint::new(
            vec![Branch::from_text("a"), Branch::from_text("b")],
            0,
        )
        .unwrap();
        let tree = Branch::new("", vec![Node::BranchPoint(point)]);
        let err = TextEdit::insert(&tree, first(), Position::start(), "x").unwrap_err();
        assert!(matches!(err, EditorError::UnsupportedCommand { .. }));
    }

    #[test]
    fn coalesce_typing_forward() {
        let mut tree = root("");
        let a = TextEdit::insert(&tree, first(), Position::new(0), "1").unwrap();
        a.apply(&mut tree).unwrap();
        let b = TextEdit::insert(&tree, first(), Position::new(1), "0").unwrap();
        let merged = a.coalesce(&b).unwrap();
        assert_eq!(merged.inserted, "10");
        assert_eq!(merged.position, 0);
        assert_eq!(merged.cursor_after, Position::new(2));
    }

    #[test]
    fn coalesce_backspace_burst() {
        let mut tree = root("  10,RJ");
        let a = TextEdit::delete(&tree, first(), Range::new(Position::new(6), Position::new(7)))
            .unwrap();
        a.apply(&mut tree).unwrap();
        let b = TextEdit::delete(&tree, first(), Range::new(Position::new(5), Position::new(6)))
            .unwrap();
        b.apply(&mut tree).unwrap();
        let merged = a.coalesce(&b).unwrap();
        assert_eq!(merged.removed, "RJ");
        assert_eq!(merged.position, 5);

        merged.revert(&mut tree).unwrap();
        assert_eq!(tree.active_text(), "  10,RJ");
    }

    #[test]
    fn no_coalesce_across_gap_or_segment() {
        let tree = Branch::new(
            "",
            vec![
                Node::Segment(Segment::new("abc")),
                Node::Segment(Segment::new("def")),
            ],
        );
        let a = TextEdit::insert(&tree, first(), Position::new(0), "x").unwrap();
        let gap = TextEdit::insert(&tree, first(), Position::new(3), "y").unwrap();
        let other =
            TextEdit::insert(&tree, Coordinate::from(vec![1]), Position::new(1), "z").unwrap();
        assert_eq!(a.coalesce(&gap), None);
        assert_eq!(a.coalesce(&other), None);
    }

    #[test]
    fn reformat_line_builds_replacement() {
        let tree = root("# intro\n10 jr\n  20,RJ");
        let format = LineFormat::default();
        let edit = TextEdit::reformat_line(&tree, first(), 1, None, &format)
            .unwrap()
            .unwrap();
        assert_eq!(edit.removed, "10 jr");
        assert_eq!(edit.inserted, "  10,RJ");
        assert_eq!(edit.position, 8);
        assert_eq!(TextEdit::reformat_line(&tree, first(), 0, None, &format).unwrap(), None);
        assert_eq!(TextEdit::reformat_line(&tree, first(), 2, None, &format).unwrap(), None);
        assert!(TextEdit::reformat_line(&tree, first(), 3, None, &format).is_err());
    }
}
