//! Core types and structures for the tas-editor
//!
//! This module contains the fundamental building blocks of the editor:
//! - `ScriptDocument`: owns one script tree and its history
//! - The script tree itself and coordinate addressing into it
//! - Position and range types for carets and selections inside segments
//! - Error types for editor operations
//! - History management for undo/redo

pub mod address;
pub mod document;
pub mod errors;
pub mod fluent;
pub mod history;
pub mod position;
pub mod tree;

// Re-export commonly used types
pub use address::{Coordinate, MatchKind, NodeMut, NodeRef};
pub use document::{EditorConfig, FocusRestore, ScriptDocument};
pub use errors::{EditorError, Result};
pub use fluent::{AtPosition, SegmentEditor, SelectRange};
pub use history::{EditHistory, HistoryConfig, HistoryStats};
pub use position::{Position, Range};
pub use tree::{Branch, BranchPoint, Handle, Node, Segment, SegmentEntry};
