//! Branching script editor core for frame-timed TAS input
//!
//! `tas-editor` holds a script as a tree of plain-text segments interleaved
//! with branch points, each branch point carrying named alternative
//! timelines of which one is active. Every mutation is an undoable command,
//! and recordings made in the game can be merged back into the script.
//!
//! # Features
//!
//! - **Script tree**: value-semantics segments and branch points addressed
//!   by coordinates, with stable handles for UI elements
//! - **Undo/redo**: every edit is an invertible command, typing bursts
//!   coalesce into one history entry
//! - **Branch operations**: create from a caret or selection, accept, delete,
//!   add, remove, switch and rename branches
//! - **Reconciliation**: a recorded take is matched frame by frame against
//!   the script and forks a `recorded` branch where it diverges
//! - **Formats**: line-oriented markup import/export, legacy flat scripts
//!   transcoded on import
//!
//! # Example
//!
//! ```
//! use tas_editor::{Buttons, InputLine, Position, ReconcileOutcome, ScriptDocument};
//!
//! let mut doc = ScriptDocument::from_text("downhill", "  10,R\n  20,R");
//! let segment = doc.root().nodes()[0].handle();
//!
//! // Hold jump for the second run of frames
//! doc.insert(segment, Position::new(13), "J").unwrap();
//! assert_eq!(doc.text(), "  10,R\n  20,RJ");
//!
//! // A take that jumps five frames late forks the script
//! let take = [
//!     InputLine::new(15, Buttons::RIGHT),
//!     InputLine::new(15, Buttons::RIGHT | Buttons::JUMP),
//! ];
//! let outcome = doc.reconcile("downhill", &take, false).unwrap();
//! assert!(matches!(outcome, ReconcileOutcome::Forked { .. }));
//! assert_eq!(doc.text(), "  10,R\n   5,R\n  15,RJ");
//!
//! // Undo drops the fork again
//! doc.undo().unwrap();
//! assert_eq!(doc.text(), "  10,R\n  20,RJ");
//! ```

#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod commands;
pub mod core;
pub mod events;
pub mod reconcile;
pub mod recording;

#[cfg(feature = "formats")]
pub mod formats;

// Re-export tas-core types as first-class citizens
pub use tas_core::{
    classify_line, lines_to_presses, parse_line, presses_to_lines, Buttons, InputLine,
    LineFormat, LineKind, Press, PressKind,
};

// Public API exports
pub use crate::commands::{BranchNames, Edit, EditCommand, TextEdit};
pub use crate::core::{
    Branch, BranchPoint, Coordinate, EditHistory, EditorConfig, EditorError, FocusRestore,
    Handle, HistoryConfig, HistoryStats, MatchKind, Node, NodeRef, Position, Range, Result,
    ScriptDocument, Segment,
};
pub use events::{DocumentEvent, EventFilter};
pub use reconcile::{ReconcileOutcome, Reconciliation};
pub use recording::{spawn_listener, RecordedTake, RecordingInbox};

#[cfg(feature = "formats")]
pub use formats::{FormatOptions, FormatRegistry, ImportedScript};

/// Crate version for runtime compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
