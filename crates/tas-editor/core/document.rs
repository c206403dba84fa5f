//! Main document type for the editor
//!
//! Provides [`ScriptDocument`], which owns one script tree together with its
//! stage name, rerecord count, history, dirty flag and the handle of the UI
//! element that currently has focus. Every mutation goes through
//! [`ScriptDocument::apply`], so every change is undoable and observable.

use std::sync::mpsc::Sender;

use tas_core::{Buttons, InputLine, LineFormat};
use tracing::debug;

use super::address::{Coordinate, MatchKind, NodeRef};
use super::errors::{EditorError, Result};
use super::history::{EditHistory, HistoryConfig, HistoryStats};
use super::position::{Position, Range};
use super::tree::{Branch, Handle};
use crate::commands::{self, BranchNames, EditCommand, TextEdit};
use crate::events::DocumentEvent;
use crate::reconcile::{self, ReconcileOutcome, Reconciliation};

#[cfg(feature = "formats")]
use crate::formats::{
    markup::write_markup, FormatImporter, FormatOptions, FormatResult, MarkupFormat,
};

type EventSender = Sender<DocumentEvent>;

/// Editor preferences injected into a document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EditorConfig {
    /// Undo history limits and coalescing
    pub history: HistoryConfig,
    /// Names given to branches the editor creates
    pub names: BranchNames,
    /// Layout of lines the editor writes
    pub line_format: LineFormat,
}

/// Where the UI should put focus after an undo or redo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusRestore {
    /// Coordinate recorded with the command
    pub coordinate: Coordinate,
    /// Handle now living at `coordinate`, if it names a segment or header
    pub handle: Option<Handle>,
    /// Caret inside the segment, for text edits
    pub cursor: Option<Position>,
}

/// A branching TAS script being edited
#[derive(Debug)]
pub struct ScriptDocument {
    /// Stage the script was recorded on
    stage: String,

    /// Rerecord count carried through import and export
    rerecords: Option<u32>,

    /// Script tree
    root: Branch,

    /// Undo/redo history
    history: EditHistory,

    /// Whether document has unsaved changes
    modified: bool,

    /// Segment or branch header that currently has focus
    focus: Option<Handle>,

    /// Optional file path if loaded from/saved to disk
    file_path: Option<String>,

    /// Injected preferences
    config: EditorConfig,

    /// Event channel for sending document events
    event_tx: Option<EventSender>,
}

impl Default for ScriptDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptDocument {
    /// Create an empty document with no stage
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    /// Create an empty document with custom preferences
    #[must_use]
    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            stage: String::new(),
            rerecords: None,
            root: Branch::from_text(""),
            history: EditHistory::with_config(config.history.clone()),
            modified: false,
            focus: None,
            file_path: None,
            config,
            event_tx: None,
        }
    }

    /// Create a new document with event channel
    #[must_use]
    pub fn with_event_channel(event_tx: EventSender) -> Self {
        let mut doc = Self::new();
        doc.event_tx = Some(event_tx);
        doc
    }

    /// Create a document holding a single segment of `text`
    #[must_use]
    pub fn from_text(stage: impl Into<String>, text: impl Into<String>) -> Self {
        Self::from_parts(stage, None, Branch::from_text(text))
    }

    /// Create a document around an existing tree
    #[must_use]
    pub fn from_parts(stage: impl Into<String>, rerecords: Option<u32>, root: Branch) -> Self {
        let mut doc = Self::new();
        doc.stage = stage.into();
        doc.rerecords = rerecords;
        doc.root = root;
        doc
    }

    /// Emit an event to the event channel
    fn emit(&self, event: DocumentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// Set the event channel for this document
    pub fn set_event_channel(&mut self, event_tx: EventSender) {
        self.event_tx = Some(event_tx);
    }

    /// Check if document has an event channel
    #[must_use]
    pub const fn has_event_channel(&self) -> bool {
        self.event_tx.is_some()
    }

    /// Stage the script belongs to
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Rerecord count, if known
    #[must_use]
    pub const fn rerecords(&self) -> Option<u32> {
        self.rerecords
    }

    /// Update the rerecord count
    pub fn set_rerecords(&mut self, rerecords: Option<u32>) {
        if self.rerecords != rerecords {
            self.rerecords = rerecords;
            self.modified = true;
        }
    }

    /// Script tree
    #[must_use]
    pub const fn root(&self) -> &Branch {
        &self.root
    }

    /// Rendered script following active branches
    #[must_use]
    pub fn text(&self) -> String {
        self.root.active_text()
    }

    /// Frames played following active branches
    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.root.total_frames()
    }

    /// Injected preferences
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Replace the preferences; history limits apply from the next edit
    pub fn set_config(&mut self, config: EditorConfig) {
        self.history.set_config(config.history.clone());
        self.config = config;
    }

    /// Undo/redo history
    #[must_use]
    pub const fn history(&self) -> &EditHistory {
        &self.history
    }

    /// Get history statistics
    #[must_use]
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// Check if undo is available
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Whether there are unsaved changes
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set the dirty flag
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// File path the document was loaded from or saved to
    #[must_use]
    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    /// Set the file path used by [`ScriptDocument::save`]
    pub fn set_file_path(&mut self, path: Option<String>) {
        self.file_path = path;
    }

    /// Handle of the focused segment or header
    #[must_use]
    pub const fn focus(&self) -> Option<Handle> {
        self.focus
    }

    /// Move focus to another segment or header
    pub fn set_focus(&mut self, focus: Option<Handle>) {
        self.focus = focus;
    }

    /// Current coordinate of the node owning `handle`
    #[must_use]
    pub fn locate(&self, handle: Handle, kind: MatchKind) -> Option<Coordinate> {
        self.root.locate(handle, kind)
    }

    /// Resolve a freshly computed coordinate
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidAddress`] for coordinates that do not
    /// resolve.
    pub fn resolve(&self, coordinate: &Coordinate) -> Result<NodeRef<'_>> {
        self.root.resolve(coordinate)
    }

    fn coordinate_of(&self, handle: Handle, kind: MatchKind) -> Result<Coordinate> {
        self.root
            .locate(handle, kind)
            .ok_or_else(|| EditorError::unknown_handle(handle))
    }

    /// Apply a command and record it in history
    ///
    /// A command without `focus_before` gets the current focus. After a
    /// successful apply focus moves to `focus_after` when it names a segment
    /// or header.
    ///
    /// # Errors
    /// Propagates the command's apply error; the document is unchanged.
    pub fn apply(&mut self, mut command: EditCommand) -> Result<()> {
        if command.focus_before.is_none() {
            command.focus_before = self
                .focus
                .and_then(|handle| self.root.locate(handle, MatchKind::Any));
        }
        let description = command.description();
        let target = command.target().clone();
        let structural = command.edit.is_structural();
        let focus_after = command.focus_after.clone();

        self.history.apply(&mut self.root, command)?;
        self.modified = true;
        if let Some(handle) = focus_after.and_then(|coordinate| self.root.handle_at(&coordinate)) {
            self.focus = Some(handle);
        }
        self.emit(DocumentEvent::Edited {
            description,
            target,
            structural,
        });
        Ok(())
    }

    /// Undo the last command
    ///
    /// # Errors
    /// Returns [`EditorError::NothingToUndo`] at the start of history.
    pub fn undo(&mut self) -> Result<FocusRestore> {
        let command = self.history.undo(&mut self.root)?;
        let description = command.description();
        let coordinate = command
            .focus_before
            .clone()
            .unwrap_or_else(|| command.target().clone());
        let cursor = command.cursor_before();

        let restore = self.restore_focus(coordinate, cursor);
        self.emit(DocumentEvent::Undone {
            description,
            location: self.history.location(),
        });
        Ok(restore)
    }

    /// Redo the next command
    ///
    /// # Errors
    /// Returns [`EditorError::NothingToRedo`] at the end of history.
    pub fn redo(&mut self) -> Result<FocusRestore> {
        let command = self.history.redo(&mut self.root)?;
        let description = command.description();
        let coordinate = command
            .focus_after
            .clone()
            .unwrap_or_else(|| command.target().clone());
        let cursor = command.cursor_after();

        let restore = self.restore_focus(coordinate, cursor);
        self.emit(DocumentEvent::Redone {
            description,
            location: self.history.location(),
        });
        Ok(restore)
    }

    fn restore_focus(&mut self, coordinate: Coordinate, cursor: Option<Position>) -> FocusRestore {
        self.modified = true;
        let handle = self.root.handle_at(&coordinate);
        if handle.is_some() {
            self.focus = handle;
        }
        FocusRestore {
            coordinate,
            handle,
            cursor,
        }
    }

    /// Insert text into a segment
    ///
    /// # Errors
    /// Fails when `segment` is unknown or `at` is not a valid offset.
    pub fn insert(&mut self, segment: Handle, at: Position, text: &str) -> Result<()> {
        self.replace(segment, Range::caret(at), text)
    }

    /// Delete a range of a segment's text
    ///
    /// # Errors
    /// Fails when `segment` is unknown or `range` is out of bounds.
    pub fn delete(&mut self, segment: Handle, range: Range) -> Result<()> {
        self.replace(segment, range, "")
    }

    /// Replace a range of a segment's text
    ///
    /// # Errors
    /// Fails when `segment` is unknown or `range` is out of bounds.
    pub fn replace(&mut self, segment: Handle, range: Range, text: &str) -> Result<()> {
        let target = self.coordinate_of(segment, MatchKind::Any)?;
        let edit = TextEdit::replace(&self.root, target, range, text)?;
        self.apply(edit.into())
    }

    /// Normalize one line of a segment
    ///
    /// Returns whether the line changed.
    ///
    /// # Errors
    /// Fails when `segment` is unknown or has no such line.
    pub fn reformat_line(
        &mut self,
        segment: Handle,
        line: usize,
        typed: Option<Buttons>,
    ) -> Result<bool> {
        let target = self.coordinate_of(segment, MatchKind::Any)?;
        let Some(edit) =
            TextEdit::reformat_line(&self.root, target, line, typed, &self.config.line_format)?
        else {
            return Ok(false);
        };
        self.apply(edit.into())?;
        Ok(true)
    }

    /// Create a branch point from a caret or selection inside a segment
    ///
    /// # Errors
    /// Fails when `segment` is unknown or `selection` is out of bounds.
    pub fn create_branch_point(&mut self, segment: Handle, selection: Range) -> Result<()> {
        let target = self.coordinate_of(segment, MatchKind::Any)?;
        let command =
            commands::create_branch_point(&self.root, &target, selection, &self.config.names)?;
        self.apply(command)
    }

    /// Dissolve the branch point containing `handle`, keeping an empty line
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point.
    pub fn delete_branch_point(&mut self, handle: Handle) -> Result<()> {
        let target = self.coordinate_of(handle, MatchKind::BranchGroupContaining)?;
        let command = commands::delete_branch_point(&self.root, &target)?;
        self.apply(command)
    }

    /// Dissolve the branch point containing `handle`, keeping its active branch
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point.
    pub fn accept_branch_point(&mut self, handle: Handle) -> Result<()> {
        let target = self.coordinate_of(handle, MatchKind::BranchGroupContaining)?;
        let command = commands::accept_branch_point(&self.root, &target)?;
        self.apply(command)
    }

    /// Add a branch to the branch point containing `handle`
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point.
    pub fn add_branch(&mut self, handle: Handle, name: &str, duplicate_active: bool) -> Result<()> {
        let target = self.coordinate_of(handle, MatchKind::BranchGroupContaining)?;
        let command = commands::add_branch(&self.root, &target, name, duplicate_active)?;
        self.apply(command)
    }

    /// Remove branch `index` from the branch point containing `handle`
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point or `index` is out of
    /// range.
    pub fn remove_branch(&mut self, handle: Handle, index: usize) -> Result<()> {
        let target = self.coordinate_of(handle, MatchKind::BranchGroupContaining)?;
        let command = commands::remove_branch(&self.root, &target, index)?;
        self.apply(command)
    }

    /// Switch the active branch of the branch point containing `handle`
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point or `index` is out of
    /// range.
    pub fn set_active_branch(&mut self, handle: Handle, index: usize) -> Result<()> {
        let target = self.coordinate_of(handle, MatchKind::BranchGroupContaining)?;
        let command = commands::set_active_branch(&self.root, &target, index)?;
        self.apply(command)
    }

    /// Rename branch `index` of the branch point containing `handle`
    ///
    /// # Errors
    /// Fails when `handle` is not inside a branch point or `index` is out of
    /// range.
    pub fn rename_branch(&mut self, handle: Handle, index: usize, name: &str) -> Result<()> {
        let target = self
            .coordinate_of(handle, MatchKind::BranchGroupContaining)?
            .branch(index);
        let command = commands::rename_branch(&self.root, &target, name)?;
        self.apply(command)
    }

    /// Merge a recorded take into the script
    ///
    /// # Errors
    /// Returns [`EditorError::StageMismatch`] when the take was recorded on a
    /// different stage; nothing changes in that case.
    pub fn reconcile(
        &mut self,
        stage: &str,
        lines: &[InputLine],
        force: bool,
    ) -> Result<ReconcileOutcome> {
        if stage != self.stage {
            return Err(EditorError::StageMismatch {
                expected: self.stage.clone(),
                actual: stage.to_string(),
            });
        }
        let frames: u64 = lines.iter().map(|line| u64::from(line.frames)).sum();
        let plan = reconcile::plan(
            &self.root,
            lines,
            force,
            &self.config.names,
            &self.config.line_format,
        )?;

        let outcome = match plan {
            Reconciliation::Merged => ReconcileOutcome::Merged,
            Reconciliation::Incomplete { remaining } => ReconcileOutcome::Incomplete { remaining },
            Reconciliation::Fork {
                command,
                branch_point,
            } => {
                let focus_at = command
                    .focus_after
                    .clone()
                    .unwrap_or_else(|| branch_point.clone());
                self.apply(command)?;
                ReconcileOutcome::Forked {
                    branch_point: self.handle_after_apply(&branch_point)?,
                    focus: self.handle_after_apply(&focus_at)?,
                }
            }
            Reconciliation::Append { command } => {
                let segment_at = command
                    .focus_after
                    .clone()
                    .unwrap_or_else(|| command.target().clone());
                self.apply(command)?;
                ReconcileOutcome::Appended {
                    segment: self.handle_after_apply(&segment_at)?,
                }
            }
        };

        debug!(outcome = outcome.kind_name(), frames, "recording reconciled");
        self.emit(DocumentEvent::Reconciled {
            outcome: outcome.kind_name(),
            frames,
        });
        Ok(outcome)
    }

    fn handle_after_apply(&self, coordinate: &Coordinate) -> Result<Handle> {
        self.root.handle_at(coordinate).ok_or_else(|| {
            EditorError::invalid_address(coordinate, "no segment or header after reconcile")
        })
    }
}

#[cfg(feature = "formats")]
impl ScriptDocument {
    /// Create a document from markup or legacy script text
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidFormat`] for malformed input.
    pub fn from_content(content: &str) -> Result<Self> {
        let mut doc = Self::new();
        doc.load_str(content)?;
        Ok(doc)
    }

    /// Create document from file path
    ///
    /// # Errors
    /// Fails when the file cannot be read or is malformed.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EditorError::io(e.to_string()))?;
        let mut doc = Self::new();
        doc.file_path = Some(path.to_string());
        doc.load_str(&content)?;
        Ok(doc)
    }

    /// Replace the document content with imported text
    ///
    /// History is cleared and the document is marked clean. On error the
    /// document is left exactly as it was.
    ///
    /// # Errors
    /// Returns [`EditorError::InvalidFormat`] for malformed input.
    pub fn load_str(&mut self, content: &str) -> Result<FormatResult> {
        let (script, result) =
            MarkupFormat::new().import_from_string(content, &FormatOptions::default())?;
        self.stage = script.stage;
        self.rerecords = script.rerecords;
        self.root = script.root;
        self.history.clear();
        self.modified = false;
        self.focus = None;
        self.emit(DocumentEvent::Loaded {
            file_path: self.file_path.clone(),
            stage: self.stage.clone(),
        });
        Ok(result)
    }

    /// Export as markup with default options
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.export_with(&FormatOptions::default())
    }

    /// Export as markup
    #[must_use]
    pub fn export_with(&self, options: &FormatOptions) -> String {
        write_markup(&self.stage, self.rerecords, &self.root, options.indent_tags)
    }

    /// Save document to its file path
    ///
    /// # Errors
    /// Fails when no file path is set or writing fails.
    pub fn save(&mut self) -> Result<()> {
        if let Some(path) = self.file_path.clone() {
            self.save_to_file(&path)
        } else {
            Err(EditorError::io("No file path set for document"))
        }
    }

    /// Save document to specific file path
    ///
    /// # Errors
    /// Fails when writing fails; the dirty flag is kept in that case.
    pub fn save_to_file(&mut self, path: &str) -> Result<()> {
        std::fs::write(path, self.to_markup()).map_err(|e| EditorError::io(e.to_string()))?;
        let save_as = self.file_path.as_deref() != Some(path);
        self.modified = false;
        self.file_path = Some(path.to_string());
        debug!(path, save_as, "document saved");
        self.emit(DocumentEvent::Saved {
            file_path: path.to_string(),
            save_as,
        });
        Ok(())
    }
}
