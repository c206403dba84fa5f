//! History management for undo/redo operations
//!
//! [`EditHistory`] keeps every applied [`EditCommand`] in one list with a
//! `location` splitting it into undoable and redoable halves. Applying a new
//! command discards the redo tail first. Consecutive text edits of one typing
//! burst are coalesced so a single undo removes the whole burst.

use tracing::trace;

use super::errors::{EditorError, Result};
use super::tree::Branch;
use crate::commands::EditCommand;

/// Configuration for history behavior
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryConfig {
    /// Maximum number of entries to keep (0 = unlimited)
    pub max_entries: usize,

    /// Whether adjacent text edits are merged into one entry
    pub coalesce_typing: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            coalesce_typing: true,
        }
    }
}

/// Linear undo/redo history of applied commands
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    config: HistoryConfig,
    entries: Vec<EditCommand>,
    location: usize,
}

impl EditHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history with custom configuration
    #[must_use]
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Replace the configuration; takes effect from the next recorded command
    pub fn set_config(&mut self, config: HistoryConfig) {
        self.config = config;
    }

    /// Number of entries before the undo/redo split
    #[must_use]
    pub const fn location(&self) -> usize {
        self.location
    }

    /// All entries, undoable ones first
    #[must_use]
    pub fn entries(&self) -> &[EditCommand] {
        &self.entries
    }

    /// Check if undo is available
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        self.location > 0
    }

    /// Check if redo is available
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.location < self.entries.len()
    }

    /// Get the next undo operation description
    #[must_use]
    pub fn next_undo_description(&self) -> Option<&'static str> {
        self.location
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(EditCommand::description)
    }

    /// Get the next redo operation description
    #[must_use]
    pub fn next_redo_description(&self) -> Option<&'static str> {
        self.entries
            .get(self.location)
            .map(EditCommand::description)
    }

    /// Apply `command` to `root` and record it
    ///
    /// Nothing is recorded when the command fails to apply.
    ///
    /// # Errors
    /// Propagates the command's apply error; the tree is left unchanged.
    pub fn apply(&mut self, root: &mut Branch, command: EditCommand) -> Result<()> {
        command.apply(root)?;
        self.record(command);
        Ok(())
    }

    /// Record an already applied command
    pub fn record(&mut self, command: EditCommand) {
        if self.location < self.entries.len() {
            trace!(
                cleared = self.entries.len() - self.location,
                "redo tail discarded"
            );
            self.entries.truncate(self.location);
        }

        trace!(
            description = command.description(),
            coordinate = %command.target(),
            location = self.location,
            "history push"
        );
        self.entries.push(command);
        self.location += 1;

        if self.config.coalesce_typing {
            self.coalesce_last();
        }
        self.enforce_limit();
    }

    fn coalesce_last(&mut self) {
        let len = self.entries.len();
        if len < 2 {
            return;
        }
        if let Some(merged) = self.entries[len - 2].coalesce(&self.entries[len - 1]) {
            self.entries.truncate(len - 2);
            self.entries.push(merged);
            self.location -= 1;
            trace!(location = self.location, "coalesced text edits");
        }
    }

    fn enforce_limit(&mut self) {
        let max = self.config.max_entries;
        if max == 0 || self.entries.len() <= max {
            return;
        }
        let excess = self.entries.len() - max;
        self.entries.drain(..excess);
        self.location = self.location.saturating_sub(excess);
        trace!(dropped = excess, "history limit reached");
    }

    /// Revert the entry before `location`
    ///
    /// Returns the reverted command so the caller can restore focus.
    ///
    /// # Errors
    /// Returns [`EditorError::NothingToUndo`] at the start of history, or the
    /// revert error; either way the tree and `location` are unchanged.
    pub fn undo(&mut self, root: &mut Branch) -> Result<&EditCommand> {
        let index = self
            .location
            .checked_sub(1)
            .ok_or(EditorError::NothingToUndo)?;
        let command = &self.entries[index];
        command.revert(root)?;
        self.location = index;
        trace!(
            description = command.description(),
            location = self.location,
            "undo"
        );
        Ok(command)
    }

    /// Re-apply the entry at `location`
    ///
    /// Returns the re-applied command so the caller can restore focus.
    ///
    /// # Errors
    /// Returns [`EditorError::NothingToRedo`] at the end of history, or the
    /// apply error; either way the tree and `location` are unchanged.
    pub fn redo(&mut self, root: &mut Branch) -> Result<&EditCommand> {
        let command = self
            .entries
            .get(self.location)
            .ok_or(EditorError::NothingToRedo)?;
        command.apply(root)?;
        self.location += 1;
        trace!(
            description = command.description(),
            location = self.location,
            "redo"
        );
        Ok(command)
    }

    /// Get history statistics
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.location,
            redo_count: self.entries.len() - self.location,
            location: self.location,
        }
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.location = 0;
    }
}

/// Statistics about the history system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    /// Number of operations that can be undone
    pub undo_count: usize,
    /// Number of operations that can be redone
    pub redo_count: usize,
    /// Split point between the two
    pub location: usize,
}
