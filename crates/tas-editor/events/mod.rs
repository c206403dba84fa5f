//! Event system for document changes
//!
//! Provides the `DocumentEvent` enum describing every observable change to a
//! [`ScriptDocument`](crate::ScriptDocument). Documents send events over an
//! optional `std::sync::mpsc` channel; observers filter with [`EventFilter`].

use crate::core::address::Coordinate;

/// Types of events that can occur in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A command was applied
    Edited {
        /// Description of the applied command
        description: &'static str,
        /// Coordinate the command acted on
        target: Coordinate,
        /// Whether coordinates computed before the edit are now stale
        structural: bool,
    },

    /// Undo operation was performed
    Undone {
        /// Description of the undone command
        description: &'static str,
        /// History location after the undo
        location: usize,
    },

    /// Redo operation was performed
    Redone {
        /// Description of the redone command
        description: &'static str,
        /// History location after the redo
        location: usize,
    },

    /// Document content was replaced by an import
    Loaded {
        /// File path the content came from, if any
        file_path: Option<String>,
        /// Stage name of the loaded script
        stage: String,
    },

    /// Document was saved to a file
    Saved {
        /// File path where document was saved
        file_path: String,
        /// Whether this was a "save as" operation
        save_as: bool,
    },

    /// A recording was merged into the document
    Reconciled {
        /// Outcome kind: `merged`, `forked`, `appended` or `incomplete`
        outcome: &'static str,
        /// Frames carried by the recording
        frames: u64,
    },
}

impl DocumentEvent {
    /// Short name of the event type
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Edited { .. } => "edited",
            Self::Undone { .. } => "undone",
            Self::Redone { .. } => "redone",
            Self::Loaded { .. } => "loaded",
            Self::Saved { .. } => "saved",
            Self::Reconciled { .. } => "reconciled",
        }
    }

    /// Human readable description
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Edited { description, target, .. } => format!("{description} at {target}"),
            Self::Undone { description, .. } => format!("Undo: {description}"),
            Self::Redone { description, .. } => format!("Redo: {description}"),
            Self::Loaded { stage, .. } => format!("Loaded stage '{stage}'"),
            Self::Saved { file_path, save_as } => {
                if *save_as {
                    format!("Saved as {file_path}")
                } else {
                    format!("Saved {file_path}")
                }
            }
            Self::Reconciled { outcome, frames } => {
                format!("Recording of {frames} frames {outcome}")
            }
        }
    }

    /// Check if this event changed document content
    #[must_use]
    pub fn is_modification(&self) -> bool {
        match self {
            Self::Edited { .. } | Self::Undone { .. } | Self::Redone { .. } | Self::Loaded { .. } => {
                true
            }
            Self::Reconciled { outcome, .. } => {
                matches!(*outcome, "forked" | "appended")
            }
            Self::Saved { .. } => false,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Event types to include (empty = all)
    include_types: Vec<&'static str>,
    /// Only pass events that change content
    modifications_only: bool,
}

impl EventFilter {
    /// Create a new filter that passes everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given event types
    #[must_use]
    pub fn include_types(mut self, types: Vec<&'static str>) -> Self {
        self.include_types = types;
        self
    }

    /// Only pass events that change content
    #[must_use]
    pub fn modifications_only(mut self, enabled: bool) -> Self {
        self.modifications_only = enabled;
        self
    }

    /// Check if an event passes this filter
    #[must_use]
    pub fn matches(&self, event: &DocumentEvent) -> bool {
        if self.modifications_only && !event.is_modification() {
            return false;
        }
        self.include_types.is_empty() || self.include_types.contains(&event.event_type())
    }
}
