//! Error types for the tas-editor crate
//!
//! Provides the main `EditorError` enum that wraps `CoreError` from tas-core
//! and adds editor-specific error cases. Follows the same philosophy as core:
//! - Use thiserror for structured error handling (no anyhow)
//! - Provide detailed context for debugging
//! - Separate user-recoverable failures from defects

use core::fmt;

use tas_core::CoreError;
use thiserror::Error;

use super::address::Coordinate;
use super::tree::Handle;

/// Main error type for tas-editor operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Errors from tas-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Malformed import text; the import is aborted
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A coordinate that does not resolve against the current tree
    #[error("Invalid address {coordinate}: {message}")]
    InvalidAddress { coordinate: String, message: String },

    /// A command resolved to a node kind it cannot act on
    #[error("Unsupported command: {command} cannot act on {found} at {coordinate}")]
    UnsupportedCommand {
        command: &'static str,
        found: &'static str,
        coordinate: String,
    },

    /// A branch point would be left with fewer than two branches
    #[error("Invalid branch point: {message}")]
    InvalidBranchPoint { message: String },

    /// Invalid text range inside a segment
    #[error("Invalid range: start {start}, end {end} (segment length: {length})")]
    InvalidRange {
        start: usize,
        end: usize,
        length: usize,
    },

    /// A history entry no longer matches the tree it is applied to
    #[error("History operation failed: {message}")]
    HistoryError { message: String },

    /// No operation to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// No operation to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// A recording arrived for a different stage than the open document
    #[error("Recording is for stage '{actual}' but the document is '{expected}'")]
    StageMismatch { expected: String, actual: String },

    /// Import/export error
    #[error("IO error: {0}")]
    IoError(String),
}

impl EditorError {
    /// Create a format error
    pub fn format<T: fmt::Display>(message: T) -> Self {
        Self::InvalidFormat(message.to_string())
    }

    /// Create a format error pointing at a 1-based line of the input
    pub fn format_at<T: fmt::Display>(line: usize, message: T) -> Self {
        Self::InvalidFormat(format!("line {line}: {message}"))
    }

    /// Create an address error for a coordinate
    pub fn invalid_address<T: fmt::Display>(coordinate: &Coordinate, message: T) -> Self {
        Self::InvalidAddress {
            coordinate: coordinate.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an address error for a handle no visible node owns
    pub fn unknown_handle(handle: Handle) -> Self {
        Self::InvalidAddress {
            coordinate: handle.to_string(),
            message: "no visible node owns this handle".to_string(),
        }
    }

    /// Create an unsupported command error
    pub fn unsupported(command: &'static str, found: &'static str, coordinate: &Coordinate) -> Self {
        Self::UnsupportedCommand {
            command,
            found,
            coordinate: coordinate.to_string(),
        }
    }

    /// Create a branch point invariant error
    pub fn branch_point<T: fmt::Display>(message: T) -> Self {
        Self::InvalidBranchPoint {
            message: message.to_string(),
        }
    }

    /// Create a history error
    pub fn history<T: fmt::Display>(message: T) -> Self {
        Self::HistoryError {
            message: message.to_string(),
        }
    }

    /// Create a new IO error
    pub fn io<T: fmt::Display>(message: T) -> Self {
        Self::IoError(message.to_string())
    }

    /// Check if error is recoverable
    ///
    /// Address, command and history mismatches indicate a defect in the
    /// caller (a cached coordinate, an entry applied to the wrong tree) and
    /// are not something the user can fix.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(_)
            | Self::InvalidFormat(_)
            | Self::InvalidBranchPoint { .. }
            | Self::InvalidRange { .. }
            | Self::NothingToUndo
            | Self::NothingToRedo
            | Self::StageMismatch { .. }
            | Self::IoError(_) => true,
            Self::InvalidAddress { .. }
            | Self::UnsupportedCommand { .. }
            | Self::HistoryError { .. } => false,
        }
    }

    /// Check if this is a history-related error
    #[must_use]
    pub const fn is_history_error(&self) -> bool {
        matches!(
            self,
            Self::HistoryError { .. } | Self::NothingToUndo | Self::NothingToRedo
        )
    }

    /// Check if this error came from malformed import data
    #[must_use]
    pub const fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_))
    }

    /// Get the underlying core error if this wraps one
    #[must_use]
    pub const fn as_core_error(&self) -> Option<&CoreError> {
        match self {
            Self::Core(core_err) => Some(core_err),
            _ => None,
        }
    }
}

/// Result type alias for editor operations
pub type Result<T> = core::result::Result<T, EditorError>;
