//! Core error types for the input-line codec
//!
//! Parsing entry points such as [`parse_line`](crate::parse_line) return
//! `Option` because a non-input line is an ordinary outcome, not a failure.
//! `CoreError` is reserved for the strict conversions (`FromStr`) where the
//! caller asked for an input line and did not get one.

use alloc::string::{String, ToString};
use core::fmt;

use thiserror::Error;

/// Main error type for tas-core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Text is blank, a comment, a directive, or otherwise not an input line
    #[error("Not an input line: {0:?}")]
    NotAnInputLine(String),

    /// A letter that does not name any button
    #[error("Unknown button letter: {0:?}")]
    UnknownButton(char),

    /// A frame count that does not fit the frame counter
    #[error("Frame count out of range: {0}")]
    FrameOverflow(String),
}

impl CoreError {
    /// Create a not-an-input-line error from the offending text
    pub fn not_an_input_line<T: fmt::Display>(text: T) -> Self {
        Self::NotAnInputLine(text.to_string())
    }

    /// Check if this error was caused by an unrecognized button letter
    #[must_use]
    pub const fn is_unknown_button(&self) -> bool {
        matches!(self, Self::UnknownButton(_))
    }
}

/// Result type alias for codec operations
pub type Result<T> = core::result::Result<T, CoreError>;
