//! # TAS-RS Core
//!
//! Input-line codec for frame-timed tool-assisted speedrun scripts. A script
//! is a sequence of lines, each describing a run of frames during which a
//! fixed set of buttons is held:
//!
//! ```text
//!   10,R
//!   20,RJ
//! # comments and directives are left alone
//! ```
//!
//! ## Features
//!
//! - **Lenient parsing**: accepts any casing and any mix of `,`/whitespace
//!   delimiters, rejects unknown button letters
//! - **Canonical formatting**: right-aligned frame counts, buttons in a fixed order
//! - **Press/release events**: converts between line sequences and a
//!   chronological event list in both directions
//!
//! ## Quick Start
//!
//! ```rust
//! use tas_core::{lines_to_presses, parse_line, presses_to_lines, Buttons};
//!
//! let lines: Vec<_> = ["  10,R", "  20,rj"].iter().filter_map(|l| parse_line(l)).collect();
//! assert_eq!(lines[1].buttons, Buttons::RIGHT | Buttons::JUMP);
//! assert_eq!(lines[1].to_string(), "  20,RJ");
//!
//! let presses = lines_to_presses(&lines);
//! assert_eq!(presses.len(), 2);
//! assert_eq!(presses_to_lines(&presses).len(), 2);
//! ```

#![deny(unsafe_code)]

extern crate alloc;

pub mod errors;
pub mod input;

pub use errors::{CoreError, Result};
pub use input::{
    classify_line, lines_to_presses, parse_line, presses_to_lines, reformat_line, Buttons,
    InputLine, LineFormat, LineKind, Press, PressKind,
};

/// Crate version for runtime compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
