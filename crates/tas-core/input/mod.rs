//! Input-line codec
//!
//! Converts between the textual form of a script line and a normalized
//! [`InputLine`], and between line sequences and chronological
//! [`Press`] events.

pub mod buttons;
pub mod line;
pub mod presses;

pub use buttons::Buttons;
pub use line::{classify_line, parse_line, reformat_line, InputLine, LineFormat, LineKind};
pub use presses::{lines_to_presses, presses_to_lines, Press, PressKind};
