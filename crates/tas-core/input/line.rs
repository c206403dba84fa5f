//! Single-line parsing and formatting
//!
//! An input line is a frame count followed by the letters of the buttons held
//! during those frames. Parsing is lenient about casing and delimiters;
//! formatting always produces the canonical form `{frames:>4},{letters}`.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use super::buttons::Buttons;
use crate::errors::{CoreError, Result};

/// A run of `frames` frames during which `buttons` are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputLine {
    /// Number of frames the state is held for
    pub frames: u32,
    /// Buttons held during those frames
    pub buttons: Buttons,
}

impl InputLine {
    /// Create a new input line
    #[must_use]
    pub const fn new(frames: u32, buttons: Buttons) -> Self {
        Self { frames, buttons }
    }

    /// Whether this line holds its state for no frames at all
    #[must_use]
    pub const fn is_zero_length(&self) -> bool {
        self.frames == 0
    }

    /// Render the line with the given formatting options
    #[must_use]
    pub fn format(&self, format: &LineFormat) -> String {
        let mut out = String::with_capacity(format.frame_width + 10);
        let frames = self.frames.to_string();
        for _ in frames.len()..format.frame_width {
            out.push(' ');
        }
        out.push_str(&frames);
        out.push(',');
        out.push_str(&self.buttons.letters());
        out
    }
}

impl fmt::Display for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&LineFormat::default()))
    }
}

impl FromStr for InputLine {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (frames, letters) = split_frames(s)?;
        let buttons = letters
            .into_iter()
            .fold(Buttons::empty(), |held, button| held | button);
        Ok(Self::new(frames, buttons))
    }
}

/// Formatting options for rendering input lines
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineFormat {
    /// Minimum width the frame count is right-aligned to
    pub frame_width: usize,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self { frame_width: 4 }
    }
}

/// What a raw script line turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace only
    Blank,
    /// Starts with `#`
    Comment,
    /// Starts with a letter, e.g. `set speed 2`
    Directive,
    /// A parseable frame count and button set
    Input(InputLine),
    /// Starts like an input line but contains something else
    Invalid,
}

/// Classify a raw script line
#[must_use]
pub fn classify_line(text: &str) -> LineKind {
    let trimmed = text.trim();
    match trimmed.chars().next() {
        None => LineKind::Blank,
        Some('#') => LineKind::Comment,
        Some(c) if c.is_alphabetic() => LineKind::Directive,
        Some(_) => match trimmed.parse::<InputLine>() {
            Ok(line) => LineKind::Input(line),
            Err(_) => LineKind::Invalid,
        },
    }
}

/// Parse a raw script line into an input line
///
/// Returns `None` for blank, comment and directive lines, and for lines
/// containing anything that is not a button letter after the frame count.
/// Callers treat `None` as "not an input line" rather than as an error.
#[must_use]
pub fn parse_line(text: &str) -> Option<InputLine> {
    match classify_line(text) {
        LineKind::Input(line) => Some(line),
        _ => None,
    }
}

/// Normalize a raw line to canonical form, resolving direction conflicts
///
/// When both directions of an axis are held, the one that was not just
/// `typed` is dropped. Without a hint the direction written last wins. Each
/// axis is resolved independently. Returns `None` for non-input lines.
#[must_use]
pub fn reformat_line(text: &str, typed: Option<Buttons>, format: &LineFormat) -> Option<String> {
    if !matches!(classify_line(text), LineKind::Input(_)) {
        return None;
    }
    let (frames, order) = split_frames(text.trim()).ok()?;
    let mut held = order
        .iter()
        .fold(Buttons::empty(), |held, button| held | *button);
    for (first, second) in [
        (Buttons::LEFT, Buttons::RIGHT),
        (Buttons::UP, Buttons::DOWN),
    ] {
        held = resolve_axis(held, &order, first, second, typed);
    }
    Some(InputLine::new(frames, held).format(format))
}

/// Keep one direction of a conflicting axis
fn resolve_axis(
    held: Buttons,
    order: &[Buttons],
    first: Buttons,
    second: Buttons,
    typed: Option<Buttons>,
) -> Buttons {
    if !held.contains(first | second) {
        return held;
    }
    let keep = match typed {
        Some(typed) if typed.contains(first) => first,
        Some(typed) if typed.contains(second) => second,
        _ => order
            .iter()
            .rev()
            .copied()
            .find(|button| *button == first || *button == second)
            .unwrap_or(second),
    };
    held.difference(first | second).union(keep)
}

/// Split a trimmed line into its frame count and its button letters in
/// written order
fn split_frames(text: &str) -> Result<(u32, Vec<Buttons>)> {
    let trimmed = text.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return Err(CoreError::not_an_input_line(trimmed));
    }
    let (digits, rest) = trimmed.split_at(digits_end);
    let frames = digits
        .parse::<u32>()
        .map_err(|_| CoreError::FrameOverflow(digits.to_string()))?;
    let letters = rest
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .map(|letter| Buttons::from_letter(letter).ok_or(CoreError::UnknownButton(letter)))
        .collect::<Result<Vec<_>>>()?;
    Ok((frames, letters))
}
