//! Conversion between line sequences and press/release events
//!
//! The game side of a recording speaks in discrete button transitions; the
//! script speaks in runs of held state. [`lines_to_presses`] and
//! [`presses_to_lines`] translate between the two.

use alloc::vec::Vec;

use super::buttons::Buttons;
use super::line::InputLine;

/// Direction of a button transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PressKind {
    /// Button went down
    Press,
    /// Button went up
    Release,
}

/// A single button transition at a given frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Press {
    /// Frame at which the transition happens
    pub frame: u32,
    /// The single button that changed
    pub button: Buttons,
    /// Whether it went down or up
    pub kind: PressKind,
}

impl Press {
    /// Create a press event
    #[must_use]
    pub const fn down(frame: u32, button: Buttons) -> Self {
        Self {
            frame,
            button,
            kind: PressKind::Press,
        }
    }

    /// Create a release event
    #[must_use]
    pub const fn up(frame: u32, button: Buttons) -> Self {
        Self {
            frame,
            button,
            kind: PressKind::Release,
        }
    }
}

/// Convert a line sequence into chronological press/release events
///
/// Each line is diffed against the state held before it and one event per
/// changed button is emitted at the frame the line begins. Zero-frame lines
/// are skipped since their state is never held, except the very last line,
/// whose state marks how the script ends. Conversion stops at the first line
/// that would start beyond `u32::MAX`.
#[must_use]
pub fn lines_to_presses(lines: &[InputLine]) -> Vec<Press> {
    let mut presses = Vec::new();
    let mut held = Buttons::empty();
    let mut frame = 0u32;
    let last = lines.len().saturating_sub(1);

    for (index, line) in lines.iter().enumerate() {
        if line.is_zero_length() && index != last {
            continue;
        }
        push_transitions(&mut presses, frame, held, line.buttons);
        held = line.buttons;
        let Some(next) = frame.checked_add(line.frames) else {
            break;
        };
        frame = next;
    }

    presses
}

/// Convert press/release events back into a line sequence
///
/// Events are sorted by frame and replayed; one line is emitted for every
/// interval between state changes, and a final one-frame line records the
/// terminal state.
#[must_use]
pub fn presses_to_lines(presses: &[Press]) -> Vec<InputLine> {
    let mut sorted = presses.to_vec();
    sorted.sort_by_key(|press| (press.frame, press.button));

    let mut lines = Vec::new();
    let mut held = Buttons::empty();
    let mut frame = 0u32;

    for press in &sorted {
        if press.frame > frame {
            lines.push(InputLine::new(press.frame - frame, held));
            frame = press.frame;
        }
        match press.kind {
            PressKind::Press => held.insert(press.button),
            PressKind::Release => held.remove(press.button),
        }
    }

    lines.push(InputLine::new(1, held));
    lines
}

fn push_transitions(presses: &mut Vec<Press>, frame: u32, before: Buttons, after: Buttons) {
    for button in Buttons::canonical() {
        match (before.contains(button), after.contains(button)) {
            (false, true) => presses.push(Press::down(frame, button)),
            (true, false) => presses.push(Press::up(frame, button)),
            _ => {}
        }
    }
}
